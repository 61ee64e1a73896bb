//! # Vigil Sync
//!
//! Keeps a local, ordered view of backend telemetry current by merging a
//! push channel with periodic pulls.
//!
//! ## Components
//!
//! - [`StreamBuffer`] - Bounded, ordered, idempotent per-stream store
//! - [`TransportChannel`] - Push connection with reconnection
//! - [`PollScheduler`] - Periodic fetches, one in flight per stream
//! - [`Reconciler`] - Single writer merging push and pull deltas
//! - [`AlertLifecycle`] - Optimistic acknowledge/dismiss with rollback
//! - [`ViewProjector`] - Pure projection to a [`RenderModel`]
//! - [`SyncClient`] - Owns all of the above behind a start/stop lifecycle

pub mod alerts;
pub mod backoff;
pub mod buffer;
pub mod client;
pub mod delta;
pub mod error;
pub mod event;
pub mod feeds;
pub mod health;
pub mod notification;
pub mod poll;
pub mod projector;
pub mod reconciler;
pub mod transport;

#[cfg(test)]
mod fixtures;

pub use alerts::{AlertAction, AlertLifecycle, AlertOutcome, PendingMutation, Settled};
pub use backoff::ReconnectPolicy;
pub use buffer::StreamBuffer;
pub use client::SyncClient;
pub use delta::{Delta, DeltaSource, StreamId};
pub use error::SyncError;
pub use event::SyncEvent;
pub use feeds::{BackendFeed, FeedRequest, interval_for};
pub use health::{FeedHealth, FeedHealthTracker};
pub use notification::{Notification, NotificationLevel};
pub use poll::{PollScheduler, PullFeed};
pub use projector::{MetricLevel, RenderModel, ViewProjector};
pub use reconciler::{Buffers, Reconciler, StreamDiagnostics};
pub use transport::{ConnectionState, TransportChannel};
