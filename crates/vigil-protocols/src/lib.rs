//! # Vigil Protocols
//!
//! Data types and interface definitions shared by the vigil telemetry
//! sync client. Contains only types and traits - no transport code.
//!
//! ## Core Traits
//!
//! - [`StreamRecord`] - Identity and ordering of one telemetry entry
//! - [`TelemetryBackend`] - Pull endpoints and alert/log mutations
//! - [`PushConnector`] - Opens the push channel

pub mod backend;
pub mod error;
pub mod push;
pub mod transport;
pub mod types;

pub use backend::{LogQuery, TelemetryBackend};
pub use error::{BackendError, TransportError};
pub use push::PushMessage;
pub use transport::{PushConnector, PushStream};
pub use types::*;
