//! Push channel with reconnection.
//!
//! A [`TransportChannel`] keeps at most one push connection open. Decoded
//! messages and state transitions are sent, in order, to the update loop's
//! event queue. Buffers are never touched from here.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_protocols::{PushConnector, PushMessage, PushStream, TransportError};

use crate::backoff::ReconnectPolicy;
use crate::error::SyncError;
use crate::event::SyncEvent;

/// Push connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    /// Protocol-level failure on an open connection.
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        };
        f.write_str(label)
    }
}

struct Runner {
    /// Cancelled on intentional close.
    closed: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the push connection lifecycle.
pub struct TransportChannel {
    connector: Arc<dyn PushConnector>,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    state_tx: watch::Sender<ConnectionState>,
    connect_attempts: Arc<AtomicU64>,
    runner: Mutex<Option<Runner>>,
}

impl TransportChannel {
    pub fn new(
        connector: Arc<dyn PushConnector>,
        policy: ReconnectPolicy,
        connect_timeout: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            policy,
            connect_timeout,
            state_tx,
            connect_attempts: Arc::new(AtomicU64::new(0)),
            runner: Mutex::new(None),
        }
    }

    /// Start connecting. Messages and state changes go to `events`.
    pub fn start(&self, events: mpsc::Sender<SyncEvent>) -> Result<(), SyncError> {
        let mut runner = self.runner.lock();
        if let Some(ref current) = *runner {
            if !current.closed.is_cancelled() && !current.handle.is_finished() {
                return Err(SyncError::AlreadyRunning);
            }
        }

        let closed = CancellationToken::new();
        let task = ChannelTask {
            connector: self.connector.clone(),
            policy: self.policy.clone(),
            connect_timeout: self.connect_timeout,
            state_tx: self.state_tx.clone(),
            connect_attempts: self.connect_attempts.clone(),
            events,
            closed: closed.clone(),
        };

        info!(endpoint = self.connector.endpoint(), "Starting push channel");
        let handle = tokio::spawn(task.run());
        *runner = Some(Runner { closed, handle });
        Ok(())
    }

    /// Close the channel without scheduling a reconnect. Idempotent.
    pub fn close(&self) {
        let runner = self.runner.lock();
        if let Some(ref current) = *runner {
            if !current.closed.is_cancelled() {
                info!(endpoint = self.connector.endpoint(), "Closing push channel");
                current.closed.cancel();
            }
        }
        self.state_tx.send_if_modified(|state| {
            let modified = *state != ConnectionState::Disconnected;
            *state = ConnectionState::Disconnected;
            modified
        });
    }

    /// Close and wait for the runner task to exit.
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.runner.lock().take().map(|r| r.handle);
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.runner
            .lock()
            .as_ref()
            .is_some_and(|r| !r.closed.is_cancelled() && !r.handle.is_finished())
    }

    /// Total connection attempts since creation.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }
}

impl Drop for TransportChannel {
    fn drop(&mut self) {
        if let Some(runner) = self.runner.lock().take() {
            runner.closed.cancel();
        }
    }
}

/// How one connection ended.
enum SessionEnd {
    /// Peer closed or handshake failed.
    Dropped,
    /// Protocol failure on an open connection.
    Failed,
    /// Intentional close or the event queue went away.
    Stop,
}

struct ChannelTask {
    connector: Arc<dyn PushConnector>,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    state_tx: watch::Sender<ConnectionState>,
    connect_attempts: Arc<AtomicU64>,
    events: mpsc::Sender<SyncEvent>,
    closed: CancellationToken,
}

impl ChannelTask {
    async fn run(self) {
        // consecutive failed attempts, reset by a successful connect
        let mut attempt: u32 = 0;

        loop {
            if !self.publish(ConnectionState::Connecting).await {
                break;
            }
            self.connect_attempts.fetch_add(1, Ordering::Relaxed);

            let connected = tokio::select! {
                _ = self.closed.cancelled() => break,
                result = tokio::time::timeout(self.connect_timeout, self.connector.connect()) => {
                    match result {
                        Ok(inner) => inner,
                        Err(_) => Err(TransportError::Timeout(self.connect_timeout.as_millis() as u64)),
                    }
                }
            };

            let end = match connected {
                Ok(stream) => {
                    attempt = 0;
                    info!(endpoint = self.connector.endpoint(), "Push channel connected");
                    if !self.publish(ConnectionState::Connected).await {
                        break;
                    }
                    self.receive(stream).await
                }
                Err(e) => {
                    warn!(endpoint = self.connector.endpoint(), "Push connect failed: {}", e);
                    SessionEnd::Dropped
                }
            };

            match end {
                SessionEnd::Stop => break,
                SessionEnd::Failed => {
                    if !self.publish(ConnectionState::Error).await {
                        break;
                    }
                }
                SessionEnd::Dropped => {}
            }
            if !self.publish(ConnectionState::Disconnected).await {
                break;
            }

            let delay = self.policy.delay_for_attempt(attempt);
            attempt = attempt.saturating_add(1);
            debug!("Reconnecting push channel in {:?}", delay);

            tokio::select! {
                _ = self.closed.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.state_tx.send_replace(ConnectionState::Disconnected);
        debug!(endpoint = self.connector.endpoint(), "Push channel runner stopped");
    }

    async fn receive(&self, mut stream: PushStream) -> SessionEnd {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.closed.cancelled() => return SessionEnd::Stop,
                frame = stream.next() => frame,
            };

            match frame {
                Some(Ok(text)) => match PushMessage::decode(&text) {
                    Ok(message) => {
                        debug!(kind = message.kind(), "Push message received");
                        if self.events.send(SyncEvent::Push(message)).await.is_err() {
                            return SessionEnd::Stop;
                        }
                    }
                    Err(e) => {
                        warn!("Dropping malformed push message: {}", e);
                    }
                },
                Some(Err(e)) => {
                    warn!("Push channel error: {}", e);
                    return SessionEnd::Failed;
                }
                None => {
                    info!("Push channel closed by peer");
                    return SessionEnd::Dropped;
                }
            }
        }
    }

    /// Publish a state on the watch channel and the event queue. Returns
    /// false once the queue is gone or the channel was closed on purpose.
    async fn publish(&self, state: ConnectionState) -> bool {
        if self.closed.is_cancelled() {
            return false;
        }
        self.state_tx.send_replace(state);
        self.events.send(SyncEvent::Connection(state)).await.is_ok()
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
