//! Events flowing into the client's single ordered update loop.

use vigil_protocols::{BackendError, PushMessage};

use crate::delta::{Delta, StreamId};
use crate::transport::ConnectionState;

/// One unit of work for the update loop.
#[derive(Debug)]
pub enum SyncEvent {
    /// A decoded push message.
    Push(PushMessage),
    /// The push channel changed state.
    Connection(ConnectionState),
    /// A pull fetch finished.
    Fetched {
        stream: StreamId,
        /// Schedule generation the fetch was issued under.
        generation: u64,
        result: Result<Delta, BackendError>,
    },
    /// The backend answered an alert mutation.
    MutationSettled {
        op_id: u64,
        result: Result<(), BackendError>,
    },
    /// The backend answered a log cleanup request.
    CleanupFinished {
        request_id: u64,
        result: Result<(), BackendError>,
    },
}
