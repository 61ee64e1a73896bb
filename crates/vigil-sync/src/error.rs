//! Error types for the sync client.

use thiserror::Error;

use vigil_config::ConfigError;
use vigil_protocols::BackendError;

/// Errors raised by the sync client.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The component is already running.
    #[error("Sync client is already running")]
    AlreadyRunning,

    /// The component is not running.
    #[error("Sync client is not running")]
    NotRunning,

    /// The command or event channel closed.
    #[error("Channel closed")]
    ChannelClosed,

    /// A backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
