//! Push channel seam.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::TransportError;

/// Text frames of one open push connection.
///
/// The stream ending means the peer closed the connection; an `Err` item is
/// a protocol-level failure after which the connection is unusable.
pub type PushStream = BoxStream<'static, Result<String, TransportError>>;

/// Opens push connections.
#[async_trait]
pub trait PushConnector: Send + Sync {
    /// Endpoint description, for logs.
    fn endpoint(&self) -> &str;

    /// Open a new connection. Each call yields an independent stream.
    async fn connect(&self) -> Result<PushStream, TransportError>;
}
