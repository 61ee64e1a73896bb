//! WebSocket push connector.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use vigil_config::BackendConfig;
use vigil_protocols::{PushConnector, PushStream, TransportError};

/// Opens the logging API's push socket.
///
/// Text frames are yielded as-is; binary frames are accepted when they hold
/// UTF-8. Control frames are handled by the socket and never surface.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let url = url.into();
        let parsed = url::Url::parse(&url)
            .map_err(|e| TransportError::Connect(format!("invalid push URL {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(TransportError::Connect(format!(
                "push URL must use ws or wss: {}",
                url
            )));
        }
        Ok(Self { url })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, TransportError> {
        Self::new(config.push_url())
    }
}

#[async_trait]
impl PushConnector for WsConnector {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<PushStream, TransportError> {
        let (socket, response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(url = %self.url, status = %response.status(), "WebSocket handshake complete");

        let frames = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => Some(Ok(text)),
                    Err(_) => {
                        warn!("Dropping non UTF-8 binary frame");
                        None
                    }
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Peer sent close frame");
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::Protocol(e.to_string()))),
            }
        });
        Ok(frames.boxed())
    }
}
