//! # Vigil Backend
//!
//! Network implementations of the vigil backend seams:
//!
//! - [`HttpBackend`] - [`TelemetryBackend`](vigil_protocols::TelemetryBackend) over the logging REST API
//! - [`WsConnector`] - [`PushConnector`](vigil_protocols::PushConnector) over the logging WebSocket

pub mod http;
pub mod wire;
pub mod ws;

pub use http::HttpBackend;
pub use ws::WsConnector;
