//! Log stream entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::StreamRecord;
use super::time::timestamp;

/// Normalized log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Parse a backend level string. Unknown levels read as `Info`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => LogLevel::Debug,
            "warning" | "warn" => LogLevel::Warning,
            "error" => LogLevel::Error,
            "critical" | "fatal" => LogLevel::Critical,
            _ => LogLevel::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A backend log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Row id; monotonic on the backend.
    pub id: i64,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub module: Option<String>,
    /// Raw level string as sent by the backend.
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl LogEntry {
    /// Normalized level.
    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.level)
    }
}

impl StreamRecord for LogEntry {
    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn sequence(&self) -> Option<u64> {
        u64::try_from(self.id).ok()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
