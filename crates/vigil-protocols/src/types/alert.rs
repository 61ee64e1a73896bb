//! Alert records and summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::StreamRecord;
use super::time::{option_timestamp, timestamp};

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
    /// Critical.
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "INFO"),
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Error => write!(f, "ERROR"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl AlertSeverity {
    /// Get emoji for severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "\u{2139}\u{fe0f}",
            AlertSeverity::Warning => "\u{26a0}\u{fe0f}",
            AlertSeverity::Error => "\u{274c}",
            AlertSeverity::Critical => "\u{1f6a8}",
        }
    }
}

/// An alert as held by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub severity: AlertSeverity,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub title: String,
    pub message: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default, with = "option_timestamp")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl Alert {
    /// Format for text output.
    pub fn format_text(&self) -> String {
        let mut text = format!(
            "[{}] {} - {}\n{}",
            self.severity,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.title,
            self.message
        );

        if let Some(ref module) = self.module {
            text.push_str(&format!("\nModule: {}", module));
        }
        if self.acknowledged {
            text.push_str("\n(acknowledged)");
        }

        text
    }
}

impl StreamRecord for Alert {
    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Backend-computed alert counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    #[serde(default)]
    pub total_active: u64,
    #[serde(default)]
    pub total_acknowledged: u64,
    #[serde(default)]
    pub total_unacknowledged: u64,
    #[serde(default)]
    pub severity_breakdown: BTreeMap<String, u64>,
    #[serde(default)]
    pub type_breakdown: BTreeMap<String, u64>,
    #[serde(default)]
    pub module_breakdown: BTreeMap<String, u64>,
    #[serde(default)]
    pub recent_actions: u64,
}

impl AlertSummary {
    /// Active alerts of the given severity.
    pub fn count_for(&self, severity: AlertSeverity) -> u64 {
        let key = severity.to_string().to_ascii_lowercase();
        self.severity_breakdown.get(&key).copied().unwrap_or(0)
    }
}
