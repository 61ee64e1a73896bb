//! Live counters and log reset status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::StreamRecord;
use super::time::{option_timestamp, timestamp};

/// Counters pushed periodically over the live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStats {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub logs_count: u64,
    #[serde(default)]
    pub active_workflows: u64,
    #[serde(default)]
    pub active_alerts: u64,
}

impl StreamRecord for LiveStats {
    fn record_id(&self) -> String {
        self.timestamp.to_rfc3339()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Log retention / reset state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetStatus {
    #[serde(default, with = "option_timestamp")]
    pub last_reset_time: Option<DateTime<Utc>>,
    #[serde(default = "default_reset_status")]
    pub reset_status: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_reset_status() -> String {
    "unknown".to_string()
}

fn default_retention_days() -> u32 {
    1
}

impl Default for ResetStatus {
    fn default() -> Self {
        Self {
            last_reset_time: None,
            reset_status: default_reset_status(),
            retention_days: default_retention_days(),
        }
    }
}
