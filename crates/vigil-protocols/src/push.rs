//! Push channel message definitions.

use serde::{Deserialize, Serialize};

use crate::types::{Alert, LiveStats, LogEntry, PerformanceSample, Workflow};

/// Messages delivered over the push channel.
///
/// Delivery is unreliable: consumers must tolerate gaps and duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// Periodic live counters.
    RealTimeUpdate(LiveStats),
    /// A single new or updated log line.
    LogEntry { log: LogEntry },
    /// Workflow progress.
    WorkflowUpdate { workflow: Workflow },
    /// A raised or updated alert.
    Alert { alert: Alert },
    /// A fresh performance sample.
    PerformanceSample { sample: PerformanceSample },
    /// Keep-alive.
    Ping {
        #[serde(default)]
        timestamp: Option<String>,
    },
}

impl PushMessage {
    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PushMessage::RealTimeUpdate(_) => "real_time_update",
            PushMessage::LogEntry { .. } => "log_entry",
            PushMessage::WorkflowUpdate { .. } => "workflow_update",
            PushMessage::Alert { .. } => "alert",
            PushMessage::PerformanceSample { .. } => "performance_sample",
            PushMessage::Ping { .. } => "ping",
        }
    }
}
