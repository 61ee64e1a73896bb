//! Workflow progress records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::StreamRecord;
use super::time::{option_timestamp, timestamp};

/// Workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }

    /// Position on the lifecycle; transitions never decrease it.
    pub fn rank(&self) -> u8 {
        match self {
            WorkflowStatus::Pending => 0,
            WorkflowStatus::Running => 1,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled => 2,
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// A workflow as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_id: String,
    #[serde(alias = "type")]
    pub workflow_type: String,
    pub status: WorkflowStatus,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(default, with = "option_timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub completed_steps: u32,
    #[serde(default)]
    pub failed_steps: u32,
    #[serde(default)]
    pub total_duration_ms: Option<f64>,
    #[serde(default)]
    pub progress_percentage: f64,
}

impl StreamRecord for Workflow {
    fn record_id(&self) -> String {
        self.workflow_id.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.start_time
    }
}
