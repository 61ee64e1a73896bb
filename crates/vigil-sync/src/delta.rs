//! Stream identifiers and the delta batches handed to the reconciler.

use serde::{Deserialize, Serialize};

use vigil_protocols::{
    Alert, AlertSummary, LiveStats, LogEntry, PerformanceSample, PerformanceSummary, PushMessage,
    ResetStatus, Workflow,
};

/// Identifies one telemetry stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamId {
    Logs,
    ActiveWorkflows,
    WorkflowHistory,
    Performance,
    PerformanceSummary,
    Alerts,
    AlertSummary,
    ResetStatus,
    LiveStats,
}

impl StreamId {
    /// Streams that have a pull endpoint.
    pub const PULL_FEEDS: [StreamId; 8] = [
        StreamId::Logs,
        StreamId::ActiveWorkflows,
        StreamId::WorkflowHistory,
        StreamId::Performance,
        StreamId::PerformanceSummary,
        StreamId::Alerts,
        StreamId::AlertSummary,
        StreamId::ResetStatus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StreamId::Logs => "logs",
            StreamId::ActiveWorkflows => "active_workflows",
            StreamId::WorkflowHistory => "workflow_history",
            StreamId::Performance => "performance",
            StreamId::PerformanceSummary => "performance_summary",
            StreamId::Alerts => "alerts",
            StreamId::AlertSummary => "alert_summary",
            StreamId::ResetStatus => "reset_status",
            StreamId::LiveStats => "live_stats",
        }
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a delta came from. Recorded for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaSource {
    Push,
    Pull,
    /// Optimistic local mutation or its rollback.
    Local,
}

/// An immutable batch of updates for one stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    Logs(Vec<LogEntry>),
    /// `complete` marks a full snapshot of the backend's active set.
    ActiveWorkflows {
        workflows: Vec<Workflow>,
        complete: bool,
    },
    WorkflowHistory(Vec<Workflow>),
    PerformanceSamples(Vec<PerformanceSample>),
    PerformanceSummary(PerformanceSummary),
    /// `complete` marks a full snapshot of the backend's active set.
    Alerts {
        alerts: Vec<Alert>,
        complete: bool,
    },
    AlertSummary(AlertSummary),
    ResetStatus(ResetStatus),
    LiveStats(Vec<LiveStats>),
}

impl Delta {
    /// Target stream.
    pub fn stream(&self) -> StreamId {
        match self {
            Delta::Logs(_) => StreamId::Logs,
            Delta::ActiveWorkflows { .. } => StreamId::ActiveWorkflows,
            Delta::WorkflowHistory(_) => StreamId::WorkflowHistory,
            Delta::PerformanceSamples(_) => StreamId::Performance,
            Delta::PerformanceSummary(_) => StreamId::PerformanceSummary,
            Delta::Alerts { .. } => StreamId::Alerts,
            Delta::AlertSummary(_) => StreamId::AlertSummary,
            Delta::ResetStatus(_) => StreamId::ResetStatus,
            Delta::LiveStats(_) => StreamId::LiveStats,
        }
    }

    /// Number of records carried. Single-value slots count as one.
    pub fn len(&self) -> usize {
        match self {
            Delta::Logs(v) => v.len(),
            Delta::ActiveWorkflows { workflows, .. } => workflows.len(),
            Delta::WorkflowHistory(v) => v.len(),
            Delta::PerformanceSamples(v) => v.len(),
            Delta::Alerts { alerts, .. } => alerts.len(),
            Delta::LiveStats(v) => v.len(),
            Delta::PerformanceSummary(_) | Delta::AlertSummary(_) | Delta::ResetStatus(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert a push message into a delta. Keep-alives carry none.
    pub fn from_push(message: PushMessage) -> Option<Delta> {
        match message {
            PushMessage::RealTimeUpdate(stats) => Some(Delta::LiveStats(vec![stats])),
            PushMessage::LogEntry { log } => Some(Delta::Logs(vec![log])),
            PushMessage::WorkflowUpdate { workflow } => Some(Delta::ActiveWorkflows {
                workflows: vec![workflow],
                complete: false,
            }),
            PushMessage::Alert { alert } => Some(Delta::Alerts {
                alerts: vec![alert],
                complete: false,
            }),
            PushMessage::PerformanceSample { sample } => {
                Some(Delta::PerformanceSamples(vec![sample]))
            }
            PushMessage::Ping { .. } => None,
        }
    }
}
