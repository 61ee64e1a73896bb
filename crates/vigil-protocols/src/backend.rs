//! Backend pull and mutation interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::types::{
    Alert, AlertSummary, LogEntry, PerformanceSample, PerformanceSummary, ResetStatus, Workflow,
};

/// Query for the recent-logs endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    pub limit: usize,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

impl LogQuery {
    /// Unfiltered query.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            module: None,
            level: None,
        }
    }

    /// Restrict to one module.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Restrict to one level.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }
}

/// The telemetry backend as seen by the sync client.
///
/// Every call may fail or time out; callers keep their last known good
/// data when it does.
#[async_trait]
pub trait TelemetryBackend: Send + Sync {
    /// Recent log lines, newest first.
    async fn recent_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>, BackendError>;

    /// Workflows that have not reached a terminal state.
    async fn active_workflows(&self) -> Result<Vec<Workflow>, BackendError>;

    /// Most recent finished workflows.
    async fn workflow_history(&self, limit: usize) -> Result<Vec<Workflow>, BackendError>;

    /// System samples for the trailing `hours`.
    async fn performance_metrics(&self, hours: u32) -> Result<Vec<PerformanceSample>, BackendError>;

    /// Backend-computed rolling summary.
    async fn performance_summary(&self) -> Result<PerformanceSummary, BackendError>;

    /// Alerts that are neither expired nor dismissed.
    async fn active_alerts(&self) -> Result<Vec<Alert>, BackendError>;

    /// Backend-computed alert counters.
    async fn alert_summary(&self) -> Result<AlertSummary, BackendError>;

    /// Log retention state.
    async fn reset_status(&self) -> Result<ResetStatus, BackendError>;

    /// Mark an alert acknowledged on behalf of `user`.
    async fn acknowledge_alert(&self, alert_id: &str, user: &str) -> Result<(), BackendError>;

    /// Dismiss an alert on behalf of `user`.
    async fn dismiss_alert(&self, alert_id: &str, user: &str) -> Result<(), BackendError>;

    /// Purge logs past retention.
    async fn cleanup_logs(&self) -> Result<(), BackendError>;
}
