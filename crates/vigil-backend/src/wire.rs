//! Response envelopes of the logging REST API.
//!
//! Every endpoint wraps its payload in a named field next to bookkeeping
//! such as `count` and `timestamp`, which are ignored here.

use serde::Deserialize;

use vigil_protocols::{
    Alert, AlertSummary, LogEntry, PerformanceSample, PerformanceSummary, ResetStatus, Workflow,
};

#[derive(Debug, Deserialize)]
pub struct LogsEnvelope {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowsEnvelope {
    #[serde(default)]
    pub workflows: Vec<Workflow>,
}

#[derive(Debug, Deserialize)]
pub struct MetricsEnvelope {
    #[serde(default)]
    pub system_metrics: Vec<PerformanceSample>,
}

#[derive(Debug, Deserialize)]
pub struct PerformanceSummaryEnvelope {
    #[serde(default)]
    pub summary: PerformanceSummary,
}

#[derive(Debug, Deserialize)]
pub struct AlertsEnvelope {
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Deserialize)]
pub struct AlertSummaryEnvelope {
    #[serde(default)]
    pub summary: AlertSummary,
}

#[derive(Debug, Deserialize)]
pub struct ResetStatusEnvelope {
    #[serde(default)]
    pub reset_status: ResetStatus,
}

/// Error body of a rejected request.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
