//! Pure projection from stream buffers to the render model.

use std::collections::BTreeMap;

use serde::Serialize;

use vigil_config::ViewConfig;
use vigil_protocols::{
    Alert, AlertSummary, LiveStats, LogEntry, PerformanceSample, PerformanceSummary, ResetStatus,
    Workflow,
};

use crate::delta::StreamId;
use crate::health::FeedHealth;
use crate::reconciler::Buffers;
use crate::transport::ConnectionState;

/// Load band of a percentage metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricLevel {
    Low,
    Medium,
    High,
}

impl MetricLevel {
    /// Above 80 is high, above 60 medium.
    pub fn from_percent(value: f64) -> Self {
        if value > 80.0 {
            MetricLevel::High
        } else if value > 60.0 {
            MetricLevel::Medium
        } else {
            MetricLevel::Low
        }
    }
}

/// Latest sample with its load bands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentLoad {
    pub sample: PerformanceSample,
    pub cpu: MetricLevel,
    pub memory: MetricLevel,
    pub disk: MetricLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceView {
    /// Oldest first.
    pub samples: Vec<PerformanceSample>,
    pub current: Option<CurrentLoad>,
    pub summary: Option<PerformanceSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertsView {
    /// Newest first.
    pub items: Vec<Alert>,
    pub total: usize,
    pub unacknowledged: usize,
    pub summary: Option<AlertSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowsView {
    /// Oldest start first.
    pub active: Vec<Workflow>,
    /// Newest start first.
    pub history: Vec<Workflow>,
}

/// Everything the presentation layer paints.
///
/// Two projections of unchanged inputs compare equal, so a consumer can
/// skip redraws on equality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderModel {
    pub connection: ConnectionState,
    pub live: Option<LiveStats>,
    /// Newest last.
    pub logs: Vec<LogEntry>,
    pub workflows: WorkflowsView,
    pub performance: PerformanceView,
    pub alerts: AlertsView,
    pub reset_status: Option<ResetStatus>,
    pub feeds: BTreeMap<StreamId, FeedHealth>,
}

impl RenderModel {
    /// Feeds whose last fetch failed.
    pub fn stale_feeds(&self) -> Vec<StreamId> {
        self.feeds
            .iter()
            .filter(|(_, health)| health.stale)
            .map(|(stream, _)| *stream)
            .collect()
    }
}

/// Derives [`RenderModel`]s. Holds only the truncation limits.
#[derive(Debug, Clone, Default)]
pub struct ViewProjector {
    config: ViewConfig,
}

impl ViewProjector {
    pub fn new(config: ViewConfig) -> Self {
        Self { config }
    }

    pub fn project(
        &self,
        buffers: &Buffers,
        connection: ConnectionState,
        feeds: &BTreeMap<StreamId, FeedHealth>,
    ) -> RenderModel {
        let logs = buffers
            .logs
            .snapshot(Some(self.config.max_logs))
            .into_iter()
            .cloned()
            .collect();

        let alerts: Vec<Alert> = buffers
            .alerts
            .iter()
            .rev()
            .take(self.config.max_alerts)
            .cloned()
            .collect();
        let unacknowledged = buffers.alerts.iter().filter(|a| !a.acknowledged).count();

        let samples: Vec<PerformanceSample> = buffers
            .performance
            .snapshot(Some(self.config.max_samples))
            .into_iter()
            .cloned()
            .collect();
        let current = buffers.performance.latest().map(|sample| CurrentLoad {
            cpu: MetricLevel::from_percent(sample.cpu_percent),
            memory: MetricLevel::from_percent(sample.memory_percent),
            disk: MetricLevel::from_percent(sample.disk_percent),
            sample: sample.clone(),
        });

        RenderModel {
            connection,
            live: buffers.live_stats.latest().cloned(),
            logs,
            workflows: WorkflowsView {
                active: buffers.active_workflows.iter().cloned().collect(),
                history: buffers
                    .workflow_history
                    .iter()
                    .rev()
                    .take(self.config.max_history)
                    .cloned()
                    .collect(),
            },
            performance: PerformanceView {
                samples,
                current,
                summary: buffers.performance_summary.clone(),
            },
            alerts: AlertsView {
                items: alerts,
                total: buffers.alerts.len(),
                unacknowledged,
                summary: buffers.alert_summary.clone(),
            },
            reset_status: buffers.reset_status.clone(),
            feeds: feeds.clone(),
        }
    }
}
