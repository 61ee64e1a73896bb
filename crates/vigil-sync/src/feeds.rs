//! Pull feeds backed by a [`TelemetryBackend`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use vigil_config::PollingConfig;
use vigil_protocols::{BackendError, LogQuery, TelemetryBackend};

use crate::delta::{Delta, StreamId};
use crate::poll::PullFeed;

/// One backend pull request and its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedRequest {
    Logs(LogQuery),
    ActiveWorkflows,
    WorkflowHistory { limit: usize },
    Performance { hours: u32 },
    PerformanceSummary,
    Alerts,
    AlertSummary,
    ResetStatus,
}

impl FeedRequest {
    /// Default request for a pull stream. `None` for push-only streams.
    pub fn for_stream(stream: StreamId, polling: &PollingConfig) -> Option<Self> {
        let request = match stream {
            StreamId::Logs => FeedRequest::Logs(LogQuery::new(polling.log_limit)),
            StreamId::ActiveWorkflows => FeedRequest::ActiveWorkflows,
            StreamId::WorkflowHistory => FeedRequest::WorkflowHistory {
                limit: polling.history_limit,
            },
            StreamId::Performance => FeedRequest::Performance {
                hours: polling.performance_hours,
            },
            StreamId::PerformanceSummary => FeedRequest::PerformanceSummary,
            StreamId::Alerts => FeedRequest::Alerts,
            StreamId::AlertSummary => FeedRequest::AlertSummary,
            StreamId::ResetStatus => FeedRequest::ResetStatus,
            StreamId::LiveStats => return None,
        };
        Some(request)
    }

    pub fn stream(&self) -> StreamId {
        match self {
            FeedRequest::Logs(_) => StreamId::Logs,
            FeedRequest::ActiveWorkflows => StreamId::ActiveWorkflows,
            FeedRequest::WorkflowHistory { .. } => StreamId::WorkflowHistory,
            FeedRequest::Performance { .. } => StreamId::Performance,
            FeedRequest::PerformanceSummary => StreamId::PerformanceSummary,
            FeedRequest::Alerts => StreamId::Alerts,
            FeedRequest::AlertSummary => StreamId::AlertSummary,
            FeedRequest::ResetStatus => StreamId::ResetStatus,
        }
    }
}

/// Poll cadence of a stream.
pub fn interval_for(stream: StreamId, polling: &PollingConfig) -> Duration {
    let ms = match stream {
        StreamId::Logs => polling.logs_interval_ms,
        StreamId::ActiveWorkflows | StreamId::WorkflowHistory => polling.workflows_interval_ms,
        StreamId::Performance | StreamId::PerformanceSummary => polling.performance_interval_ms,
        StreamId::Alerts | StreamId::AlertSummary | StreamId::LiveStats => {
            polling.alerts_interval_ms
        }
        StreamId::ResetStatus => polling.reset_status_interval_ms,
    };
    Duration::from_millis(ms)
}

/// A [`PullFeed`] issuing one [`FeedRequest`] against the backend.
pub struct BackendFeed {
    backend: Arc<dyn TelemetryBackend>,
    request: FeedRequest,
}

impl BackendFeed {
    pub fn new(backend: Arc<dyn TelemetryBackend>, request: FeedRequest) -> Self {
        Self { backend, request }
    }

    pub fn request(&self) -> &FeedRequest {
        &self.request
    }
}

#[async_trait]
impl PullFeed for BackendFeed {
    async fn fetch(&self) -> Result<Delta, BackendError> {
        let delta = match &self.request {
            FeedRequest::Logs(query) => Delta::Logs(self.backend.recent_logs(query).await?),
            FeedRequest::ActiveWorkflows => Delta::ActiveWorkflows {
                workflows: self.backend.active_workflows().await?,
                complete: true,
            },
            FeedRequest::WorkflowHistory { limit } => {
                Delta::WorkflowHistory(self.backend.workflow_history(*limit).await?)
            }
            FeedRequest::Performance { hours } => {
                Delta::PerformanceSamples(self.backend.performance_metrics(*hours).await?)
            }
            FeedRequest::PerformanceSummary => {
                Delta::PerformanceSummary(self.backend.performance_summary().await?)
            }
            FeedRequest::Alerts => Delta::Alerts {
                alerts: self.backend.active_alerts().await?,
                complete: true,
            },
            FeedRequest::AlertSummary => Delta::AlertSummary(self.backend.alert_summary().await?),
            FeedRequest::ResetStatus => Delta::ResetStatus(self.backend.reset_status().await?),
        };
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pull_stream_has_a_request() {
        let polling = PollingConfig::default();
        for stream in StreamId::PULL_FEEDS {
            let request = FeedRequest::for_stream(stream, &polling).unwrap();
            assert_eq!(request.stream(), stream);
        }
        assert!(FeedRequest::for_stream(StreamId::LiveStats, &polling).is_none());
    }

    #[test]
    fn test_request_parameters_come_from_config() {
        let polling = PollingConfig {
            log_limit: 25,
            history_limit: 7,
            performance_hours: 6,
            ..Default::default()
        };
        assert_eq!(
            FeedRequest::for_stream(StreamId::Logs, &polling),
            Some(FeedRequest::Logs(LogQuery::new(25)))
        );
        assert_eq!(
            FeedRequest::for_stream(StreamId::WorkflowHistory, &polling),
            Some(FeedRequest::WorkflowHistory { limit: 7 })
        );
        assert_eq!(
            FeedRequest::for_stream(StreamId::Performance, &polling),
            Some(FeedRequest::Performance { hours: 6 })
        );
    }

    #[test]
    fn test_intervals() {
        let polling = PollingConfig {
            logs_interval_ms: 1_000,
            reset_status_interval_ms: 30_000,
            ..Default::default()
        };
        assert_eq!(interval_for(StreamId::Logs, &polling), Duration::from_secs(1));
        assert_eq!(
            interval_for(StreamId::ResetStatus, &polling),
            Duration::from_secs(30)
        );
        assert_eq!(
            interval_for(StreamId::AlertSummary, &polling),
            Duration::from_secs(5)
        );
    }
}
