//! REST client for the logging API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use vigil_config::BackendConfig;
use vigil_protocols::{
    Alert, AlertSummary, BackendError, LogEntry, LogQuery, PerformanceSample, PerformanceSummary,
    ResetStatus, TelemetryBackend, Workflow,
};

use crate::wire::{
    AlertSummaryEnvelope, AlertsEnvelope, ErrorBody, LogsEnvelope, MetricsEnvelope,
    PerformanceSummaryEnvelope, ResetStatusEnvelope, WorkflowsEnvelope,
};

/// [`TelemetryBackend`] over HTTP.
pub struct HttpBackend {
    client: Client,
    api_root: String,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a backend rooted at `{base_url}{api_prefix}`.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_root: config.api_root(),
            timeout,
        })
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.api_root, path);
        debug!(%method, %url, "Backend request");
        self.client.request(method, url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await.map_err(|e| self.map_reqwest(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_reqwest(e))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(error) => error.detail,
                Err(_) => body,
            };
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    async fn get<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn map_reqwest(&self, error: reqwest::Error) -> BackendError {
        if error.is_timeout() {
            BackendError::Timeout(self.timeout.as_millis() as u64)
        } else if error.is_decode() {
            BackendError::Decode(error.to_string())
        } else {
            BackendError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl TelemetryBackend for HttpBackend {
    async fn recent_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>, BackendError> {
        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(ref module) = query.module {
            params.push(("module", module.clone()));
        }
        if let Some(ref level) = query.level {
            params.push(("level", level.clone()));
        }
        let request = self.request(Method::GET, "logs/recent").query(&params);
        let envelope: LogsEnvelope = self.get(request).await?;
        Ok(envelope.logs)
    }

    async fn active_workflows(&self) -> Result<Vec<Workflow>, BackendError> {
        let envelope: WorkflowsEnvelope =
            self.get(self.request(Method::GET, "workflows/active")).await?;
        Ok(envelope.workflows)
    }

    async fn workflow_history(&self, limit: usize) -> Result<Vec<Workflow>, BackendError> {
        let request = self
            .request(Method::GET, "workflows/history")
            .query(&[("limit", limit)]);
        let envelope: WorkflowsEnvelope = self.get(request).await?;
        Ok(envelope.workflows)
    }

    async fn performance_metrics(&self, hours: u32) -> Result<Vec<PerformanceSample>, BackendError> {
        let request = self
            .request(Method::GET, "performance/metrics")
            .query(&[("hours", hours)]);
        let envelope: MetricsEnvelope = self.get(request).await?;
        Ok(envelope.system_metrics)
    }

    async fn performance_summary(&self) -> Result<PerformanceSummary, BackendError> {
        let envelope: PerformanceSummaryEnvelope =
            self.get(self.request(Method::GET, "performance/summary")).await?;
        Ok(envelope.summary)
    }

    async fn active_alerts(&self) -> Result<Vec<Alert>, BackendError> {
        let envelope: AlertsEnvelope = self.get(self.request(Method::GET, "alerts/active")).await?;
        Ok(envelope.alerts)
    }

    async fn alert_summary(&self) -> Result<AlertSummary, BackendError> {
        let envelope: AlertSummaryEnvelope =
            self.get(self.request(Method::GET, "alerts/summary")).await?;
        Ok(envelope.summary)
    }

    async fn reset_status(&self) -> Result<ResetStatus, BackendError> {
        let envelope: ResetStatusEnvelope =
            self.get(self.request(Method::GET, "reset/status")).await?;
        Ok(envelope.reset_status)
    }

    async fn acknowledge_alert(&self, alert_id: &str, user: &str) -> Result<(), BackendError> {
        let request = self
            .request(Method::POST, &format!("alerts/{}/acknowledge", alert_id))
            .query(&[("user", user)]);
        self.send(request).await.map(|_| ())
    }

    async fn dismiss_alert(&self, alert_id: &str, user: &str) -> Result<(), BackendError> {
        let request = self
            .request(Method::DELETE, &format!("alerts/{}", alert_id))
            .query(&[("user", user)]);
        self.send(request).await.map(|_| ())
    }

    async fn cleanup_logs(&self) -> Result<(), BackendError> {
        self.send(self.request(Method::POST, "reset/cleanup"))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_root_from_config() {
        let config = BackendConfig {
            base_url: "http://monitor.local:9000/".to_string(),
            ..Default::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(backend.api_root(), "http://monitor.local:9000/api/logging");
    }
}
