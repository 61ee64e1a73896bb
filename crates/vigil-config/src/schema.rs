//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub buffers: BufferConfig,

    #[serde(default)]
    pub view: ViewConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the HTTP API, e.g. `http://127.0.0.1:8000`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix of the logging API.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Push endpoint. Derived from `base_url` when unset.
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// User name sent with alert mutations.
    #[serde(default = "default_user")]
    pub user: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            ws_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            user: default_user(),
        }
    }
}

impl BackendConfig {
    /// HTTP root of the logging API, without trailing slash.
    pub fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        )
    }

    /// Push endpoint URL.
    pub fn push_url(&self) -> String {
        if let Some(ref url) = self.ws_url {
            return url.clone();
        }
        let root = self.api_root();
        let root = if let Some(rest) = root.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = root.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            root
        };
        format!("{}/ws", root)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_api_prefix() -> String {
    "/api/logging".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_user() -> String {
    "dashboard".to_string()
}

/// Push channel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Whether to open the push channel at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum wait for one connection attempt, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

/// Reconnect delay policy.
///
/// The defaults give a fixed 5 second delay. Set `multiplier > 1.0` for
/// exponential backoff capped at `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Add up to 10% extra delay. Never shortens the delay.
    #[serde(default)]
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter: false,
        }
    }
}

fn default_base_delay_ms() -> u64 {
    5_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    1.0
}

/// Pull feed cadences and query parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub logs_interval_ms: u64,

    #[serde(default = "default_interval_ms")]
    pub workflows_interval_ms: u64,

    #[serde(default = "default_interval_ms")]
    pub performance_interval_ms: u64,

    #[serde(default = "default_interval_ms")]
    pub alerts_interval_ms: u64,

    #[serde(default = "default_reset_status_interval_ms")]
    pub reset_status_interval_ms: u64,

    /// Maximum wait for one fetch, in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Upper bound of the random delay before a feed's first or
    /// post-reconnect fetch.
    #[serde(default = "default_startup_jitter_ms")]
    pub startup_jitter_ms: u64,

    /// Consecutive failures of one feed before the operator is notified.
    #[serde(default = "default_failure_notify_threshold")]
    pub failure_notify_threshold: u32,

    #[serde(default = "default_log_limit")]
    pub log_limit: usize,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default = "default_performance_hours")]
    pub performance_hours: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            logs_interval_ms: default_interval_ms(),
            workflows_interval_ms: default_interval_ms(),
            performance_interval_ms: default_interval_ms(),
            alerts_interval_ms: default_interval_ms(),
            reset_status_interval_ms: default_reset_status_interval_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            startup_jitter_ms: default_startup_jitter_ms(),
            failure_notify_threshold: default_failure_notify_threshold(),
            log_limit: default_log_limit(),
            history_limit: default_history_limit(),
            performance_hours: default_performance_hours(),
        }
    }
}

impl PollingConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn startup_jitter(&self) -> Duration {
        Duration::from_millis(self.startup_jitter_ms)
    }
}

fn default_interval_ms() -> u64 {
    5_000
}

fn default_reset_status_interval_ms() -> u64 {
    60_000
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_startup_jitter_ms() -> u64 {
    500
}

fn default_failure_notify_threshold() -> u32 {
    3
}

fn default_log_limit() -> usize {
    100
}

fn default_history_limit() -> usize {
    20
}

fn default_performance_hours() -> u32 {
    1
}

/// Per-stream buffer capacities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_logs_capacity")]
    pub logs: usize,

    #[serde(default = "default_workflow_capacity")]
    pub active_workflows: usize,

    #[serde(default = "default_workflow_capacity")]
    pub workflow_history: usize,

    #[serde(default = "default_performance_capacity")]
    pub performance: usize,

    #[serde(default = "default_alerts_capacity")]
    pub alerts: usize,

    #[serde(default = "default_live_stats_capacity")]
    pub live_stats: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            logs: default_logs_capacity(),
            active_workflows: default_workflow_capacity(),
            workflow_history: default_workflow_capacity(),
            performance: default_performance_capacity(),
            alerts: default_alerts_capacity(),
            live_stats: default_live_stats_capacity(),
        }
    }
}

fn default_logs_capacity() -> usize {
    1000
}

fn default_workflow_capacity() -> usize {
    100
}

fn default_performance_capacity() -> usize {
    200
}

fn default_alerts_capacity() -> usize {
    50
}

fn default_live_stats_capacity() -> usize {
    60
}

/// Projection limits for the render model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_view_logs")]
    pub max_logs: usize,

    #[serde(default = "default_view_alerts")]
    pub max_alerts: usize,

    #[serde(default = "default_view_history")]
    pub max_history: usize,

    #[serde(default = "default_view_samples")]
    pub max_samples: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            max_logs: default_view_logs(),
            max_alerts: default_view_alerts(),
            max_history: default_view_history(),
            max_samples: default_view_samples(),
        }
    }
}

fn default_view_logs() -> usize {
    1000
}

fn default_view_alerts() -> usize {
    50
}

fn default_view_history() -> usize {
    20
}

fn default_view_samples() -> usize {
    200
}

/// Logging output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files. Console only when unset.
    #[serde(default)]
    pub dir: Option<String>,

    /// Emit JSON lines on the console instead of text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
