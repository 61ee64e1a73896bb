//! System performance samples and the backend's rolling summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::StreamRecord;
use super::time::timestamp;

/// One system metrics sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    #[serde(rename = "disk_usage_percent", alias = "disk_percent")]
    pub disk_percent: f64,
    #[serde(default)]
    pub active_processes: u64,
    #[serde(default)]
    pub load_average: Option<f64>,
}

/// Samples are identified by their timestamp so a pushed sample and the same
/// row pulled later collapse into one entry.
impl StreamRecord for PerformanceSample {
    fn record_id(&self) -> String {
        self.timestamp.to_rfc3339()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Latest sample values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_percent: f64,
    #[serde(default)]
    pub disk_usage_percent: f64,
    #[serde(default)]
    pub active_processes: u64,
}

/// Trailing-window averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_percent: f64,
    #[serde(default)]
    pub disk_usage_percent: f64,
}

/// Per-module operation counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModulePerformance {
    #[serde(default)]
    pub operations: u64,
    #[serde(default)]
    pub total_duration: f64,
    #[serde(default)]
    pub avg_duration: f64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub fail_count: u64,
}

/// Rolling summary computed by the backend. An empty object is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    #[serde(default)]
    pub current: Option<CurrentMetrics>,
    #[serde(default, rename = "average_1h", alias = "average")]
    pub average: Option<AverageMetrics>,
    #[serde(default)]
    pub module_performance: BTreeMap<String, ModulePerformance>,
    #[serde(default)]
    pub alerts_count: u64,
    #[serde(default)]
    pub critical_alerts: u64,
    #[serde(default)]
    pub warning_alerts: u64,
}
