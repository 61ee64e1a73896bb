//! Telemetry data types.

mod alert;
mod log;
mod performance;
mod record;
mod stats;
pub mod time;
mod workflow;

pub use alert::{Alert, AlertSeverity, AlertSummary};
pub use log::{LogEntry, LogLevel};
pub use performance::{
    AverageMetrics, CurrentMetrics, ModulePerformance, PerformanceSample, PerformanceSummary,
};
pub use record::StreamRecord;
pub use stats::{LiveStats, ResetStatus};
pub use workflow::{Workflow, WorkflowStatus};

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
