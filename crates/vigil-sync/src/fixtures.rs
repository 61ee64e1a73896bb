//! Record builders shared by unit tests.

use chrono::{DateTime, TimeZone, Utc};

use vigil_protocols::{
    Alert, AlertSeverity, LiveStats, LogEntry, PerformanceSample, Workflow, WorkflowStatus,
};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
}

pub fn log(id: i64, module: &str, level: &str) -> LogEntry {
    LogEntry {
        id,
        timestamp: at(id),
        module: Some(module.to_string()),
        level: level.to_string(),
        message: format!("line {}", id),
        workflow_id: None,
        step: None,
        duration_ms: None,
        status: None,
        context: None,
        metadata: None,
    }
}

pub fn workflow(id: &str, status: WorkflowStatus, start: i64) -> Workflow {
    Workflow {
        workflow_id: id.to_string(),
        workflow_type: "login".to_string(),
        status,
        start_time: at(start),
        end_time: status.is_terminal().then(|| at(start + 30)),
        total_steps: 4,
        completed_steps: if status.is_terminal() { 4 } else { 1 },
        failed_steps: 0,
        total_duration_ms: None,
        progress_percentage: if status.is_terminal() { 100.0 } else { 25.0 },
    }
}

pub fn alert(id: &str, severity: AlertSeverity, ts: i64) -> Alert {
    Alert {
        id: id.to_string(),
        severity,
        alert_type: "system".to_string(),
        title: format!("Alert {}", id),
        message: "threshold exceeded".to_string(),
        timestamp: at(ts),
        module: None,
        workflow_id: None,
        acknowledged: false,
        acknowledged_by: None,
        acknowledged_at: None,
        metadata: None,
    }
}

pub fn sample(ts: i64, cpu: f64) -> PerformanceSample {
    PerformanceSample {
        id: Some(ts),
        timestamp: at(ts),
        cpu_percent: cpu,
        memory_percent: 40.0,
        disk_percent: 55.0,
        active_processes: 120,
        load_average: None,
    }
}

pub fn stats(ts: i64, logs: u64, workflows: u64, alerts: u64) -> LiveStats {
    LiveStats {
        timestamp: at(ts),
        logs_count: logs,
        active_workflows: workflows,
        active_alerts: alerts,
    }
}
