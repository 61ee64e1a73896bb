//! Tests for telemetry data types.

use super::*;
use serde_json::json;

#[test]
fn test_log_entry_from_backend_row() {
    let raw = json!({
        "id": 42,
        "timestamp": "2024-05-01T10:00:00.500000",
        "module": "browser",
        "level": "WARNING",
        "message": "slow page load",
        "workflow_id": "wf-1",
        "step": null,
        "duration_ms": 1532,
        "status": null,
        "context": null,
        "metadata": {"url": "https://example.com"}
    });

    let log: LogEntry = serde_json::from_value(raw).unwrap();
    assert_eq!(log.record_id(), "42");
    assert_eq!(log.sequence(), Some(42));
    assert_eq!(log.log_level(), LogLevel::Warning);
    assert_eq!(log.duration_ms, Some(1532.0));
}

#[test]
fn test_log_level_parse() {
    assert_eq!(LogLevel::parse("debug"), LogLevel::Debug);
    assert_eq!(LogLevel::parse("WARN"), LogLevel::Warning);
    assert_eq!(LogLevel::parse("Critical"), LogLevel::Critical);
    assert_eq!(LogLevel::parse("verbose"), LogLevel::Info);
    assert_eq!(LogLevel::Error.to_string(), "ERROR");
}

#[test]
fn test_workflow_active_shape() {
    let raw = json!({
        "workflow_id": "wf-7",
        "workflow_type": "login_flow",
        "status": "running",
        "start_time": "2024-05-01T09:00:00",
        "total_steps": 5,
        "completed_steps": 2,
        "failed_steps": 0,
        "progress_percentage": 40.0
    });

    let wf: Workflow = serde_json::from_value(raw).unwrap();
    assert_eq!(wf.record_id(), "wf-7");
    assert_eq!(wf.status, WorkflowStatus::Running);
    assert!(wf.end_time.is_none());
    assert_eq!(wf.sequence(), None);
}

#[test]
fn test_workflow_history_shape() {
    let raw = json!({
        "workflow_id": "wf-8",
        "workflow_type": "scrape",
        "status": "completed",
        "start_time": "2024-05-01T09:00:00",
        "end_time": "2024-05-01T09:01:30",
        "total_duration_ms": 90000,
        "total_steps": 3,
        "completed_steps": 3,
        "failed_steps": 0
    });

    let wf: Workflow = serde_json::from_value(raw).unwrap();
    assert!(wf.status.is_terminal());
    assert!(wf.end_time.is_some());
    assert_eq!(wf.progress_percentage, 0.0);
}

#[test]
fn test_workflow_status_rank() {
    assert!(WorkflowStatus::Pending.rank() < WorkflowStatus::Running.rank());
    assert!(WorkflowStatus::Running.rank() < WorkflowStatus::Failed.rank());
    assert_eq!(WorkflowStatus::Completed.rank(), WorkflowStatus::Cancelled.rank());
    assert!(!WorkflowStatus::Running.is_terminal());
    assert_eq!(WorkflowStatus::Cancelled.to_string(), "cancelled");
}

#[test]
fn test_alert_from_backend_row() {
    let raw = json!({
        "id": "al-1",
        "type": "performance",
        "severity": "critical",
        "title": "CPU high",
        "message": "CPU above 95%",
        "timestamp": "2024-05-01T10:00:00",
        "module": null,
        "workflow_id": null,
        "metadata": null,
        "acknowledged": false,
        "acknowledged_by": null,
        "acknowledged_at": null,
        "expires_at": null,
        "auto_dismiss": false,
        "dismiss_after_hours": 24
    });

    let alert: Alert = serde_json::from_value(raw).unwrap();
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert_eq!(alert.alert_type, "performance");
    assert!(!alert.acknowledged);

    let text = alert.format_text();
    assert!(text.contains("[CRITICAL]"));
    assert!(text.contains("CPU high"));
}

#[test]
fn test_alert_summary_counts() {
    let raw = json!({
        "total_active": 3,
        "total_acknowledged": 1,
        "total_unacknowledged": 2,
        "severity_breakdown": {"critical": 1, "warning": 2},
        "type_breakdown": {},
        "module_breakdown": {"unknown": 3},
        "recent_actions": 4
    });

    let summary: AlertSummary = serde_json::from_value(raw).unwrap();
    assert_eq!(summary.count_for(AlertSeverity::Critical), 1);
    assert_eq!(summary.count_for(AlertSeverity::Warning), 2);
    assert_eq!(summary.count_for(AlertSeverity::Info), 0);
}

#[test]
fn test_empty_summaries_are_valid() {
    let perf: PerformanceSummary = serde_json::from_value(json!({})).unwrap();
    assert_eq!(perf, PerformanceSummary::default());

    let alerts: AlertSummary = serde_json::from_value(json!({})).unwrap();
    assert_eq!(alerts.total_active, 0);

    let reset: ResetStatus = serde_json::from_value(json!({})).unwrap();
    assert_eq!(reset.reset_status, "unknown");
    assert_eq!(reset.retention_days, 1);
}

#[test]
fn test_performance_summary_shape() {
    let raw = json!({
        "current": {
            "cpu_percent": 12.5,
            "memory_percent": 40.0,
            "disk_usage_percent": 70.0,
            "active_processes": 210
        },
        "average_1h": {
            "cpu_percent": 10.0,
            "memory_percent": 38.0,
            "disk_usage_percent": 69.5
        },
        "module_performance": {
            "browser": {"operations": 2, "total_duration": 300, "avg_duration": 150, "success_count": 2, "fail_count": 0}
        },
        "alerts_count": 1,
        "critical_alerts": 0,
        "warning_alerts": 1
    });

    let summary: PerformanceSummary = serde_json::from_value(raw).unwrap();
    assert_eq!(summary.current.unwrap().active_processes, 210);
    assert_eq!(summary.average.unwrap().disk_usage_percent, 69.5);
    assert_eq!(summary.module_performance["browser"].operations, 2);
}

#[test]
fn test_performance_sample_identity() {
    let raw = json!({
        "id": 9,
        "timestamp": "2024-05-01 10:00:00",
        "cpu_percent": 5.0,
        "memory_percent": 30.0,
        "disk_usage_percent": 60.0,
        "active_processes": 100
    });
    let sample: PerformanceSample = serde_json::from_value(raw).unwrap();
    assert_eq!(sample.id, Some(9));
    assert_eq!(sample.record_id(), "2024-05-01T10:00:00+00:00");
    assert_eq!(sample.sequence(), None);

    let raw = json!({
        "timestamp": "2024-05-01T10:00:00Z",
        "cpu_percent": 5.0,
        "memory_percent": 30.0,
        "disk_percent": 60.0
    });
    let sample: PerformanceSample = serde_json::from_value(raw).unwrap();
    assert_eq!(sample.sequence(), None);
    assert_eq!(sample.record_id(), "2024-05-01T10:00:00+00:00");
}

#[test]
fn test_reset_status_shape() {
    let raw = json!({
        "last_reset_time": "2024-05-01T00:00:00",
        "reset_status": "completed",
        "retention_days": 7
    });
    let status: ResetStatus = serde_json::from_value(raw).unwrap();
    assert!(status.last_reset_time.is_some());
    assert_eq!(status.retention_days, 7);
}
