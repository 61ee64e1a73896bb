//! Push/pull convergence tests against the public reconciliation API.
//!
//! Push and pull deliver overlapping views of the same backend state in any
//! order; whatever the interleaving, the buffers must end up identical.

use chrono::{DateTime, TimeZone, Utc};

use vigil_config::{BufferConfig, ViewConfig};
use vigil_protocols::{Alert, AlertSeverity, LogEntry, PushMessage, Workflow, WorkflowStatus};
use vigil_sync::{ConnectionState, Delta, DeltaSource, Reconciler, ViewProjector};

// ============================================================================
// Test Helpers
// ============================================================================

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
}

fn log(id: i64) -> LogEntry {
    LogEntry {
        id,
        timestamp: at(id),
        module: Some("api".to_string()),
        level: "INFO".to_string(),
        message: format!("request {}", id),
        workflow_id: None,
        step: None,
        duration_ms: None,
        status: None,
        context: None,
        metadata: None,
    }
}

fn workflow(id: &str, status: WorkflowStatus) -> Workflow {
    Workflow {
        workflow_id: id.to_string(),
        workflow_type: "checkout".to_string(),
        status,
        start_time: at(0),
        end_time: None,
        total_steps: 3,
        completed_steps: 0,
        failed_steps: 0,
        total_duration_ms: None,
        progress_percentage: 0.0,
    }
}

fn alert(id: &str, ts: i64) -> Alert {
    Alert {
        id: id.to_string(),
        severity: AlertSeverity::Warning,
        alert_type: "performance".to_string(),
        title: format!("Alert {}", id),
        message: "cpu high".to_string(),
        timestamp: at(ts),
        module: None,
        workflow_id: None,
        acknowledged: false,
        acknowledged_by: None,
        acknowledged_at: None,
        metadata: None,
    }
}

fn small_buffers() -> BufferConfig {
    BufferConfig {
        logs: 5,
        ..Default::default()
    }
}

/// Every delta of one scenario, tagged with its source.
fn scenario() -> Vec<(DeltaSource, Delta)> {
    vec![
        (DeltaSource::Pull, Delta::Logs((1..=4).rev().map(log).collect())),
        (DeltaSource::Push, Delta::Logs(vec![log(5)])),
        (DeltaSource::Push, Delta::Logs(vec![log(3)])),
        (DeltaSource::Pull, Delta::Logs((3..=7).rev().map(log).collect())),
        (
            DeltaSource::Push,
            Delta::Alerts {
                alerts: vec![alert("a1", 1)],
                complete: false,
            },
        ),
        (
            DeltaSource::Pull,
            Delta::Alerts {
                alerts: vec![alert("a1", 1), alert("a2", 2)],
                complete: false,
            },
        ),
    ]
}

fn snapshot_ids(reconciler: &Reconciler) -> (Vec<i64>, Vec<String>) {
    let logs = reconciler
        .buffers()
        .logs
        .snapshot(None)
        .into_iter()
        .map(|l| l.id)
        .collect();
    let alerts = reconciler.buffers().alerts.ids();
    (logs, alerts)
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn test_interleavings_converge() {
    let deltas = scenario();

    let mut forward = Reconciler::new(&small_buffers());
    for (source, delta) in deltas.iter().cloned() {
        forward.apply_delta(source, delta);
    }

    let mut backward = Reconciler::new(&small_buffers());
    for (source, delta) in deltas.iter().rev().cloned() {
        backward.apply_delta(source, delta);
    }

    let (logs, mut alerts) = snapshot_ids(&forward);
    let (logs_back, mut alerts_back) = snapshot_ids(&backward);
    assert_eq!(logs, vec![3, 4, 5, 6, 7]);
    assert_eq!(logs, logs_back);
    alerts.sort();
    alerts_back.sort();
    assert_eq!(alerts, alerts_back);
}

#[test]
fn test_replaying_everything_changes_nothing() {
    let mut reconciler = Reconciler::new(&small_buffers());
    for (source, delta) in scenario() {
        reconciler.apply_delta(source, delta);
    }
    let before = snapshot_ids(&reconciler);
    let revision = reconciler.revision();

    for (source, delta) in scenario() {
        assert!(!reconciler.apply_delta(source, delta));
    }
    assert_eq!(snapshot_ids(&reconciler), before);
    assert_eq!(reconciler.revision(), revision);
}

#[test]
fn test_identical_push_after_pull_is_not_a_change() {
    let mut reconciler = Reconciler::new(&BufferConfig::default());
    assert!(reconciler.apply_delta(DeltaSource::Pull, Delta::Logs(vec![log(5)])));

    let pushed = PushMessage::LogEntry { log: log(5) };
    let delta = Delta::from_push(pushed).unwrap();
    assert!(!reconciler.apply_delta(DeltaSource::Push, delta));
    assert_eq!(reconciler.buffers().logs.len(), 1);

    let diag = reconciler.diagnostics(vigil_sync::StreamId::Logs);
    assert_eq!(diag.pull_deltas, 1);
    assert_eq!(diag.push_deltas, 1);
    assert_eq!(diag.changed_deltas, 1);
}

#[test]
fn test_late_running_update_does_not_revive_finished_workflow() {
    let mut reconciler = Reconciler::new(&BufferConfig::default());
    reconciler.apply_delta(
        DeltaSource::Push,
        Delta::ActiveWorkflows {
            workflows: vec![workflow("w1", WorkflowStatus::Running)],
            complete: false,
        },
    );
    reconciler.apply_delta(
        DeltaSource::Push,
        Delta::ActiveWorkflows {
            workflows: vec![workflow("w1", WorkflowStatus::Completed)],
            complete: false,
        },
    );
    // a pull issued before completion lands afterwards
    reconciler.apply_delta(
        DeltaSource::Pull,
        Delta::ActiveWorkflows {
            workflows: vec![workflow("w1", WorkflowStatus::Running)],
            complete: true,
        },
    );

    assert_eq!(reconciler.active_workflow_count(), 0);
    assert!(reconciler.buffers().workflow_history.contains("w1"));
}

#[test]
fn test_projection_after_convergence() {
    let mut reconciler = Reconciler::new(&small_buffers());
    for (source, delta) in scenario() {
        reconciler.apply_delta(source, delta);
    }

    let projector = ViewProjector::new(ViewConfig {
        max_logs: 3,
        ..Default::default()
    });
    let feeds = Default::default();
    let model = projector.project(reconciler.buffers(), ConnectionState::Connected, &feeds);

    let logs: Vec<i64> = model.logs.iter().map(|l| l.id).collect();
    assert_eq!(logs, vec![5, 6, 7]);
    assert_eq!(model.alerts.items[0].id, "a2");
    assert_eq!(
        model,
        projector.project(reconciler.buffers(), ConnectionState::Connected, &feeds)
    );
}
