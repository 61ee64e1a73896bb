//! Merges push and pull deltas into the authoritative stream buffers.
//!
//! The reconciler is the single writer of every [`StreamBuffer`]. Deltas are
//! applied strictly in the order they are handed in; when two deltas disagree
//! on the payload of one id, the one applied last wins.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use vigil_config::BufferConfig;
use vigil_protocols::{
    Alert, AlertSummary, LiveStats, LogEntry, PerformanceSample, PerformanceSummary, ResetStatus,
    StreamRecord, Workflow,
};

use crate::buffer::StreamBuffer;
use crate::delta::{Delta, DeltaSource, StreamId};

/// Every buffer and latest-value slot owned by the reconciler.
#[derive(Debug, Clone)]
pub struct Buffers {
    pub logs: StreamBuffer<LogEntry>,
    pub active_workflows: StreamBuffer<Workflow>,
    pub workflow_history: StreamBuffer<Workflow>,
    pub performance: StreamBuffer<PerformanceSample>,
    pub alerts: StreamBuffer<Alert>,
    pub live_stats: StreamBuffer<LiveStats>,
    pub performance_summary: Option<PerformanceSummary>,
    pub alert_summary: Option<AlertSummary>,
    pub reset_status: Option<ResetStatus>,
}

impl Buffers {
    pub fn new(config: &BufferConfig) -> Self {
        Self {
            logs: StreamBuffer::new(config.logs),
            active_workflows: StreamBuffer::new(config.active_workflows),
            workflow_history: StreamBuffer::new(config.workflow_history),
            performance: StreamBuffer::new(config.performance),
            alerts: StreamBuffer::new(config.alerts),
            live_stats: StreamBuffer::new(config.live_stats),
            performance_summary: None,
            alert_summary: None,
            reset_status: None,
        }
    }
}

impl Default for Buffers {
    fn default() -> Self {
        Self::new(&BufferConfig::default())
    }
}

/// Per-stream delivery counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamDiagnostics {
    pub push_deltas: u64,
    pub pull_deltas: u64,
    pub local_deltas: u64,
    /// Deltas that changed the buffer.
    pub changed_deltas: u64,
    pub last_source: Option<DeltaSource>,
}

/// Owner of all stream state.
#[derive(Debug)]
pub struct Reconciler {
    buffers: Buffers,
    diagnostics: HashMap<StreamId, StreamDiagnostics>,
    revision: u64,
    render_due: bool,
}

impl Reconciler {
    pub fn new(config: &BufferConfig) -> Self {
        Self {
            buffers: Buffers::new(config),
            diagnostics: HashMap::new(),
            revision: 0,
            render_due: false,
        }
    }

    /// Apply one delta. Returns whether any buffer or slot changed.
    pub fn apply_delta(&mut self, source: DeltaSource, delta: Delta) -> bool {
        let stream = delta.stream();
        let size = delta.len();

        let changed = match delta {
            Delta::Logs(entries) => self.buffers.logs.upsert(oldest_first(entries)),
            Delta::ActiveWorkflows {
                workflows,
                complete,
            } => self.apply_workflows(workflows, complete),
            Delta::WorkflowHistory(workflows) => self.apply_workflows(workflows, false),
            Delta::PerformanceSamples(samples) => {
                self.buffers.performance.upsert(oldest_first(samples))
            }
            Delta::PerformanceSummary(summary) => {
                replace_slot(&mut self.buffers.performance_summary, summary)
            }
            Delta::Alerts { alerts, complete } => self.apply_alerts(alerts, complete),
            Delta::AlertSummary(summary) => replace_slot(&mut self.buffers.alert_summary, summary),
            Delta::ResetStatus(status) => replace_slot(&mut self.buffers.reset_status, status),
            Delta::LiveStats(stats) => self.buffers.live_stats.upsert(oldest_first(stats)),
        };

        self.record(stream, source, changed);
        debug!(
            stream = %stream,
            source = ?source,
            entries = size,
            changed,
            "Applied delta"
        );
        changed
    }

    fn apply_workflows(&mut self, workflows: Vec<Workflow>, complete: bool) -> bool {
        let seen: HashSet<String> = if complete {
            workflows.iter().map(|w| w.workflow_id.clone()).collect()
        } else {
            HashSet::new()
        };

        let mut changed = false;
        for workflow in oldest_first(workflows) {
            changed |= self.apply_workflow(workflow);
        }

        if complete {
            let pruned = self
                .buffers
                .active_workflows
                .retain_ids(|id| seen.contains(id));
            changed |= pruned > 0;
        }
        changed
    }

    /// Enforce the workflow lifecycle: history is immutable, status never
    /// moves backwards, terminal workflows move from active to history.
    fn apply_workflow(&mut self, workflow: Workflow) -> bool {
        let id = workflow.workflow_id.as_str();

        if self.buffers.workflow_history.contains(id) {
            return false;
        }

        if let Some(current) = self.buffers.active_workflows.get(id) {
            if workflow.status.rank() < current.status.rank() {
                debug!(
                    workflow_id = id,
                    from = %current.status,
                    to = %workflow.status,
                    "Ignoring workflow status regression"
                );
                return false;
            }
        }

        if workflow.status.is_terminal() {
            let removed = self.buffers.active_workflows.remove(id).is_some();
            let inserted = self.buffers.workflow_history.upsert([workflow]);
            removed || inserted
        } else {
            self.buffers.active_workflows.upsert([workflow])
        }
    }

    fn apply_alerts(&mut self, alerts: Vec<Alert>, complete: bool) -> bool {
        let seen: HashSet<String> = if complete {
            alerts.iter().map(|a| a.id.clone()).collect()
        } else {
            HashSet::new()
        };

        let mut changed = self.buffers.alerts.upsert(oldest_first(alerts));
        if complete {
            changed |= self.buffers.alerts.retain_ids(|id| seen.contains(id)) > 0;
        }
        changed
    }

    /// Remove an alert locally. Returns the removed entry.
    pub fn remove_alert(&mut self, alert_id: &str) -> Option<Alert> {
        let removed = self.buffers.alerts.remove(alert_id);
        self.record(StreamId::Alerts, DeltaSource::Local, removed.is_some());
        removed
    }

    /// Drop every buffered log line, e.g. after the log filter changed.
    pub fn clear_logs(&mut self) -> bool {
        let changed = !self.buffers.logs.is_empty();
        self.buffers.logs.clear();
        self.record(StreamId::Logs, DeltaSource::Local, changed);
        changed
    }

    fn record(&mut self, stream: StreamId, source: DeltaSource, changed: bool) {
        let diag = self.diagnostics.entry(stream).or_default();
        match source {
            DeltaSource::Push => diag.push_deltas += 1,
            DeltaSource::Pull => diag.pull_deltas += 1,
            DeltaSource::Local => diag.local_deltas += 1,
        }
        diag.last_source = Some(source);
        if changed {
            diag.changed_deltas += 1;
            self.revision += 1;
            self.render_due = true;
        }
    }

    /// Read-only view of all buffers.
    pub fn buffers(&self) -> &Buffers {
        &self.buffers
    }

    pub fn alert(&self, alert_id: &str) -> Option<&Alert> {
        self.buffers.alerts.get(alert_id)
    }

    pub fn active_workflow_count(&self) -> usize {
        self.buffers.active_workflows.len()
    }

    pub fn active_alert_count(&self) -> usize {
        self.buffers.alerts.len()
    }

    pub fn diagnostics(&self, stream: StreamId) -> StreamDiagnostics {
        self.diagnostics.get(&stream).cloned().unwrap_or_default()
    }

    /// Incremented on every change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether a change happened since the last call. Resets the flag.
    pub fn take_render_due(&mut self) -> bool {
        std::mem::take(&mut self.render_due)
    }
}

/// Pull lists arrive newest first; applying them oldest first keeps
/// synthesized arrival order chronological.
fn oldest_first<T: StreamRecord>(mut entries: Vec<T>) -> Vec<T> {
    entries.sort_by_key(|e| (e.sequence(), e.timestamp()));
    entries
}

fn replace_slot<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        return false;
    }
    *slot = Some(value);
    true
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
