//! Optimistic alert acknowledge/dismiss with rollback.
//!
//! An alert is `active`, then `acknowledged` (still buffered) or `dismissed`
//! (removed). Both transitions are applied locally at once and confirmed by
//! the backend later; a rejection restores the prior local state. A pull
//! that lands while a change is pending may undo it locally, so confirmation
//! applies the change again.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use vigil_protocols::{Alert, BackendError};

use crate::delta::{Delta, DeltaSource};
use crate::notification::Notification;
use crate::reconciler::Reconciler;

/// A user command on an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Acknowledge,
    Dismiss,
}

impl std::fmt::Display for AlertAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertAction::Acknowledge => write!(f, "acknowledge"),
            AlertAction::Dismiss => write!(f, "dismiss"),
        }
    }
}

impl AlertAction {
    pub fn past_tense(&self) -> &'static str {
        match self {
            AlertAction::Acknowledge => "acknowledged",
            AlertAction::Dismiss => "dismissed",
        }
    }
}

/// A local change awaiting backend confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub op_id: u64,
    pub alert_id: String,
    pub action: AlertAction,
}

/// Final result of an alert command, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AlertOutcome {
    /// The backend accepted the change.
    Confirmed,
    /// Nothing to do: alert absent, already acknowledged, or the same
    /// command is already pending.
    NoOp,
    /// The backend rejected the change and it was undone locally.
    RolledBack { reason: String },
}

/// Result of settling a pending mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    Confirmed(PendingMutation),
    RolledBack {
        mutation: PendingMutation,
        notification: Notification,
    },
    /// No pending mutation with that id.
    Unknown,
}

impl Settled {
    pub fn outcome(&self) -> AlertOutcome {
        match self {
            Settled::Confirmed(_) => AlertOutcome::Confirmed,
            Settled::Unknown => AlertOutcome::NoOp,
            Settled::RolledBack { notification, .. } => AlertOutcome::RolledBack {
                reason: notification.message.clone(),
            },
        }
    }
}

#[derive(Debug)]
struct PendingOp {
    mutation: PendingMutation,
    /// The alert as it was before the optimistic change.
    prior: Alert,
    /// Who acknowledged and when, for acknowledge changes.
    acknowledged: Option<(String, DateTime<Utc>)>,
}

/// Alert state machine. Holds no alerts itself; every change goes through
/// the reconciler.
#[derive(Debug, Default)]
pub struct AlertLifecycle {
    next_op: u64,
    pending: HashMap<u64, PendingOp>,
}

impl AlertLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `alert_id` acknowledged locally. Returns `None` when there is
    /// nothing to do.
    pub fn begin_acknowledge(
        &mut self,
        reconciler: &mut Reconciler,
        alert_id: &str,
        user: &str,
    ) -> Option<PendingMutation> {
        let prior = match reconciler.alert(alert_id) {
            Some(alert) => alert.clone(),
            None => {
                debug!(alert_id, "Acknowledge of unknown alert ignored");
                return None;
            }
        };
        if prior.acknowledged || self.is_pending(alert_id, AlertAction::Acknowledge) {
            debug!(alert_id, "Alert already acknowledged");
            return None;
        }

        let acknowledged = (user.to_string(), Utc::now());
        mark_acknowledged(reconciler, &prior, &acknowledged);

        Some(self.track(alert_id, AlertAction::Acknowledge, prior, Some(acknowledged)))
    }

    /// Remove `alert_id` locally. Returns `None` when it is already gone.
    pub fn begin_dismiss(
        &mut self,
        reconciler: &mut Reconciler,
        alert_id: &str,
    ) -> Option<PendingMutation> {
        let Some(prior) = reconciler.remove_alert(alert_id) else {
            debug!(alert_id, "Dismiss of absent alert ignored");
            return None;
        };
        Some(self.track(alert_id, AlertAction::Dismiss, prior, None))
    }

    fn track(
        &mut self,
        alert_id: &str,
        action: AlertAction,
        prior: Alert,
        acknowledged: Option<(String, DateTime<Utc>)>,
    ) -> PendingMutation {
        self.next_op += 1;
        let mutation = PendingMutation {
            op_id: self.next_op,
            alert_id: alert_id.to_string(),
            action,
        };
        debug!(alert_id, op_id = mutation.op_id, %action, "Optimistic alert change applied");
        self.pending.insert(
            mutation.op_id,
            PendingOp {
                mutation: mutation.clone(),
                prior,
                acknowledged,
            },
        );
        mutation
    }

    /// Apply the backend's answer to a pending mutation.
    pub fn settle(
        &mut self,
        reconciler: &mut Reconciler,
        op_id: u64,
        result: Result<(), BackendError>,
    ) -> Settled {
        let Some(op) = self.pending.remove(&op_id) else {
            return Settled::Unknown;
        };
        let PendingOp {
            mutation,
            prior,
            acknowledged,
        } = op;

        let err = match result {
            Ok(()) => {
                info!(alert_id = %mutation.alert_id, action = %mutation.action, "Alert change confirmed");
                Self::reapply(reconciler, &mutation, acknowledged.as_ref());
                return Settled::Confirmed(mutation);
            }
            Err(e) => e,
        };

        error!(
            alert_id = %mutation.alert_id,
            action = %mutation.action,
            "Alert change rejected, rolling back: {}",
            err
        );

        match mutation.action {
            AlertAction::Acknowledge => {
                // only undo the flag; a concurrent dismiss stays in effect
                if let Some(current) = reconciler.alert(&mutation.alert_id) {
                    if current.acknowledged {
                        let mut restored = current.clone();
                        restored.acknowledged = prior.acknowledged;
                        restored.acknowledged_by = prior.acknowledged_by.clone();
                        restored.acknowledged_at = prior.acknowledged_at;
                        reconciler.apply_delta(
                            DeltaSource::Local,
                            Delta::Alerts {
                                alerts: vec![restored],
                                complete: false,
                            },
                        );
                    }
                }
            }
            AlertAction::Dismiss => {
                if reconciler.alert(&mutation.alert_id).is_none() {
                    reconciler.apply_delta(
                        DeltaSource::Local,
                        Delta::Alerts {
                            alerts: vec![prior],
                            complete: false,
                        },
                    );
                }
            }
        }

        let notification = Notification::error(format!(
            "Failed to {} alert {}: {}",
            mutation.action, mutation.alert_id, err
        ));
        Settled::RolledBack {
            mutation,
            notification,
        }
    }

    /// Apply a confirmed change again in case a pull undid it meanwhile.
    fn reapply(
        reconciler: &mut Reconciler,
        mutation: &PendingMutation,
        acknowledged: Option<&(String, DateTime<Utc>)>,
    ) {
        match mutation.action {
            AlertAction::Acknowledge => {
                let Some(acknowledged) = acknowledged else {
                    return;
                };
                let current = match reconciler.alert(&mutation.alert_id) {
                    Some(current) if !current.acknowledged => current.clone(),
                    _ => return,
                };
                debug!(alert_id = %mutation.alert_id, "Pull cleared a confirmed acknowledge, applying again");
                mark_acknowledged(reconciler, &current, acknowledged);
            }
            AlertAction::Dismiss => {
                if reconciler.remove_alert(&mutation.alert_id).is_some() {
                    debug!(alert_id = %mutation.alert_id, "Pull restored a confirmed dismiss, removing again");
                }
            }
        }
    }

    fn is_pending(&self, alert_id: &str, action: AlertAction) -> bool {
        self.pending
            .values()
            .any(|op| op.mutation.alert_id == alert_id && op.mutation.action == action)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn mark_acknowledged(
    reconciler: &mut Reconciler,
    alert: &Alert,
    (user, at): &(String, DateTime<Utc>),
) {
    let mut updated = alert.clone();
    updated.acknowledged = true;
    updated.acknowledged_by = Some(user.clone());
    updated.acknowledged_at = Some(*at);
    reconciler.apply_delta(
        DeltaSource::Local,
        Delta::Alerts {
            alerts: vec![updated],
            complete: false,
        },
    );
}
