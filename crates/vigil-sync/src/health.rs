//! Per-feed fetch health.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::delta::StreamId;
use crate::notification::Notification;

/// Health of one pull feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedHealth {
    /// Failures since the last success.
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// The last fetch failed; the buffered data is the last known good.
    pub stale: bool,
}

impl FeedHealth {
    /// Whether the feed has reported at least once.
    pub fn has_reported(&self) -> bool {
        self.last_success.is_some() || self.consecutive_failures > 0
    }
}

/// Tracks fetch outcomes and decides when a failure streak is worth
/// telling the operator about.
#[derive(Debug, Clone)]
pub struct FeedHealthTracker {
    feeds: BTreeMap<StreamId, FeedHealth>,
    notify_threshold: u32,
}

impl FeedHealthTracker {
    pub fn new(notify_threshold: u32) -> Self {
        Self {
            feeds: BTreeMap::new(),
            notify_threshold: notify_threshold.max(1),
        }
    }

    /// Record a successful fetch. Returns whether the feed recovered or
    /// reported for the first time; a refreshed timestamp alone is not a change.
    pub fn record_success(&mut self, stream: StreamId, at: DateTime<Utc>) -> bool {
        let health = self.feeds.entry(stream).or_default();
        let changed = health.stale || health.last_success.is_none();
        health.consecutive_failures = 0;
        health.last_error = None;
        health.stale = false;
        health.last_success = Some(at);
        changed
    }

    /// Record a failed fetch. Returns a notification exactly when the
    /// streak reaches the threshold.
    pub fn record_failure(&mut self, stream: StreamId, error: &str) -> Option<Notification> {
        let health = self.feeds.entry(stream).or_default();
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        health.last_error = Some(error.to_string());
        health.stale = true;

        if health.consecutive_failures == self.notify_threshold {
            Some(Notification::warning(format!(
                "Feed '{}' failed {} times in a row: {}",
                stream, health.consecutive_failures, error
            )))
        } else {
            None
        }
    }

    pub fn get(&self, stream: StreamId) -> Option<&FeedHealth> {
        self.feeds.get(&stream)
    }

    pub fn snapshot(&self) -> BTreeMap<StreamId, FeedHealth> {
        self.feeds.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifies_once_at_threshold() {
        let mut tracker = FeedHealthTracker::new(3);
        assert!(tracker.record_failure(StreamId::Logs, "timeout").is_none());
        assert!(tracker.record_failure(StreamId::Logs, "timeout").is_none());
        let note = tracker.record_failure(StreamId::Logs, "timeout").unwrap();
        assert!(note.message.contains("logs"));
        assert!(note.message.contains("3 times"));
        assert!(tracker.record_failure(StreamId::Logs, "timeout").is_none());
    }

    #[test]
    fn test_success_resets_streak() {
        let mut tracker = FeedHealthTracker::new(2);
        tracker.record_failure(StreamId::Alerts, "HTTP 500");
        assert!(tracker.get(StreamId::Alerts).unwrap().stale);

        assert!(tracker.record_success(StreamId::Alerts, Utc::now()));
        assert!(!tracker.record_success(StreamId::Alerts, Utc::now()));
        let health = tracker.get(StreamId::Alerts).unwrap();
        assert_eq!(health.consecutive_failures, 0);
        assert!(!health.stale);
        assert!(health.last_error.is_none());

        assert!(tracker.record_failure(StreamId::Alerts, "HTTP 500").is_none());
        assert!(tracker.record_failure(StreamId::Alerts, "HTTP 500").is_some());
    }

    #[test]
    fn test_feeds_are_independent() {
        let mut tracker = FeedHealthTracker::new(1);
        assert!(tracker.record_failure(StreamId::Logs, "x").is_some());
        assert!(tracker.record_failure(StreamId::Performance, "y").is_some());
        assert!(tracker.get(StreamId::Alerts).is_none());
        assert_eq!(tracker.snapshot().len(), 2);
    }

    #[test]
    fn test_has_reported() {
        let mut tracker = FeedHealthTracker::new(3);
        tracker.record_failure(StreamId::Logs, "x");
        assert!(tracker.get(StreamId::Logs).unwrap().has_reported());
        assert!(!FeedHealth::default().has_reported());
    }
}
