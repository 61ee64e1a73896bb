//! Periodic pull scheduling.
//!
//! Each stream has at most one fetch in flight. A tick or trigger that fires
//! while a fetch is outstanding is skipped, never queued. Fetch results, good
//! or bad, go to the update loop's event queue; a failed fetch never stops
//! the schedule.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use vigil_protocols::BackendError;

use crate::backoff::jitter_up_to;
use crate::delta::{Delta, StreamId};
use crate::event::SyncEvent;

/// Fetches one pull stream.
#[async_trait]
pub trait PullFeed: Send + Sync {
    async fn fetch(&self) -> Result<Delta, BackendError>;
}

#[async_trait]
impl<F, Fut> PullFeed for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Delta, BackendError>> + Send + 'static,
{
    async fn fetch(&self) -> Result<Delta, BackendError> {
        (self)().await
    }
}

struct FeedSlot {
    fetcher: Arc<dyn PullFeed>,
    generation: u64,
    /// Outlives schedule/cancel so the one-in-flight rule holds across them.
    in_flight: Arc<AtomicBool>,
    ticker: Option<CancellationToken>,
}

struct SchedulerInner {
    events: mpsc::Sender<SyncEvent>,
    fetch_timeout: Duration,
    startup_jitter: Duration,
    slots: Mutex<HashMap<StreamId, FeedSlot>>,
    next_generation: AtomicU64,
    fetches_started: AtomicU64,
    ticks_skipped: AtomicU64,
    closed: AtomicBool,
}

/// Issues periodic fetches per stream.
#[derive(Clone)]
pub struct PollScheduler {
    inner: Arc<SchedulerInner>,
}

impl PollScheduler {
    pub fn new(
        events: mpsc::Sender<SyncEvent>,
        fetch_timeout: Duration,
        startup_jitter: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                events,
                fetch_timeout,
                startup_jitter,
                slots: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                fetches_started: AtomicU64::new(0),
                ticks_skipped: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Fetch `stream` every `interval` using `fetcher`, starting after a
    /// random delay below the startup jitter. Replaces any existing schedule
    /// for the stream. Returns the generation tagged on its results.
    pub fn schedule(
        &self,
        stream: StreamId,
        interval: Duration,
        fetcher: Arc<dyn PullFeed>,
    ) -> u64 {
        let token = CancellationToken::new();
        let generation = {
            let mut slots = self.inner.slots.lock();
            let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
            let slot = slots.entry(stream).or_insert_with(|| FeedSlot {
                fetcher: fetcher.clone(),
                generation,
                in_flight: Arc::new(AtomicBool::new(false)),
                ticker: None,
            });
            if let Some(old) = slot.ticker.replace(token.clone()) {
                old.cancel();
            }
            slot.fetcher = fetcher;
            slot.generation = generation;
            generation
        };

        let interval = interval.max(Duration::from_millis(1));
        let initial_delay = jitter_up_to(self.inner.startup_jitter);
        debug!(
            stream = %stream,
            ?interval,
            ?initial_delay,
            generation,
            "Scheduling pull feed"
        );

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(initial_delay) => {}
            }

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        SchedulerInner::dispatch(&inner, stream);
                    }
                }
            }
            debug!(stream = %stream, "Pull feed ticker stopped");
        });

        generation
    }

    /// Swap the fetcher of a stream without touching its timer. Returns the
    /// new generation; results of older generations can be told apart.
    pub fn replace_fetcher(&self, stream: StreamId, fetcher: Arc<dyn PullFeed>) -> u64 {
        let mut slots = self.inner.slots.lock();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        slots
            .entry(stream)
            .and_modify(|slot| {
                slot.fetcher = fetcher.clone();
                slot.generation = generation;
            })
            .or_insert_with(|| FeedSlot {
                fetcher,
                generation,
                in_flight: Arc::new(AtomicBool::new(false)),
                ticker: None,
            });
        generation
    }

    /// Stop future ticks of `stream`. An in-flight fetch still completes and
    /// is delivered. The fetcher stays registered for manual triggers.
    pub fn cancel(&self, stream: StreamId) -> bool {
        let mut slots = self.inner.slots.lock();
        match slots.get_mut(&stream).and_then(|slot| slot.ticker.take()) {
            Some(token) => {
                token.cancel();
                debug!(stream = %stream, "Cancelled pull feed");
                true
            }
            None => false,
        }
    }

    /// Cancel every ticking stream.
    pub fn cancel_all(&self) {
        let mut slots = self.inner.slots.lock();
        for slot in slots.values_mut() {
            if let Some(token) = slot.ticker.take() {
                token.cancel();
            }
        }
    }

    /// Cancel everything and refuse further fetches. In-flight fetches still
    /// deliver their results.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.cancel_all();
    }

    /// Fetch `stream` now, unless a fetch is already in flight.
    /// Returns whether a fetch was started.
    pub fn trigger(&self, stream: StreamId) -> bool {
        SchedulerInner::dispatch(&self.inner, stream)
    }

    /// Trigger `stream` after a random delay below the startup jitter.
    pub fn trigger_jittered(&self, stream: StreamId) {
        let delay = jitter_up_to(self.inner.startup_jitter);
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            SchedulerInner::dispatch(&inner, stream);
        });
    }

    /// Registered streams, ticking or not.
    pub fn streams(&self) -> Vec<StreamId> {
        let mut streams: Vec<_> = self.inner.slots.lock().keys().copied().collect();
        streams.sort();
        streams
    }

    pub fn is_scheduled(&self, stream: StreamId) -> bool {
        self.inner
            .slots
            .lock()
            .get(&stream)
            .is_some_and(|slot| slot.ticker.is_some())
    }

    pub fn is_in_flight(&self, stream: StreamId) -> bool {
        self.inner
            .slots
            .lock()
            .get(&stream)
            .is_some_and(|slot| slot.in_flight.load(Ordering::Acquire))
    }

    /// Fetches currently outstanding across all streams.
    pub fn in_flight_count(&self) -> usize {
        self.inner
            .slots
            .lock()
            .values()
            .filter(|slot| slot.in_flight.load(Ordering::Acquire))
            .count()
    }

    pub fn generation(&self, stream: StreamId) -> Option<u64> {
        self.inner.slots.lock().get(&stream).map(|slot| slot.generation)
    }

    pub fn fetches_started(&self) -> u64 {
        self.inner.fetches_started.load(Ordering::Relaxed)
    }

    pub fn ticks_skipped(&self) -> u64 {
        self.inner.ticks_skipped.load(Ordering::Relaxed)
    }
}

impl SchedulerInner {
    fn dispatch(inner: &Arc<SchedulerInner>, stream: StreamId) -> bool {
        if inner.closed.load(Ordering::Acquire) {
            return false;
        }

        let (fetcher, generation, in_flight) = {
            let slots = inner.slots.lock();
            let Some(slot) = slots.get(&stream) else {
                return false;
            };
            if slot.in_flight.swap(true, Ordering::AcqRel) {
                inner.ticks_skipped.fetch_add(1, Ordering::Relaxed);
                debug!(stream = %stream, "Fetch still in flight, skipping tick");
                return false;
            }
            (slot.fetcher.clone(), slot.generation, slot.in_flight.clone())
        };

        inner.fetches_started.fetch_add(1, Ordering::Relaxed);
        let events = inner.events.clone();
        let fetch_timeout = inner.fetch_timeout;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(fetch_timeout, fetcher.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(fetch_timeout.as_millis() as u64)),
            };
            if let Err(ref e) = result {
                warn!(stream = %stream, "Fetch failed: {}", e);
            }

            let event = SyncEvent::Fetched {
                stream,
                generation,
                result,
            };
            if events.send(event).await.is_err() {
                debug!(stream = %stream, "Event queue closed, dropping fetch result");
            }
            in_flight.store(false, Ordering::Release);
        });

        true
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
