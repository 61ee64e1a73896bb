//! The sync client: one owned instance with an explicit start/stop lifecycle.
//!
//! All state lives in a single update loop task. Push messages, fetch
//! results, mutation answers and user commands are queued to it and handled
//! strictly one at a time, so the reconciler has exactly one writer. The
//! presentation layer only sees the published [`RenderModel`], connection
//! state and notifications.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vigil_config::Config;
use vigil_protocols::{BackendError, LogQuery, PushConnector, PushMessage, TelemetryBackend};

use crate::alerts::{AlertAction, AlertLifecycle, AlertOutcome, Settled};
use crate::backoff::ReconnectPolicy;
use crate::delta::{Delta, DeltaSource, StreamId};
use crate::error::SyncError;
use crate::event::SyncEvent;
use crate::feeds::{BackendFeed, FeedRequest, interval_for};
use crate::health::FeedHealthTracker;
use crate::notification::Notification;
use crate::poll::{PollScheduler, PullFeed};
use crate::projector::{RenderModel, ViewProjector};
use crate::reconciler::Reconciler;
use crate::transport::{ConnectionState, TransportChannel};

const EVENT_QUEUE_SIZE: usize = 1024;
const COMMAND_QUEUE_SIZE: usize = 64;
const NOTIFICATION_CAPACITY: usize = 64;
const DRAIN_POLL: Duration = Duration::from_millis(20);

enum Command {
    Alert {
        action: AlertAction,
        alert_id: String,
        reply: oneshot::Sender<AlertOutcome>,
    },
    RefreshAll,
    CleanupLogs {
        reply: oneshot::Sender<Result<(), BackendError>>,
    },
    SetLogFilter {
        module: Option<String>,
        level: Option<String>,
    },
    SetAutoRefresh(bool),
    Stop {
        reply: oneshot::Sender<()>,
    },
}

struct Running {
    commands: mpsc::Sender<Command>,
    handle: JoinHandle<()>,
}

/// Live telemetry client.
///
/// ```ignore
/// let client = SyncClient::new(&config, backend, Some(connector));
/// client.start()?;
/// let mut models = client.subscribe();
/// while models.changed().await.is_ok() {
///     render(&models.borrow());
/// }
/// client.stop().await?;
/// ```
pub struct SyncClient {
    config: Config,
    backend: Arc<dyn TelemetryBackend>,
    connector: Option<Arc<dyn PushConnector>>,
    model_tx: watch::Sender<Arc<RenderModel>>,
    connection_tx: watch::Sender<ConnectionState>,
    notify_tx: broadcast::Sender<Notification>,
    running: Mutex<Option<Running>>,
}

impl SyncClient {
    /// Create a stopped client. Without a connector (or with the transport
    /// disabled) the client runs on pull feeds alone.
    pub fn new(
        config: &Config,
        backend: Arc<dyn TelemetryBackend>,
        connector: Option<Arc<dyn PushConnector>>,
    ) -> Self {
        let projector = ViewProjector::new(config.view.clone());
        let empty = Reconciler::new(&config.buffers);
        let initial = projector.project(
            empty.buffers(),
            ConnectionState::Disconnected,
            &Default::default(),
        );
        let (model_tx, _) = watch::channel(Arc::new(initial));
        let (connection_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            config: config.clone(),
            backend,
            connector,
            model_tx,
            connection_tx,
            notify_tx,
            running: Mutex::new(None),
        }
    }

    /// Schedule every pull feed, open the push channel and start the
    /// update loop.
    pub fn start(&self) -> Result<(), SyncError> {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return Err(SyncError::AlreadyRunning);
        }

        let polling = &self.config.polling;
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);

        let scheduler = PollScheduler::new(
            events_tx.clone(),
            polling.fetch_timeout(),
            polling.startup_jitter(),
        );
        let log_query = LogQuery::new(polling.log_limit);

        let transport = match self.connector {
            Some(ref connector) if self.config.transport.enabled => {
                let channel = TransportChannel::new(
                    connector.clone(),
                    ReconnectPolicy::from(&self.config.transport.reconnect),
                    self.config.transport.connect_timeout(),
                );
                channel.start(events_tx.clone())?;
                Some(channel)
            }
            _ => {
                info!("Push channel disabled, running on pull feeds only");
                None
            }
        };

        let mut update_loop = UpdateLoop {
            backend: self.backend.clone(),
            user: self.config.backend.user.clone(),
            polling: polling.clone(),
            reconciler: Reconciler::new(&self.config.buffers),
            lifecycle: AlertLifecycle::new(),
            health: FeedHealthTracker::new(polling.failure_notify_threshold),
            projector: ViewProjector::new(self.config.view.clone()),
            scheduler,
            transport,
            events_tx,
            events: events_rx,
            commands: commands_rx,
            model_tx: self.model_tx.clone(),
            connection_tx: self.connection_tx.clone(),
            notify_tx: self.notify_tx.clone(),
            connection: ConnectionState::Disconnected,
            ever_connected: false,
            log_query,
            log_generation: 0,
            auto_refresh: true,
            alert_replies: HashMap::new(),
            cleanups: HashMap::new(),
            next_cleanup: 0,
            dirty: true,
        };
        update_loop.schedule_all();

        info!(
            feeds = StreamId::PULL_FEEDS.len(),
            push = update_loop.transport.is_some(),
            "Sync client started"
        );
        let handle = tokio::spawn(update_loop.run());
        *running = Some(Running {
            commands: commands_tx,
            handle,
        });
        Ok(())
    }

    /// Stop ticking, close the push channel intentionally and apply
    /// whatever is still in flight, bounded by the fetch timeout.
    pub async fn stop(&self) -> Result<(), SyncError> {
        let Some(running) = self.running.lock().take() else {
            return Err(SyncError::NotRunning);
        };

        let (reply, done) = oneshot::channel();
        if running.commands.send(Command::Stop { reply }).await.is_ok() {
            let _ = done.await;
        }
        let _ = running.handle.await;
        info!("Sync client stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Acknowledge an alert. The local view changes at once; the returned
    /// outcome reflects the backend's answer.
    pub async fn acknowledge(&self, alert_id: &str) -> Result<AlertOutcome, SyncError> {
        self.alert_command(AlertAction::Acknowledge, alert_id).await
    }

    /// Dismiss an alert. Same contract as [`acknowledge`](Self::acknowledge).
    pub async fn dismiss(&self, alert_id: &str) -> Result<AlertOutcome, SyncError> {
        self.alert_command(AlertAction::Dismiss, alert_id).await
    }

    async fn alert_command(
        &self,
        action: AlertAction,
        alert_id: &str,
    ) -> Result<AlertOutcome, SyncError> {
        let (reply, outcome) = oneshot::channel();
        self.send(Command::Alert {
            action,
            alert_id: alert_id.to_string(),
            reply,
        })
        .await?;
        outcome.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Fetch every feed now. Feeds with a fetch in flight are skipped.
    pub async fn refresh_all(&self) -> Result<(), SyncError> {
        self.send(Command::RefreshAll).await
    }

    /// Ask the backend to purge logs past retention.
    pub async fn cleanup_logs(&self) -> Result<(), SyncError> {
        let (reply, result) = oneshot::channel();
        self.send(Command::CleanupLogs { reply }).await?;
        result
            .await
            .map_err(|_| SyncError::ChannelClosed)?
            .map_err(SyncError::from)
    }

    /// Change the log query. Buffered logs are cleared and results of the
    /// previous query are discarded.
    pub async fn set_log_filter(
        &self,
        module: Option<String>,
        level: Option<String>,
    ) -> Result<(), SyncError> {
        self.send(Command::SetLogFilter { module, level }).await
    }

    /// Pause or resume periodic fetching. In-flight fetches still land.
    pub async fn set_auto_refresh(&self, enabled: bool) -> Result<(), SyncError> {
        self.send(Command::SetAutoRefresh(enabled)).await
    }

    async fn send(&self, command: Command) -> Result<(), SyncError> {
        let commands = self
            .running
            .lock()
            .as_ref()
            .map(|r| r.commands.clone())
            .ok_or(SyncError::NotRunning)?;
        commands
            .send(command)
            .await
            .map_err(|_| SyncError::ChannelClosed)
    }

    /// Latest render model.
    pub fn model(&self) -> Arc<RenderModel> {
        self.model_tx.borrow().clone()
    }

    /// Render models, published only when they change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RenderModel>> {
        self.model_tx.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection_tx.borrow()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection_tx.subscribe()
    }
}

struct UpdateLoop {
    backend: Arc<dyn TelemetryBackend>,
    user: String,
    polling: vigil_config::PollingConfig,
    reconciler: Reconciler,
    lifecycle: AlertLifecycle,
    health: FeedHealthTracker,
    projector: ViewProjector,
    scheduler: PollScheduler,
    transport: Option<TransportChannel>,
    events_tx: mpsc::Sender<SyncEvent>,
    events: mpsc::Receiver<SyncEvent>,
    commands: mpsc::Receiver<Command>,
    model_tx: watch::Sender<Arc<RenderModel>>,
    connection_tx: watch::Sender<ConnectionState>,
    notify_tx: broadcast::Sender<Notification>,
    connection: ConnectionState,
    ever_connected: bool,
    log_query: LogQuery,
    /// Logs results tagged below this generation predate the current filter.
    log_generation: u64,
    auto_refresh: bool,
    alert_replies: HashMap<u64, oneshot::Sender<AlertOutcome>>,
    cleanups: HashMap<u64, oneshot::Sender<Result<(), BackendError>>>,
    next_cleanup: u64,
    /// Connection or feed health changed since the last render.
    dirty: bool,
}

impl UpdateLoop {
    async fn run(mut self) {
        self.render();
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Stop { reply }) => {
                        self.drain().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("Client handle dropped, stopping update loop");
                        self.drain().await;
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.handle_event(event),
            }
            self.render();
        }
    }

    fn feed(&self, stream: StreamId) -> Option<Arc<dyn PullFeed>> {
        let request = match stream {
            StreamId::Logs => FeedRequest::Logs(self.log_query.clone()),
            other => FeedRequest::for_stream(other, &self.polling)?,
        };
        Some(Arc::new(BackendFeed::new(self.backend.clone(), request)))
    }

    fn schedule_all(&mut self) {
        for stream in StreamId::PULL_FEEDS {
            if let Some(feed) = self.feed(stream) {
                let generation =
                    self.scheduler
                        .schedule(stream, interval_for(stream, &self.polling), feed);
                if stream == StreamId::Logs && self.log_generation == 0 {
                    self.log_generation = generation;
                }
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Alert {
                action,
                alert_id,
                reply,
            } => self.begin_alert_change(action, &alert_id, reply),
            Command::RefreshAll => {
                debug!("Manual refresh of all feeds");
                for stream in StreamId::PULL_FEEDS {
                    self.scheduler.trigger(stream);
                }
            }
            Command::CleanupLogs { reply } => {
                self.next_cleanup += 1;
                let request_id = self.next_cleanup;
                self.cleanups.insert(request_id, reply);

                let backend = self.backend.clone();
                let events = self.events_tx.clone();
                let timeout = self.polling.fetch_timeout();
                tokio::spawn(async move {
                    let result = with_timeout(timeout, backend.cleanup_logs()).await;
                    let _ = events
                        .send(SyncEvent::CleanupFinished { request_id, result })
                        .await;
                });
            }
            Command::SetLogFilter { module, level } => {
                self.log_query = LogQuery {
                    limit: self.polling.log_limit,
                    module,
                    level,
                };
                info!(
                    module = ?self.log_query.module,
                    level = ?self.log_query.level,
                    "Log filter changed"
                );
                if let Some(feed) = self.feed(StreamId::Logs) {
                    self.log_generation = self.scheduler.replace_fetcher(StreamId::Logs, feed);
                }
                self.reconciler.clear_logs();
                if !self.scheduler.trigger(StreamId::Logs) {
                    debug!("Logs fetch in flight, filtered fetch waits for the next tick");
                }
            }
            Command::SetAutoRefresh(enabled) => {
                if enabled == self.auto_refresh {
                    return;
                }
                self.auto_refresh = enabled;
                if enabled {
                    info!("Auto refresh resumed");
                    self.schedule_all();
                } else {
                    info!("Auto refresh paused");
                    self.scheduler.cancel_all();
                }
            }
            Command::Stop { .. } => {}
        }
    }

    fn begin_alert_change(
        &mut self,
        action: AlertAction,
        alert_id: &str,
        reply: oneshot::Sender<AlertOutcome>,
    ) {
        let pending = match action {
            AlertAction::Acknowledge => {
                self.lifecycle
                    .begin_acknowledge(&mut self.reconciler, alert_id, &self.user)
            }
            AlertAction::Dismiss => self.lifecycle.begin_dismiss(&mut self.reconciler, alert_id),
        };
        let Some(mutation) = pending else {
            let _ = reply.send(AlertOutcome::NoOp);
            return;
        };
        self.alert_replies.insert(mutation.op_id, reply);

        let backend = self.backend.clone();
        let events = self.events_tx.clone();
        let user = self.user.clone();
        let timeout = self.polling.fetch_timeout();
        tokio::spawn(async move {
            let call = async {
                match mutation.action {
                    AlertAction::Acknowledge => {
                        backend.acknowledge_alert(&mutation.alert_id, &user).await
                    }
                    AlertAction::Dismiss => backend.dismiss_alert(&mutation.alert_id, &user).await,
                }
            };
            let result = with_timeout(timeout, call).await;
            let _ = events
                .send(SyncEvent::MutationSettled {
                    op_id: mutation.op_id,
                    result,
                })
                .await;
        });
    }

    fn handle_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Push(message) => self.handle_push(message),
            SyncEvent::Connection(state) => self.handle_connection(state),
            SyncEvent::Fetched {
                stream,
                generation,
                result,
            } => self.handle_fetched(stream, generation, result),
            SyncEvent::MutationSettled { op_id, result } => {
                let settled = self.lifecycle.settle(&mut self.reconciler, op_id, result);
                match settled {
                    Settled::Confirmed(ref mutation) => {
                        self.notify(Notification::info(format!(
                            "Alert {} {}",
                            mutation.alert_id,
                            mutation.action.past_tense()
                        )));
                        self.scheduler.trigger(StreamId::Alerts);
                        self.scheduler.trigger(StreamId::AlertSummary);
                    }
                    Settled::RolledBack {
                        ref notification, ..
                    } => self.notify(notification.clone()),
                    Settled::Unknown => {
                        debug!(op_id, "Settlement for unknown alert change");
                    }
                }
                if let Some(reply) = self.alert_replies.remove(&op_id) {
                    let _ = reply.send(settled.outcome());
                }
            }
            SyncEvent::CleanupFinished { request_id, result } => {
                match result {
                    Ok(()) => {
                        info!("Log cleanup completed");
                        self.notify(Notification::info("Log cleanup completed"));
                        self.scheduler.trigger(StreamId::ResetStatus);
                        self.scheduler.trigger(StreamId::Logs);
                    }
                    Err(ref e) => {
                        warn!("Log cleanup failed: {}", e);
                        self.notify(Notification::error(format!("Log cleanup failed: {}", e)));
                    }
                }
                if let Some(reply) = self.cleanups.remove(&request_id) {
                    let _ = reply.send(result);
                }
            }
        }
    }

    fn handle_push(&mut self, message: PushMessage) {
        if let PushMessage::RealTimeUpdate(ref stats) = message {
            let buffers = self.reconciler.buffers();
            let workflows_differ = count_differs(
                stats.active_workflows,
                buffers.active_workflows.len(),
                buffers.active_workflows.capacity(),
            );
            let alerts_differ = count_differs(
                stats.active_alerts,
                buffers.alerts.len(),
                buffers.alerts.capacity(),
            );
            if workflows_differ {
                debug!(
                    pushed = stats.active_workflows,
                    local = self.reconciler.active_workflow_count(),
                    "Active workflow count differs, refreshing"
                );
                self.scheduler.trigger(StreamId::ActiveWorkflows);
            }
            if alerts_differ {
                debug!(
                    pushed = stats.active_alerts,
                    local = self.reconciler.active_alert_count(),
                    "Active alert count differs, refreshing"
                );
                self.scheduler.trigger(StreamId::Alerts);
            }
        }

        if let Some(delta) = Delta::from_push(message) {
            self.reconciler.apply_delta(DeltaSource::Push, delta);
        }
    }

    fn handle_connection(&mut self, state: ConnectionState) {
        if state == self.connection {
            return;
        }
        debug!(from = %self.connection, to = %state, "Connection state changed");
        self.connection = state;
        self.connection_tx.send_replace(state);
        self.dirty = true;

        if state == ConnectionState::Connected {
            if self.ever_connected {
                info!("Push channel reconnected, refreshing all feeds");
                for stream in StreamId::PULL_FEEDS {
                    self.scheduler.trigger_jittered(stream);
                }
            }
            self.ever_connected = true;
        }
    }

    fn handle_fetched(
        &mut self,
        stream: StreamId,
        generation: u64,
        result: Result<Delta, BackendError>,
    ) {
        if stream == StreamId::Logs && generation < self.log_generation {
            debug!(generation, current = self.log_generation, "Dropping logs fetched under an old filter");
            return;
        }

        match result {
            Ok(delta) => {
                self.dirty |= self.health.record_success(stream, Utc::now());
                self.reconciler.apply_delta(DeltaSource::Pull, delta);
            }
            Err(e) => {
                self.dirty = true;
                if let Some(notification) = self.health.record_failure(stream, &e.to_string()) {
                    warn!(stream = %stream, "{}", notification.message);
                    self.notify(notification);
                }
            }
        }
    }

    fn notify(&self, notification: Notification) {
        // no subscribers is fine
        let _ = self.notify_tx.send(notification);
    }

    /// Publish a new model when something changed. A refreshed
    /// `last_success` alone waits for the next change.
    fn render(&mut self) {
        let due = self.reconciler.take_render_due();
        if !due && !std::mem::take(&mut self.dirty) {
            return;
        }
        self.dirty = false;

        let model = self
            .projector
            .project(self.reconciler.buffers(), self.connection, &self.health.snapshot());
        self.model_tx.send_if_modified(|current| {
            if **current == model {
                return false;
            }
            *current = Arc::new(model);
            true
        });
    }

    async fn drain(&mut self) {
        self.scheduler.shutdown();
        if let Some(ref transport) = self.transport {
            transport.close();
        }

        let grace = self.polling.fetch_timeout();
        let deadline = tokio::time::Instant::now() + grace;
        loop {
            while let Ok(event) = self.events.try_recv() {
                self.handle_event(event);
            }
            if self.scheduler.in_flight_count() == 0
                && self.lifecycle.pending_count() == 0
                && self.cleanups.is_empty()
            {
                break;
            }
            // fetch tasks clear their in-flight mark just after sending
            let wake = deadline.min(tokio::time::Instant::now() + DRAIN_POLL);
            match tokio::time::timeout_at(wake, self.events.recv()).await {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) => break,
                Err(_) if wake < deadline => {}
                Err(_) => {
                    warn!(
                        in_flight = self.scheduler.in_flight_count(),
                        pending = self.lifecycle.pending_count(),
                        "Stop grace period elapsed with work outstanding"
                    );
                    break;
                }
            }
        }
        // results enqueued right before their in-flight flag cleared
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }

        self.transport = None;
        self.handle_connection(ConnectionState::Disconnected);
        self.render();
    }
}

/// Whether a pushed count disagrees with a local buffer. A full buffer
/// cannot hold more, so a larger remote count is expected.
fn count_differs(remote: u64, local: usize, capacity: usize) -> bool {
    let local = local as u64;
    if local >= capacity as u64 && remote > local {
        return false;
    }
    remote != local
}

async fn with_timeout<F>(timeout: Duration, call: F) -> Result<(), BackendError>
where
    F: std::future::Future<Output = Result<(), BackendError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(timeout.as_millis() as u64)),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
