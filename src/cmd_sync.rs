//! Watch and snapshot handlers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use vigil_backend::{HttpBackend, WsConnector};
use vigil_config::Config;
use vigil_protocols::PushConnector;
use vigil_sync::{Notification, NotificationLevel, RenderModel, StreamId, SyncClient};

/// Run the client until Ctrl+C, logging every view change.
pub(crate) async fn run_watch(
    config: Config,
    module: Option<String>,
    level: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let connector: Option<Arc<dyn PushConnector>> = if config.transport.enabled {
        Some(Arc::new(WsConnector::from_config(&config.backend)?))
    } else {
        None
    };

    let client = SyncClient::new(&config, backend, connector);
    let mut models = client.subscribe();
    let mut notifications = client.notifications();
    client.start()?;

    if module.is_some() || level.is_some() {
        client.set_log_filter(module, level).await?;
    }

    info!(backend = %config.backend.api_root(), "Watching backend (Ctrl+C to stop)");

    let mut last_log_id = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping");
                break;
            }
            changed = models.changed() => {
                if changed.is_err() {
                    break;
                }
                let model = models.borrow_and_update().clone();
                last_log_id = report_model(&model, last_log_id);
            }
            received = notifications.recv() => {
                match received {
                    Ok(notification) => report_notification(&notification),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Notification receiver lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    client.stop().await?;
    Ok(())
}

/// Log a view summary and any log entries newer than `last_log_id`.
/// Returns the newest log id seen.
fn report_model(model: &RenderModel, last_log_id: Option<i64>) -> Option<i64> {
    for entry in &model.logs {
        if last_log_id.is_some_and(|last| entry.id <= last) {
            continue;
        }
        info!(
            target: "vigil::feed",
            id = entry.id,
            log_level = %entry.level,
            module = entry.module.as_deref().unwrap_or("-"),
            "{}",
            entry.message
        );
    }

    let stale: Vec<&str> = model.stale_feeds().iter().map(StreamId::name).collect();
    info!(
        connection = %model.connection,
        logs = model.logs.len(),
        active_workflows = model.workflows.active.len(),
        alerts = model.alerts.total,
        unacknowledged = model.alerts.unacknowledged,
        stale = ?stale,
        "View updated"
    );

    model.logs.iter().map(|e| e.id).max().or(last_log_id)
}

fn report_notification(notification: &Notification) {
    match notification.level {
        NotificationLevel::Info => info!(target: "vigil::notify", "{}", notification.message),
        NotificationLevel::Warning => warn!(target: "vigil::notify", "{}", notification.message),
        NotificationLevel::Error => error!(target: "vigil::notify", "{}", notification.message),
    }
}

/// Whether every pull feed has reported at least once.
fn all_feeds_reported(model: &RenderModel) -> bool {
    StreamId::PULL_FEEDS
        .iter()
        .all(|stream| model.feeds.get(stream).is_some_and(|h| h.has_reported()))
}

/// Pull every feed once and print the render model.
pub(crate) async fn run_snapshot(
    config: Config,
    wait: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let client = SyncClient::new(&config, backend, None);
    let mut models = client.subscribe();
    client.start()?;

    let wait_all = models.wait_for(|model| all_feeds_reported(model));
    let reported = matches!(tokio::time::timeout(wait, wait_all).await, Ok(Ok(_)));
    if !reported {
        warn!(wait_secs = wait.as_secs(), "Not every feed reported in time");
    }

    client.stop().await?;
    let model = client.model();
    println!("{}", serde_json::to_string_pretty(model.as_ref())?);
    Ok(())
}
