//! One-shot backend commands.
//!
//! These call the backend directly; there is no local view to reconcile.

use vigil_backend::HttpBackend;
use vigil_config::Config;
use vigil_protocols::TelemetryBackend;

/// Acknowledge an alert as `backend.user`.
pub(crate) async fn acknowledge(
    config: &Config,
    alert_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = HttpBackend::new(&config.backend)?;
    backend
        .acknowledge_alert(alert_id, &config.backend.user)
        .await?;
    println!("Alert {} acknowledged by {}", alert_id, config.backend.user);
    Ok(())
}

/// Dismiss an alert as `backend.user`.
pub(crate) async fn dismiss(
    config: &Config,
    alert_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = HttpBackend::new(&config.backend)?;
    backend.dismiss_alert(alert_id, &config.backend.user).await?;
    println!("Alert {} dismissed by {}", alert_id, config.backend.user);
    Ok(())
}

pub(crate) async fn cleanup(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = HttpBackend::new(&config.backend)?;
    backend.cleanup_logs().await?;
    let status = backend.reset_status().await?;
    println!(
        "Cleanup completed (status: {}, retention: {} days)",
        status.reset_status, status.retention_days
    );
    Ok(())
}
