use super::*;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.buffers.logs, 1000);
    assert_eq!(config.buffers.workflow_history, 100);
    assert_eq!(config.buffers.performance, 200);
    assert_eq!(config.buffers.alerts, 50);
    assert_eq!(config.transport.reconnect.base_delay_ms, 5000);
    assert_eq!(config.transport.reconnect.multiplier, 1.0);
    assert_eq!(config.polling.logs_interval_ms, 5000);
    assert!(config.transport.enabled);
}

#[test]
fn test_api_root_joins_cleanly() {
    let backend = BackendConfig {
        base_url: "http://localhost:8000/".to_string(),
        api_prefix: "/api/logging/".to_string(),
        ..Default::default()
    };
    assert_eq!(backend.api_root(), "http://localhost:8000/api/logging");
}

#[test]
fn test_push_url_derived_from_base() {
    let backend = BackendConfig {
        base_url: "https://ops.example.com".to_string(),
        ..Default::default()
    };
    assert_eq!(backend.push_url(), "wss://ops.example.com/api/logging/ws");

    let backend = BackendConfig::default();
    assert_eq!(backend.push_url(), "ws://127.0.0.1:8000/api/logging/ws");
}

#[test]
fn test_push_url_override() {
    let backend = BackendConfig {
        ws_url: Some("ws://other:9000/live".to_string()),
        ..Default::default()
    };
    assert_eq!(backend.push_url(), "ws://other:9000/live");
}

#[test]
fn test_duration_accessors() {
    let config = Config::default();
    assert_eq!(config.backend.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.transport.connect_timeout(), Duration::from_secs(10));
    assert_eq!(config.polling.fetch_timeout(), Duration::from_secs(10));
    assert_eq!(config.polling.startup_jitter(), Duration::from_millis(500));
}

#[test]
fn test_partial_section_keeps_defaults() {
    let config: Config = toml::from_str(
        r#"
        [buffers]
        logs = 10
        "#,
    )
    .unwrap();
    assert_eq!(config.buffers.logs, 10);
    assert_eq!(config.buffers.alerts, 50);
    assert_eq!(config.view.max_history, 20);
}
