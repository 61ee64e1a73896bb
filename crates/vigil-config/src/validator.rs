//! Configuration validation.

use url::Url;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert into an error when any validation error was found.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.errors.is_empty() {
            return Ok(self.warnings);
        }
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Invalid(joined))
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_backend(config, &mut result);
        Self::validate_transport(config, &mut result);
        Self::validate_polling(config, &mut result);
        Self::validate_buffers(config, &mut result);
        Self::validate_view(config, &mut result);

        result
    }

    fn validate_backend(config: &Config, result: &mut ValidationResult) {
        let backend = &config.backend;

        match Url::parse(&backend.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => result.add_error(ValidationError::new(
                "backend.base_url",
                format!("Unsupported scheme '{}', expected http or https", url.scheme()),
            )),
            Err(e) => result.add_error(ValidationError::new(
                "backend.base_url",
                format!("Invalid URL: {}", e),
            )),
        }

        if let Some(ref ws_url) = backend.ws_url {
            match Url::parse(ws_url) {
                Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
                Ok(url) => result.add_error(ValidationError::new(
                    "backend.ws_url",
                    format!("Unsupported scheme '{}', expected ws or wss", url.scheme()),
                )),
                Err(e) => result.add_error(ValidationError::new(
                    "backend.ws_url",
                    format!("Invalid URL: {}", e),
                )),
            }
        }

        if backend.request_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "backend.request_timeout_ms",
                "request_timeout_ms must be greater than 0",
            ));
        }

        if backend.user.trim().is_empty() {
            result.add_warning(ValidationWarning::new(
                "backend.user",
                "Alert mutations will be sent without a user name",
            ));
        }
    }

    fn validate_transport(config: &Config, result: &mut ValidationResult) {
        let transport = &config.transport;
        let reconnect = &transport.reconnect;

        if transport.connect_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "transport.connect_timeout_ms",
                "connect_timeout_ms must be greater than 0",
            ));
        }

        if reconnect.base_delay_ms == 0 {
            result.add_error(ValidationError::new(
                "transport.reconnect.base_delay_ms",
                "base_delay_ms must be greater than 0",
            ));
        }

        if !reconnect.multiplier.is_finite() || reconnect.multiplier < 1.0 {
            result.add_error(ValidationError::new(
                "transport.reconnect.multiplier",
                "multiplier must be a finite number >= 1.0",
            ));
        }

        if reconnect.max_delay_ms < reconnect.base_delay_ms {
            result.add_warning(ValidationWarning::new(
                "transport.reconnect.max_delay_ms",
                "max_delay_ms is below base_delay_ms; base_delay_ms will be used",
            ));
        }

        if !transport.enabled {
            result.add_warning(ValidationWarning::new(
                "transport.enabled",
                "Push channel disabled, data arrives by polling only",
            ));
        }
    }

    fn validate_polling(config: &Config, result: &mut ValidationResult) {
        let polling = &config.polling;
        let intervals = [
            ("polling.logs_interval_ms", polling.logs_interval_ms),
            ("polling.workflows_interval_ms", polling.workflows_interval_ms),
            ("polling.performance_interval_ms", polling.performance_interval_ms),
            ("polling.alerts_interval_ms", polling.alerts_interval_ms),
            ("polling.reset_status_interval_ms", polling.reset_status_interval_ms),
        ];

        for (path, interval) in intervals {
            if interval == 0 {
                result.add_error(ValidationError::new(path, "Interval must be greater than 0"));
            } else if interval < 500 {
                result.add_warning(ValidationWarning::new(
                    path,
                    "Interval below 500ms may overload the backend",
                ));
            }
        }

        if polling.fetch_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "polling.fetch_timeout_ms",
                "fetch_timeout_ms must be greater than 0",
            ));
        }

        if polling.failure_notify_threshold == 0 {
            result.add_error(ValidationError::new(
                "polling.failure_notify_threshold",
                "failure_notify_threshold must be greater than 0",
            ));
        }

        if polling.log_limit == 0 {
            result.add_error(ValidationError::new(
                "polling.log_limit",
                "log_limit must be greater than 0",
            ));
        }

        if polling.performance_hours == 0 {
            result.add_error(ValidationError::new(
                "polling.performance_hours",
                "performance_hours must be greater than 0",
            ));
        }
    }

    fn validate_buffers(config: &Config, result: &mut ValidationResult) {
        let buffers = &config.buffers;
        let capacities = [
            ("buffers.logs", buffers.logs),
            ("buffers.active_workflows", buffers.active_workflows),
            ("buffers.workflow_history", buffers.workflow_history),
            ("buffers.performance", buffers.performance),
            ("buffers.alerts", buffers.alerts),
            ("buffers.live_stats", buffers.live_stats),
        ];

        for (path, capacity) in capacities {
            if capacity == 0 {
                result.add_error(ValidationError::new(path, "Capacity must be at least 1"));
            }
        }

        if config.polling.log_limit > buffers.logs {
            result.add_warning(ValidationWarning::new(
                "polling.log_limit",
                "log_limit exceeds buffers.logs, older fetched lines will be evicted at once",
            ));
        }
    }

    fn validate_view(config: &Config, result: &mut ValidationResult) {
        if config.view.max_logs > config.buffers.logs {
            result.add_warning(ValidationWarning::new(
                "view.max_logs",
                "max_logs exceeds buffers.logs and has no effect beyond it",
            ));
        }

        if config.view.max_alerts > config.buffers.alerts {
            result.add_warning(ValidationWarning::new(
                "view.max_alerts",
                "max_alerts exceeds buffers.alerts and has no effect beyond it",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
