//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check pool identities are distinct and addressable
//! - Validate value ranges (thresholds, windows, timeouts)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: WatcherConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use url::Url;

use crate::config::schema::{PoolConfig, WatcherConfig};

/// A single semantic validation failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

fn err(field: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        message: message.into(),
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &WatcherConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_pool("pools.primary", &config.pools.primary, &mut errors);
    check_pool("pools.backup", &config.pools.backup, &mut errors);

    if config.pools.primary.name == config.pools.backup.name {
        errors.push(err("pools", "primary and backup must have distinct names"));
    }

    if config.window.size == 0 {
        errors.push(err("window.size", "must be at least 1"));
    }
    if !(config.window.error_ratio_threshold > 0.0 && config.window.error_ratio_threshold < 1.0) {
        errors.push(err(
            "window.error_ratio_threshold",
            format!(
                "must be in (0, 1), got {}",
                config.window.error_ratio_threshold
            ),
        ));
    }
    if config.window.min_samples > config.window.size {
        errors.push(err(
            "window.min_samples",
            "cannot exceed the window size",
        ));
    }

    if config.health.max_fails == 0 {
        errors.push(err("health.max_fails", "must be at least 1"));
    }
    if config.health.interval_ms == 0 {
        errors.push(err("health.interval_ms", "must be positive"));
    }
    if config.health.timeout_ms == 0 {
        errors.push(err("health.timeout_ms", "must be positive"));
    }
    // With max_fails > 1, failures must be able to accumulate within the
    // fail timeout at the configured check interval.
    if config.health.max_fails > 1 && config.health.interval_ms > config.health.fail_timeout_ms {
        errors.push(err(
            "health.fail_timeout_ms",
            "shorter than the check interval; consecutive failures can never accumulate",
        ));
    }

    if config.failover.cooldown_secs == 0 {
        errors.push(err("failover.cooldown_secs", "must be positive"));
    }

    if config.control.enabled && Url::parse(&config.control.endpoint).is_err() {
        errors.push(err(
            "control.endpoint",
            format!("not a valid URL: {}", config.control.endpoint),
        ));
    }

    if let Some(url) = &config.alerts.webhook_url {
        if Url::parse(url).is_err() {
            errors.push(err("alerts.webhook_url", format!("not a valid URL: {url}")));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_pool(field: &'static str, pool: &PoolConfig, errors: &mut Vec<ValidationError>) {
    if pool.name.is_empty() {
        errors.push(err(field, "pool name must not be empty"));
    }
    if Url::parse(&format!("http://{}", pool.address)).is_err() {
        errors.push(err(field, format!("invalid address: {}", pool.address)));
    }
}
