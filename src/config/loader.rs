//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::WatcherConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
///
/// Configuration errors are fatal at startup and never recoverable mid-run;
/// a failed reload keeps the previous configuration instead.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid environment override {var}: {value}")]
    EnvOverride { var: String, value: String },
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Environment overrides are applied after parsing, before validation,
/// so a bad override is rejected the same way a bad file is.
pub fn load_config(path: &Path) -> Result<WatcherConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: WatcherConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the environment variables the deployment traditionally sets.
fn apply_env_overrides(config: &mut WatcherConfig) -> Result<(), ConfigError> {
    if let Ok(url) = std::env::var("SLACK_WEBHOOK_URL") {
        if !url.is_empty() {
            config.alerts.webhook_url = Some(url);
        }
    }
    if let Ok(v) = std::env::var("ERROR_RATIO_THRESHOLD") {
        config.window.error_ratio_threshold = parse_env("ERROR_RATIO_THRESHOLD", &v)?;
    }
    if let Ok(v) = std::env::var("WINDOW_SIZE") {
        config.window.size = parse_env("WINDOW_SIZE", &v)?;
    }
    if let Ok(v) = std::env::var("ALERT_COOLDOWN_SEC") {
        config.alerts.cooldown_secs = parse_env("ALERT_COOLDOWN_SEC", &v)?;
    }
    if let Ok(v) = std::env::var("MAINTENANCE_MODE") {
        config.alerts.maintenance_mode = v.eq_ignore_ascii_case("true") || v == "1";
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::EnvOverride {
        var: var.to_string(),
        value: value.to_string(),
    })
}
