//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the watcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the failover watcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WatcherConfig {
    /// The two monitored pools (primary and backup).
    pub pools: PoolsConfig,

    /// Access log tailing settings.
    pub access_log: AccessLogConfig,

    /// Sliding window / error ratio settings.
    pub window: WindowConfig,

    /// Health check settings.
    pub health: HealthCheckConfig,

    /// Failover state machine timing.
    pub failover: FailoverConfig,

    /// Proxy control surface (pool-swap commands).
    pub control: ControlConfig,

    /// Alerting settings.
    pub alerts: AlertConfig,

    /// Admin/status API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// A single monitored pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Logical pool name as it appears in access log labels (e.g. "blue").
    pub name: String,

    /// Pool address for health probes (e.g. "blue:3000" or "127.0.0.1:3001").
    pub address: String,
}

/// The fixed two-pool topology.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolsConfig {
    /// The pool that receives traffic when everything is healthy.
    pub primary: PoolConfig,

    /// The pool traffic fails over to.
    pub backup: PoolConfig,
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            primary: PoolConfig {
                name: "blue".to_string(),
                address: "127.0.0.1:3001".to_string(),
            },
            backup: PoolConfig {
                name: "green".to_string(),
                address: "127.0.0.1:3002".to_string(),
            },
        }
    }
}

/// Access log tailing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Path to the proxy's structured access log.
    pub path: String,

    /// Maximum buffered outcomes between the tailer and the evaluation
    /// tick. When full, the oldest unread outcomes are dropped.
    pub queue_capacity: usize,

    /// Seconds to wait for the log file to appear at startup.
    pub startup_wait_secs: u64,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            path: "/app/log/access.log".to_string(),
            queue_capacity: 4096,
            startup_wait_secs: 60,
        }
    }
}

/// Sliding window evaluation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Number of most-recent outcomes retained per pool.
    pub size: usize,

    /// Error ratio above which a pool is considered degraded (0..1).
    pub error_ratio_threshold: f64,

    /// Minimum samples in the window before the ratio is trusted.
    /// Prevents false alarms on a cold window.
    pub min_samples: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: 200,
            error_ratio_threshold: 0.02,
            min_samples: 50,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Evaluation tick / health check interval in milliseconds.
    pub interval_ms: u64,

    /// Health check timeout in milliseconds. Bounds the whole tick.
    pub timeout_ms: u64,

    /// Path to probe for HTTP health checks.
    pub path: String,

    /// Consecutive failed checks before a pool is marked down.
    pub max_fails: u32,

    /// Failures further apart than this do not count as consecutive.
    pub fail_timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            timeout_ms: 1_500,
            path: "/healthz".to_string(),
            max_fails: 1,
            fail_timeout_ms: 3_000,
        }
    }
}

/// Failover state machine timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// How long a high error ratio must persist before failing over.
    /// Health-down failures skip this window entirely.
    pub confirmation_ms: u64,

    /// Sustained good health required on the original primary before
    /// traffic is swapped back.
    pub cooldown_secs: u64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            confirmation_ms: 10_000,
            cooldown_secs: 180,
        }
    }
}

/// Proxy control surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// When false the watcher only alerts and never issues pool swaps.
    pub enabled: bool,

    /// Base URL of the proxy control surface.
    pub endpoint: String,

    /// Command timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://127.0.0.1:8081".to_string(),
            timeout_ms: 2_000,
        }
    }
}

/// Alerting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Webhook URL for operator notifications (Slack-compatible).
    pub webhook_url: Option<String>,

    /// Per-alert-kind cooldown enforced by the webhook sink.
    pub cooldown_secs: u64,

    /// Suppress webhook delivery entirely (alerts still logged).
    pub maintenance_mode: bool,

    /// Webhook delivery timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            cooldown_secs: 300,
            maintenance_mode: false,
            timeout_ms: 10_000,
        }
    }
}

/// Admin/status API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token). Empty disables auth.
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            bind_address: "127.0.0.1:8089".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
