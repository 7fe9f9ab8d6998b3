//! Pool-swap commands against the proxy control surface.

use std::time::Duration;

use crate::config::ControlConfig;

/// Command failure. The caller escalates this as a Critical alert and
/// retries on the next evaluation tick; the proxy may be routing a pool
/// the watcher no longer considers active until the retry lands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("control surface request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("control surface rejected swap with status {0}")]
    Rejected(u16),
}

/// Issues routing changes to the proxy control surface.
///
/// Remembers the last target it successfully applied, which makes
/// `ensure_active` idempotent and lets the engine detect divergence
/// between the machine's active pool and the proxy's routing.
pub struct PoolSwapClient {
    enabled: bool,
    endpoint: String,
    client: reqwest::Client,
    applied: Option<String>,
}

impl PoolSwapClient {
    pub fn new(config: &ControlConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            enabled: config.enabled,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
            applied: None,
        }
    }

    /// The pool name last confirmed applied, if any.
    pub fn applied(&self) -> Option<&str> {
        self.applied.as_deref()
    }

    /// Record a routing target as already applied without issuing a
    /// command. Used at startup, where the proxy's static configuration
    /// is the source of truth.
    pub fn assume_applied(&mut self, pool_name: &str) {
        self.applied = Some(pool_name.to_string());
    }

    /// Make `pool_name` the proxy's active pool.
    ///
    /// Returns `Ok(true)` when a command was issued, `Ok(false)` when the
    /// target was already applied (no-op). Errors leave the recorded
    /// routing unchanged so the next call retries.
    pub async fn ensure_active(&mut self, pool_name: &str) -> Result<bool, CommandError> {
        if self.applied.as_deref() == Some(pool_name) {
            tracing::debug!(pool = %pool_name, "Pool swap skipped, target already active");
            return Ok(false);
        }

        if !self.enabled {
            tracing::info!(
                pool = %pool_name,
                "Control surface disabled; pool swap not issued (alert-only mode)"
            );
            self.applied = Some(pool_name.to_string());
            return Ok(false);
        }

        let url = format!("{}/pools/active", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "active_pool": pool_name }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CommandError::Rejected(response.status().as_u16()));
        }

        tracing::info!(pool = %pool_name, "Pool swap command applied");
        self.applied = Some(pool_name.to_string());
        Ok(true)
    }
}
