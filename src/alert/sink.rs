//! Alert sinks and the fan-out emitter.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::alert::{Alert, AlertKind, Severity};
use crate::config::WatcherConfig;
use crate::observability::metrics;

/// Alerts retained for the admin API.
const RECENT_CAPACITY: usize = 100;

/// Delivery failure. Logged locally; never blocks the evaluation loop.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(u16),
}

/// A destination for alerts. Duplicate suppression is the sink's
/// responsibility, not the emitter's.
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Structured log output. Always configured; never suppresses.
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        match alert.severity {
            Severity::Critical => tracing::error!(
                kind = alert.kind.label(),
                pool = %alert.pool,
                detail = %alert.detail,
                alert_id = %alert.id,
                "ALERT"
            ),
            Severity::High => tracing::warn!(
                kind = alert.kind.label(),
                pool = %alert.pool,
                detail = %alert.detail,
                alert_id = %alert.id,
                "ALERT"
            ),
        }
        Ok(())
    }
}

/// Slack-compatible webhook sink with per-kind cooldown and a
/// maintenance-mode gate. Cooldown and maintenance flags are read from
/// the live config so hot reloads apply without restarting.
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
    live: Arc<ArcSwap<WatcherConfig>>,
    last_sent: DashMap<AlertKind, Instant>,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, live: Arc<ArcSwap<WatcherConfig>>) -> Self {
        let timeout = Duration::from_millis(live.load().alerts.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
            live,
            last_sent: DashMap::new(),
        }
    }

    /// Per-kind cooldown check; records the send time when allowed.
    fn pass_cooldown(&self, kind: AlertKind, cooldown: Duration) -> bool {
        let now = Instant::now();
        match self.last_sent.entry(kind) {
            dashmap::Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < cooldown {
                    return false;
                }
                entry.insert(now);
                true
            }
            dashmap::Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    fn payload(alert: &Alert) -> serde_json::Value {
        let emoji = match alert.kind {
            AlertKind::FailoverDetected => "🔄",
            AlertKind::HighErrorRate => "🚨",
            AlertKind::FailoverRecovered => "✅",
            AlertKind::SwapCommandFailed => "🛑",
        };
        serde_json::json!({
            "text": format!("{} {}: pool {} | {}", emoji, alert.kind.title(), alert.pool, alert.detail),
            "blocks": [
                {
                    "type": "header",
                    "text": { "type": "plain_text", "text": format!("{} {}", emoji, alert.kind.title()), "emoji": true }
                },
                {
                    "type": "section",
                    "fields": [
                        { "type": "mrkdwn", "text": format!("*Pool:* `{}`", alert.pool) },
                        { "type": "mrkdwn", "text": format!("*Severity:* {:?}", alert.severity) }
                    ]
                },
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": alert.detail.clone() }
                }
            ]
        })
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        let config = self.live.load();

        if config.alerts.maintenance_mode {
            tracing::info!(kind = alert.kind.label(), "Maintenance mode active, suppressing webhook alert");
            return Ok(());
        }

        let cooldown = Duration::from_secs(config.alerts.cooldown_secs);
        if !self.pass_cooldown(alert.kind, cooldown) {
            tracing::debug!(kind = alert.kind.label(), "Webhook alert suppressed by cooldown");
            return Ok(());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&Self::payload(alert))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AlertError::Status(response.status().as_u16()));
        }

        tracing::info!(kind = alert.kind.label(), pool = %alert.pool, "Alert delivered to webhook");
        Ok(())
    }
}

/// Fans alerts out to every configured sink and keeps a bounded ring of
/// recent alerts for the admin API. Deliveries are spawned so a slow or
/// unreachable sink can never stall the evaluation tick.
#[derive(Clone)]
pub struct Emitter {
    sinks: Vec<Arc<dyn AlertSink>>,
    recent: Arc<Mutex<VecDeque<Alert>>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            recent: Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_CAPACITY))),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Emit an alert to every sink, at-least-once per sink attempt.
    pub fn emit(&self, alert: Alert) {
        metrics::record_alert(alert.kind.label());

        {
            let mut recent = self.recent.lock().expect("recent alerts mutex poisoned");
            if recent.len() == RECENT_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(alert.clone());
        }

        for sink in &self.sinks {
            let sink = sink.clone();
            let alert = alert.clone();
            tokio::spawn(async move {
                if let Err(e) = sink.deliver(&alert).await {
                    tracing::error!(
                        sink = sink.name(),
                        kind = alert.kind.label(),
                        error = %e,
                        "Alert delivery failed"
                    );
                }
            });
        }
    }

    /// Most recent alerts, oldest first.
    pub fn recent(&self) -> Vec<Alert> {
        self.recent
            .lock()
            .expect("recent alerts mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        delivered: AtomicUsize,
    }

    #[async_trait]
    impl AlertSink for CountingSink {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn deliver(&self, _alert: &Alert) -> Result<(), AlertError> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn alert() -> Alert {
        Alert::new(
            AlertKind::HighErrorRate,
            Severity::High,
            "blue",
            "error ratio 2.50% over 200 samples",
        )
    }

    #[tokio::test]
    async fn emitter_fans_out_and_records() {
        let sink = Arc::new(CountingSink {
            delivered: AtomicUsize::new(0),
        });
        let emitter = Emitter::new().with_sink(sink.clone());

        emitter.emit(alert());
        emitter.emit(alert());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.recent().len(), 2);
    }

    #[tokio::test]
    async fn recent_ring_is_bounded() {
        let emitter = Emitter::new();
        for _ in 0..(RECENT_CAPACITY + 10) {
            emitter.emit(alert());
        }
        assert_eq!(emitter.recent().len(), RECENT_CAPACITY);
    }

    #[test]
    fn webhook_cooldown_gates_repeats() {
        let live = Arc::new(ArcSwap::from_pointee(WatcherConfig::default()));
        let sink = WebhookSink::new("http://127.0.0.1:1/hook", live);

        let cooldown = Duration::from_secs(300);
        assert!(sink.pass_cooldown(AlertKind::FailoverDetected, cooldown));
        assert!(!sink.pass_cooldown(AlertKind::FailoverDetected, cooldown));
        // A different kind has its own clock.
        assert!(sink.pass_cooldown(AlertKind::HighErrorRate, cooldown));
    }
}
