//! The engine driving the watcher pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tokio::sync::broadcast;
use tokio::time;

use crate::alert::{Alert, AlertKind, Emitter, PoolSwapClient, Severity};
use crate::config::WatcherConfig;
use crate::engine::snapshot::{epoch_secs, PoolStatus, StatusSnapshot};
use crate::failover::{
    Action, FailoverMachine, PoolId, PoolNames, PoolSnapshot, Thresholds, TickSnapshot,
};
use crate::health::{HealthProber, HealthStatus};
use crate::observability::metrics;
use crate::source::OutcomeBuffer;
use crate::window::WindowEvaluator;

/// Owns every piece of mutable watcher state and serializes all of it
/// through the evaluation tick.
pub struct Engine {
    live: Arc<ArcSwap<WatcherConfig>>,
    buffer: Arc<OutcomeBuffer>,
    evaluator: WindowEvaluator,
    prober: HealthProber,
    primary_health: HealthStatus,
    backup_health: HealthStatus,
    machine: FailoverMachine,
    swap_client: PoolSwapClient,
    emitter: Emitter,
    status: Arc<ArcSwap<StatusSnapshot>>,
    window_capacity: usize,
    swap_failure_alerted: bool,
}

impl Engine {
    pub fn new(
        live: Arc<ArcSwap<WatcherConfig>>,
        buffer: Arc<OutcomeBuffer>,
        emitter: Emitter,
        status: Arc<ArcSwap<StatusSnapshot>>,
    ) -> Self {
        let config = live.load_full();

        let fail_timeout = Duration::from_millis(config.health.fail_timeout_ms);
        let names = PoolNames {
            primary: config.pools.primary.name.clone(),
            backup: config.pools.backup.name.clone(),
        };

        let mut swap_client = PoolSwapClient::new(&config.control);
        // The proxy's static configuration routes to the primary at boot;
        // recording that here keeps the first tick from issuing a command.
        swap_client.assume_applied(&config.pools.primary.name);

        Self {
            evaluator: WindowEvaluator::new(config.window.size),
            prober: HealthProber::new(
                config.health.path.clone(),
                Duration::from_millis(config.health.timeout_ms),
            ),
            primary_health: HealthStatus::new(config.health.max_fails, fail_timeout),
            backup_health: HealthStatus::new(config.health.max_fails, fail_timeout),
            machine: FailoverMachine::new(names),
            swap_client,
            window_capacity: config.window.size,
            swap_failure_alerted: false,
            live,
            buffer,
            emitter,
            status,
        }
    }

    /// Run the evaluation loop until shutdown.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut interval_ms = self.live.load().health.interval_ms;
        let mut ticker = time::interval(Duration::from_millis(interval_ms));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        tracing::info!(interval_ms, "Evaluation loop starting");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;

                    // Pick up a hot-reloaded tick interval.
                    let current = self.live.load().health.interval_ms;
                    if current != interval_ms {
                        interval_ms = current;
                        ticker = time::interval(Duration::from_millis(interval_ms));
                        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
                        tracing::info!(interval_ms, "Evaluation interval updated");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Evaluation loop received shutdown signal, exiting");
                    break;
                }
            }
        }
    }

    /// One evaluation tick.
    async fn tick(&mut self) {
        let config = self.live.load_full();
        self.apply_tunables(&config);

        // 1. Fold buffered outcomes into the windows.
        for outcome in self.buffer.drain() {
            metrics::record_outcome(
                self.machine.names().name(outcome.pool),
                outcome.status.label(),
                outcome.request_time,
            );
            self.evaluator.record(&outcome);
        }

        // 2. Probe both pools concurrently; each probe is individually
        //    bounded by the health-check timeout.
        let (primary_probe, backup_probe) = futures_util::join!(
            self.prober.check(&config.pools.primary.address),
            self.prober.check(&config.pools.backup.address),
        );

        let now = Instant::now();
        let primary_up = self.primary_health.record(primary_probe.ok, now);
        let backup_up = self.backup_health.record(backup_probe.ok, now);

        metrics::record_pool_health(&config.pools.primary.name, primary_up);
        metrics::record_pool_health(&config.pools.backup.name, backup_up);
        metrics::record_probe_latency(&config.pools.primary.name, primary_probe.latency);
        metrics::record_probe_latency(&config.pools.backup.name, backup_probe.latency);

        // 3. Combined snapshot of health and window state.
        let snapshot = TickSnapshot {
            primary: PoolSnapshot {
                is_up: primary_up,
                consecutive_failures: self.primary_health.consecutive_failures(),
                error_ratio: self.evaluator.error_ratio(PoolId::Primary),
                samples: self.evaluator.samples(PoolId::Primary),
            },
            backup: PoolSnapshot {
                is_up: backup_up,
                consecutive_failures: self.backup_health.consecutive_failures(),
                error_ratio: self.evaluator.error_ratio(PoolId::Backup),
                samples: self.evaluator.samples(PoolId::Backup),
            },
            observed_pool: self.evaluator.observed_pool(),
        };
        metrics::record_error_ratio(&config.pools.primary.name, snapshot.primary.error_ratio);
        metrics::record_error_ratio(&config.pools.backup.name, snapshot.backup.error_ratio);

        // 4. One machine step, then execute its effects.
        let thresholds = Thresholds::from_config(&config);
        let actions = self.machine.evaluate(&snapshot, &thresholds, now);
        for action in actions {
            match action {
                Action::Emit(alert) => self.emitter.emit(alert),
                Action::Swap(target) => {
                    metrics::record_failover(self.machine.names().name(target));
                    // The abandoned pool stops receiving traffic, so its
                    // window restarts: stale errors must neither block
                    // nor fake the recovery judgement.
                    self.evaluator.reset(target.other());
                }
            }
        }

        // 5. Converge proxy routing with the machine's active pool. This
        //    both issues fresh swaps and retries commands that failed on
        //    earlier ticks; the idempotent client makes it a no-op
        //    whenever routing already matches.
        self.converge_routing().await;

        // 6. Publish the tick's view for the admin API.
        self.publish(&snapshot);
        metrics::record_watcher_phase(self.machine.phase().name());
        metrics::record_dropped_outcomes(self.buffer.dropped());
    }

    fn apply_tunables(&mut self, config: &WatcherConfig) {
        if config.window.size != self.window_capacity {
            tracing::info!(size = config.window.size, "Window size updated");
            self.evaluator.set_capacity(config.window.size);
            self.window_capacity = config.window.size;
        }
        let fail_timeout = Duration::from_millis(config.health.fail_timeout_ms);
        self.primary_health
            .set_thresholds(config.health.max_fails, fail_timeout);
        self.backup_health
            .set_thresholds(config.health.max_fails, fail_timeout);
    }

    async fn converge_routing(&mut self) {
        let target = self.machine.active_name().to_string();
        match self.swap_client.ensure_active(&target).await {
            Ok(_) => {
                self.swap_failure_alerted = false;
            }
            Err(e) => {
                tracing::error!(
                    pool = %target,
                    error = %e,
                    "Pool swap command failed; routing diverges from watcher state, retrying next tick"
                );
                // Escalate once per divergence episode; the log sink
                // records every retry regardless.
                if !self.swap_failure_alerted {
                    self.emitter.emit(Alert::new(
                        AlertKind::SwapCommandFailed,
                        Severity::Critical,
                        target,
                        format!("proxy control surface rejected pool swap: {e}"),
                    ));
                    self.swap_failure_alerted = true;
                }
            }
        }
    }

    fn publish(&self, snapshot: &TickSnapshot) {
        let names = self.machine.names();
        let status = StatusSnapshot {
            phase: self.machine.phase().name(),
            active_pool: self.machine.active_name().to_string(),
            since_epoch_secs: epoch_secs(self.machine.since()),
            pools: vec![
                pool_status(&names.primary, PoolId::Primary, &snapshot.primary),
                pool_status(&names.backup, PoolId::Backup, &snapshot.backup),
            ],
            observed_pool: snapshot.observed_pool.map(|p| names.name(p).to_string()),
            routing_applied: self.swap_client.applied().map(str::to_string),
            dropped_outcomes: self.buffer.dropped(),
        };
        self.status.store(Arc::new(status));
    }
}

fn pool_status(name: &str, role: PoolId, snapshot: &PoolSnapshot) -> PoolStatus {
    PoolStatus {
        name: name.to_string(),
        role: role.role(),
        is_up: snapshot.is_up,
        consecutive_failures: snapshot.consecutive_failures,
        error_ratio: snapshot.error_ratio,
        samples: snapshot.samples,
    }
}
