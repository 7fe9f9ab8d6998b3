//! End-to-end failover scenarios against a running evaluation loop.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::time::Instant;

use failover_watcher::alert::{Alert, AlertKind, Emitter, Severity};
use failover_watcher::config::{PoolConfig, WatcherConfig};
use failover_watcher::engine::{Engine, StatusSnapshot};
use failover_watcher::lifecycle::Shutdown;
use failover_watcher::source::{LogParser, LogTailer, OutcomeBuffer};

mod common;

fn test_config(
    primary: SocketAddr,
    backup: SocketAddr,
    control: SocketAddr,
    log_path: &std::path::Path,
) -> WatcherConfig {
    let mut config = WatcherConfig::default();
    config.pools.primary = PoolConfig {
        name: "blue".into(),
        address: primary.to_string(),
    };
    config.pools.backup = PoolConfig {
        name: "green".into(),
        address: backup.to_string(),
    };
    config.access_log.path = log_path.display().to_string();
    config.access_log.startup_wait_secs = 2;
    config.health.interval_ms = 100;
    config.health.timeout_ms = 400;
    config.health.max_fails = 1;
    config.health.fail_timeout_ms = 3_000;
    config.failover.confirmation_ms = 300;
    config.failover.cooldown_secs = 1;
    config.control.endpoint = format!("http://{control}");
    config.control.timeout_ms = 500;
    config.admin.enabled = false;
    config.observability.metrics_enabled = false;
    config
}

/// Spawn the tailer and engine for a config; returns the observable
/// surfaces the scenarios assert against.
async fn start_watcher(
    config: WatcherConfig,
    shutdown: &Shutdown,
) -> (Arc<ArcSwap<StatusSnapshot>>, Arc<Mutex<Vec<Alert>>>) {
    let live = Arc::new(ArcSwap::from_pointee(config.clone()));
    let buffer = Arc::new(OutcomeBuffer::new(config.access_log.queue_capacity));

    let (sink, alerts) = common::RecordingSink::new();
    let emitter = Emitter::new().with_sink(Arc::new(sink));

    let tailer = LogTailer::new(
        config.access_log.path.clone(),
        LogParser::new(
            &config.pools.primary.name,
            &config.pools.backup.name,
        ),
        buffer.clone(),
        Duration::from_secs(config.access_log.startup_wait_secs),
    );
    tokio::spawn(tailer.run(shutdown.subscribe()));

    let status = Arc::new(ArcSwap::from_pointee(StatusSnapshot::starting()));
    let engine = Engine::new(live, buffer, emitter, status.clone());
    tokio::spawn(engine.run(shutdown.subscribe()));

    (status, alerts)
}

async fn wait_for(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

fn count_kind(alerts: &Arc<Mutex<Vec<Alert>>>, kind: AlertKind) -> usize {
    alerts
        .lock()
        .unwrap()
        .iter()
        .filter(|a| a.kind == kind)
        .count()
}

fn seeded_log() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    // The tailer waits for a non-empty file and then follows from the end.
    writeln!(file, r#"pool="blue" upstream_status=200 request_time=0.001"#).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn health_failure_swaps_to_backup_exactly_once() {
    let primary_addr: SocketAddr = "127.0.0.1:29181".parse().unwrap();
    let backup_addr: SocketAddr = "127.0.0.1:29182".parse().unwrap();
    let control_addr: SocketAddr = "127.0.0.1:29183".parse().unwrap();

    let primary_healthy = Arc::new(AtomicBool::new(true));
    common::start_flagged_backend(primary_addr, primary_healthy.clone()).await;
    common::start_flagged_backend(backup_addr, Arc::new(AtomicBool::new(true))).await;

    let accept = Arc::new(AtomicBool::new(true));
    let commands = common::start_control_surface(control_addr, accept).await;

    let log = seeded_log();
    let shutdown = Shutdown::new();
    let (status, alerts) = start_watcher(
        test_config(primary_addr, backup_addr, control_addr, log.path()),
        &shutdown,
    )
    .await;

    assert!(
        wait_for(|| status.load().phase == "healthy", Duration::from_secs(3)).await,
        "watcher should settle healthy first"
    );

    primary_healthy.store(false, Ordering::SeqCst);

    assert!(
        wait_for(
            || {
                let s = status.load();
                s.phase == "failed_over" && s.active_pool == "green"
            },
            Duration::from_secs(3)
        )
        .await,
        "health failure should fail over to green"
    );

    // Exactly one swap command, targeting the backup.
    assert_eq!(*commands.lock().unwrap(), vec!["green".to_string()]);

    // Exactly one FailoverDetected, attributed to the health check.
    assert_eq!(count_kind(&alerts, AlertKind::FailoverDetected), 1);
    {
        let alerts = alerts.lock().unwrap();
        let failover = alerts
            .iter()
            .find(|a| a.kind == AlertKind::FailoverDetected)
            .unwrap();
        assert_eq!(failover.severity, Severity::High);
        assert!(failover.detail.contains("health check failed"));
    }

    // Idempotence: further ticks with the same target issue nothing new.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(commands.lock().unwrap().len(), 1);
    assert_eq!(count_kind(&alerts, AlertKind::FailoverDetected), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn sustained_error_rate_alerts_once_and_degrades() {
    let primary_addr: SocketAddr = "127.0.0.1:29281".parse().unwrap();
    let backup_addr: SocketAddr = "127.0.0.1:29282".parse().unwrap();
    let control_addr: SocketAddr = "127.0.0.1:29283".parse().unwrap();

    common::start_flagged_backend(primary_addr, Arc::new(AtomicBool::new(true))).await;
    common::start_flagged_backend(backup_addr, Arc::new(AtomicBool::new(true))).await;
    let commands =
        common::start_control_surface(control_addr, Arc::new(AtomicBool::new(true))).await;

    let mut log = seeded_log();
    let mut config = test_config(primary_addr, backup_addr, control_addr, log.path());
    // Long confirmation: this scenario checks detection, not the swap.
    config.failover.confirmation_ms = 60_000;

    let shutdown = Shutdown::new();
    let (status, alerts) = start_watcher(config, &shutdown).await;

    assert!(
        wait_for(|| status.load().phase == "healthy", Duration::from_secs(3)).await
    );

    // 200 successes then 5 server errors: ratio 2.5% over a full window.
    for _ in 0..200 {
        writeln!(log, r#"pool="blue" upstream_status=200 request_time=0.003"#).unwrap();
    }
    for _ in 0..5 {
        writeln!(log, r#"pool="blue" upstream_status=502 request_time=0.001"#).unwrap();
    }
    log.flush().unwrap();

    assert!(
        wait_for(
            || count_kind(&alerts, AlertKind::HighErrorRate) > 0,
            Duration::from_secs(5)
        )
        .await,
        "high error ratio should raise an alert"
    );
    assert!(
        wait_for(|| status.load().phase == "degraded", Duration::from_secs(2)).await
    );

    // Still degraded, no re-trigger: exactly one alert, no pool swap.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(count_kind(&alerts, AlertKind::HighErrorRate), 1);
    assert!(commands.lock().unwrap().is_empty());
    assert_eq!(status.load().active_pool, "blue");

    shutdown.trigger();
}

#[tokio::test]
async fn recovery_swaps_back_after_cooldown() {
    let primary_addr: SocketAddr = "127.0.0.1:29381".parse().unwrap();
    let backup_addr: SocketAddr = "127.0.0.1:29382".parse().unwrap();
    let control_addr: SocketAddr = "127.0.0.1:29383".parse().unwrap();

    let primary_healthy = Arc::new(AtomicBool::new(true));
    common::start_flagged_backend(primary_addr, primary_healthy.clone()).await;
    common::start_flagged_backend(backup_addr, Arc::new(AtomicBool::new(true))).await;
    let commands =
        common::start_control_surface(control_addr, Arc::new(AtomicBool::new(true))).await;

    let log = seeded_log();
    let shutdown = Shutdown::new();
    let (status, alerts) = start_watcher(
        test_config(primary_addr, backup_addr, control_addr, log.path()),
        &shutdown,
    )
    .await;

    assert!(
        wait_for(|| status.load().phase == "healthy", Duration::from_secs(3)).await
    );

    primary_healthy.store(false, Ordering::SeqCst);
    assert!(
        wait_for(|| status.load().phase == "failed_over", Duration::from_secs(3)).await
    );

    // Primary comes back; after the 1s cool-down traffic returns to it.
    primary_healthy.store(true, Ordering::SeqCst);
    assert!(
        wait_for(
            || {
                let s = status.load();
                s.phase == "healthy" && s.active_pool == "blue"
            },
            Duration::from_secs(5)
        )
        .await,
        "sustained recovery should swap traffic back to blue"
    );

    assert_eq!(
        *commands.lock().unwrap(),
        vec!["green".to_string(), "blue".to_string()]
    );
    assert_eq!(count_kind(&alerts, AlertKind::FailoverRecovered), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn rejected_swap_escalates_and_retries() {
    let primary_addr: SocketAddr = "127.0.0.1:29481".parse().unwrap();
    let backup_addr: SocketAddr = "127.0.0.1:29482".parse().unwrap();
    let control_addr: SocketAddr = "127.0.0.1:29483".parse().unwrap();

    let primary_healthy = Arc::new(AtomicBool::new(true));
    common::start_flagged_backend(primary_addr, primary_healthy.clone()).await;
    common::start_flagged_backend(backup_addr, Arc::new(AtomicBool::new(true))).await;

    // Control surface rejects everything at first.
    let accept = Arc::new(AtomicBool::new(false));
    let commands = common::start_control_surface(control_addr, accept.clone()).await;

    let log = seeded_log();
    let shutdown = Shutdown::new();
    let (status, alerts) = start_watcher(
        test_config(primary_addr, backup_addr, control_addr, log.path()),
        &shutdown,
    )
    .await;

    assert!(
        wait_for(|| status.load().phase == "healthy", Duration::from_secs(3)).await
    );
    primary_healthy.store(false, Ordering::SeqCst);

    // The failover decision lands, the command does not.
    assert!(
        wait_for(
            || count_kind(&alerts, AlertKind::SwapCommandFailed) > 0,
            Duration::from_secs(3)
        )
        .await,
        "rejected swap should escalate as its own alert"
    );
    {
        let alerts = alerts.lock().unwrap();
        let escalation = alerts
            .iter()
            .find(|a| a.kind == AlertKind::SwapCommandFailed)
            .unwrap();
        assert_eq!(escalation.severity, Severity::Critical);
    }
    assert!(commands.lock().unwrap().is_empty());

    // One escalation per divergence episode, not one per retry tick.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(count_kind(&alerts, AlertKind::SwapCommandFailed), 1);

    // Once the control surface accepts again, the retry converges.
    accept.store(true, Ordering::SeqCst);
    assert!(
        wait_for(
            || *commands.lock().unwrap() == vec!["green".to_string()],
            Duration::from_secs(3)
        )
        .await,
        "watcher should keep retrying the swap until it lands"
    );

    shutdown.trigger();
}
