//! Blue/Green Failover Watcher
//!
//! Watches a two-pool (Blue/Green) topology behind a reverse proxy and
//! drives zero-downtime cutover from automatic failure detection.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────────┐
//!                      │                 FAILOVER WATCHER                   │
//!                      │                                                    │
//!   proxy access log   │  ┌─────────┐     ┌─────────┐     ┌──────────────┐  │
//!   ──────────────────▶│  │ source  │────▶│ window  │────▶│   failover   │  │
//!                      │  │  tail   │     │evaluator│     │state machine │  │
//!                      │  └─────────┘     └─────────┘     └──────┬───────┘  │
//!                      │                       ▲                 │          │
//!   pool /healthz      │  ┌─────────┐          │                 ▼          │
//!   ◀─────────────────▶│  │ health  │──────────┴─────────┌──────────────┐   │
//!                      │  │ probes  │                    │    alert &   │   │
//!                      │  └─────────┘                    │   command    │   │
//!                      │                                 │   emitter    │   │
//!                      │                                 └──────┬───────┘   │
//!                      │  ┌────────────────────────────────────┐│           │
//!                      │  │       Cross-Cutting Concerns       ││ alerts,   │
//!                      │  │  config · observability · admin   ││ pool swaps│
//!                      │  │  lifecycle · resilience            ││           │
//!                      │  └────────────────────────────────────┘▼           │
//!                      └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use clap::Parser;

use failover_watcher::admin::{self, AdminState};
use failover_watcher::alert::{Emitter, LogSink, WebhookSink};
use failover_watcher::config::loader::load_config;
use failover_watcher::config::reload::ConfigReloader;
use failover_watcher::engine::{Engine, StatusSnapshot};
use failover_watcher::lifecycle::{signals, Shutdown};
use failover_watcher::observability;
use failover_watcher::source::{LogParser, LogTailer, OutcomeBuffer};

#[derive(Parser)]
#[command(name = "failover-watcher")]
#[command(about = "Blue/Green failover watcher", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "/etc/failover-watcher/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Configuration errors are fatal at startup, before anything runs.
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failover-watcher: configuration error: {e}");
            std::process::exit(1);
        }
    };

    observability::logging::init(&config.observability.log_level);

    tracing::info!("failover-watcher v0.1.0 starting");
    tracing::info!(
        primary = %config.pools.primary.name,
        backup = %config.pools.backup.name,
        window_size = config.window.size,
        error_ratio_threshold = config.window.error_ratio_threshold,
        interval_ms = config.health.interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let live = Arc::new(ArcSwap::from_pointee(config.clone()));

    // Hot reload of tunables. Best effort: a watcher that cannot start
    // leaves the initial config in place.
    let _reload_handle = match ConfigReloader::new(&args.config, live.clone()).run() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Config reloader unavailable, hot reload disabled");
            None
        }
    };

    let shutdown = Shutdown::new();

    // Log tailer feeding the bounded outcome buffer.
    let buffer = Arc::new(OutcomeBuffer::new(config.access_log.queue_capacity));
    let tailer = LogTailer::new(
        config.access_log.path.clone(),
        LogParser::new(&config.pools.primary.name, &config.pools.backup.name),
        buffer.clone(),
        Duration::from_secs(config.access_log.startup_wait_secs),
    );
    tokio::spawn(tailer.run(shutdown.subscribe()));

    // Alert sinks: the log always, the webhook when configured.
    let mut emitter = Emitter::new().with_sink(Arc::new(LogSink));
    match &config.alerts.webhook_url {
        Some(url) => {
            emitter = emitter.with_sink(Arc::new(WebhookSink::new(url.clone(), live.clone())));
            tracing::info!("Webhook alert sink configured");
        }
        None => tracing::info!("No webhook configured, alerts go to the log only"),
    }

    // The evaluation loop.
    let status = Arc::new(ArcSwap::from_pointee(StatusSnapshot::starting()));
    let engine = Engine::new(live, buffer, emitter.clone(), status.clone());
    tokio::spawn(engine.run(shutdown.subscribe()));

    // Operator status API.
    if config.admin.enabled {
        let state = AdminState {
            status,
            emitter,
            api_key: config.admin.api_key.clone(),
        };
        let bind_address = config.admin.bind_address.clone();
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = admin::serve(state, bind_address, rx).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    signals::shutdown_signal().await;
    shutdown.trigger();

    // Drain: tasks exit on their own, probes are bounded by the health
    // check timeout.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while shutdown.receiver_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
