//! Metrics collection and exposition.
//!
//! # Metrics
//! - `watcher_outcomes_total` (counter): observed requests by pool, status class
//! - `watcher_upstream_request_seconds` (histogram): upstream latency by pool
//! - `watcher_error_ratio` (gauge): rolling window error ratio by pool
//! - `watcher_pool_up` (gauge): 1=up, 0=down by pool
//! - `watcher_probe_duration_seconds` (histogram): health probe latency
//! - `watcher_phase` (gauge): 1 on the current machine phase
//! - `watcher_failovers_total` (counter): pool swaps by target
//! - `watcher_alerts_total` (counter): alerts by kind
//! - `watcher_log_lines_total` (counter): tailed lines by matched
//! - `watcher_dropped_outcomes_total` (gauge): buffer evictions

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

const PHASES: [&str; 4] = ["healthy", "degraded", "failed_over", "recovering"];

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_outcome(pool: &str, status: &'static str, request_time: f64) {
    counter!(
        "watcher_outcomes_total",
        "pool" => pool.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("watcher_upstream_request_seconds", "pool" => pool.to_string())
        .record(request_time);
}

pub fn record_error_ratio(pool: &str, ratio: f64) {
    gauge!("watcher_error_ratio", "pool" => pool.to_string()).set(ratio);
}

pub fn record_pool_health(pool: &str, up: bool) {
    gauge!("watcher_pool_up", "pool" => pool.to_string()).set(if up { 1.0 } else { 0.0 });
}

pub fn record_probe_latency(pool: &str, latency: Duration) {
    histogram!("watcher_probe_duration_seconds", "pool" => pool.to_string())
        .record(latency.as_secs_f64());
}

pub fn record_watcher_phase(current: &'static str) {
    for phase in PHASES {
        gauge!("watcher_phase", "phase" => phase).set(if phase == current { 1.0 } else { 0.0 });
    }
}

pub fn record_failover(target: &str) {
    counter!("watcher_failovers_total", "target" => target.to_string()).increment(1);
}

pub fn record_alert(kind: &'static str) {
    counter!("watcher_alerts_total", "kind" => kind).increment(1);
}

pub fn record_log_line(matched: bool) {
    counter!(
        "watcher_log_lines_total",
        "matched" => if matched { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_dropped_outcomes(total: u64) {
    gauge!("watcher_dropped_outcomes_total").set(total as f64);
}
