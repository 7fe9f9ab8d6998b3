//! Active health probing.
//!
//! # Responsibilities
//! - Perform bounded-timeout HTTP GETs against pool health endpoints
//! - Report pass/fail plus observed latency; never raise errors

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

/// Result of one health probe. A timeout or non-2xx response is a failed
/// check, not an error: failures are data.
#[derive(Debug, Clone, Copy)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub latency: Duration,
}

/// Probes pool health endpoints.
pub struct HealthProber {
    client: Client<HttpConnector, Body>,
    path: String,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(path: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            path: path.into(),
            timeout,
        }
    }

    /// Check one pool. Bounded by the configured timeout so a stuck pool
    /// can never stall the evaluation tick beyond that bound.
    pub async fn check(&self, address: &str) -> ProbeOutcome {
        let started = time::Instant::now();
        let uri_string = format!("http://{}{}", address, self.path);

        let request = match Request::builder()
            .method("GET")
            .uri(&uri_string)
            .header("user-agent", "failover-watcher-health")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(error = %e, uri = %uri_string, "Failed to build health check request");
                return ProbeOutcome {
                    ok: false,
                    latency: started.elapsed(),
                };
            }
        };

        let response_future = self.client.request(request);

        let ok = match time::timeout(self.timeout, response_future).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(addr = %address, status = %response.status(), "Health check failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(addr = %address, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(addr = %address, timeout = ?self.timeout, "Health check failed: timeout");
                false
            }
        };

        ProbeOutcome {
            ok,
            latency: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_to_closed_port_fails() {
        let prober = HealthProber::new("/healthz", Duration::from_millis(200));
        let outcome = prober.check("127.0.0.1:1").await;
        assert!(!outcome.ok);
    }

    #[tokio::test]
    async fn probe_latency_is_bounded_by_timeout() {
        let prober = HealthProber::new("/healthz", Duration::from_millis(200));
        // Non-routable address: the probe should give up at the timeout.
        let outcome = prober.check("10.255.255.1:9").await;
        assert!(!outcome.ok);
        assert!(outcome.latency < Duration::from_secs(2));
    }
}
