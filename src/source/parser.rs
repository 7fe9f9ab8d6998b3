//! Access log line parsing.
//!
//! The proxy writes structured access log entries of the form:
//!
//! ```text
//! ... pool="blue" release="v1.4.2" upstream_status=502 upstream_addr=10.0.0.4:3000 request_time=0.031 ...
//! ```
//!
//! Only `pool` and `upstream_status` are required to classify an outcome;
//! everything else is optional enrichment.

use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;

use crate::failover::PoolId;

static POOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"pool="([^"]*)""#).expect("pool regex"));
static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"upstream_status=([\d-]+)").expect("status regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"request_time=([\d.]+)").expect("time regex"));

/// Classified request outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx and 3xx upstream status.
    Success,
    /// 5xx upstream status; these drive the error ratio.
    ServerError,
    /// 4xx, missing, or unparsable status. Counted in the window
    /// denominator but never as an error.
    Other,
}

impl StatusClass {
    fn from_upstream(raw: &str) -> StatusClass {
        match raw.bytes().next() {
            Some(b'2') | Some(b'3') => StatusClass::Success,
            Some(b'5') => StatusClass::ServerError,
            _ => StatusClass::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusClass::Success => "success",
            StatusClass::ServerError => "server_error",
            StatusClass::Other => "other",
        }
    }
}

/// One request outcome observed through the access log. Immutable once
/// recorded.
#[derive(Debug, Clone, Copy)]
pub struct RequestOutcome {
    pub timestamp: SystemTime,
    pub pool: PoolId,
    pub status: StatusClass,
    /// Upstream request time in seconds, 0 when absent.
    pub request_time: f64,
}

/// Parses access log lines against the configured pool names.
#[derive(Debug, Clone)]
pub struct LogParser {
    primary_name: String,
    backup_name: String,
}

impl LogParser {
    pub fn new(primary_name: impl Into<String>, backup_name: impl Into<String>) -> Self {
        Self {
            primary_name: primary_name.into(),
            backup_name: backup_name.into(),
        }
    }

    /// Parse a single log line. Lines without a known pool label are not
    /// outcomes (error pages served by the proxy itself, other vhosts)
    /// and return `None`.
    pub fn parse(&self, line: &str) -> Option<RequestOutcome> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let label = POOL_RE.captures(line)?.get(1)?.as_str();
        let pool = if label == self.primary_name {
            PoolId::Primary
        } else if label == self.backup_name {
            PoolId::Backup
        } else {
            return None;
        };

        let status = STATUS_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| StatusClass::from_upstream(m.as_str()))
            .unwrap_or(StatusClass::Other);

        let request_time = TIME_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0.0);

        Some(RequestOutcome {
            timestamp: SystemTime::now(),
            pool,
            status,
            request_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> LogParser {
        LogParser::new("blue", "green")
    }

    #[test]
    fn parses_success_line() {
        let line = r#"10.0.0.1 - - pool="blue" release="v1" upstream_status=200 upstream_addr=10.0.0.4:3000 request_time=0.012"#;
        let outcome = parser().parse(line).unwrap();
        assert_eq!(outcome.pool, PoolId::Primary);
        assert_eq!(outcome.status, StatusClass::Success);
        assert!((outcome.request_time - 0.012).abs() < f64::EPSILON);
    }

    #[test]
    fn maps_5xx_to_server_error() {
        let line = r#"pool="green" upstream_status=503 request_time=0.002"#;
        let outcome = parser().parse(line).unwrap();
        assert_eq!(outcome.pool, PoolId::Backup);
        assert_eq!(outcome.status, StatusClass::ServerError);
    }

    #[test]
    fn client_errors_are_other() {
        let outcome = parser()
            .parse(r#"pool="blue" upstream_status=404"#)
            .unwrap();
        assert_eq!(outcome.status, StatusClass::Other);
    }

    #[test]
    fn missing_upstream_status_is_other() {
        // The proxy logs "-" when no upstream was reached.
        let outcome = parser()
            .parse(r#"pool="blue" upstream_status=- request_time=0.000"#)
            .unwrap();
        assert_eq!(outcome.status, StatusClass::Other);
    }

    #[test]
    fn unknown_pool_is_skipped() {
        assert!(parser().parse(r#"pool="canary" upstream_status=200"#).is_none());
    }

    #[test]
    fn lines_without_pool_are_skipped() {
        assert!(parser().parse("").is_none());
        assert!(parser().parse("GET /healthz 200").is_none());
    }
}
