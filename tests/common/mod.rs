//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use failover_watcher::alert::sink::AlertError;
use failover_watcher::alert::{Alert, AlertSink};

/// Start a programmable mock pool: every request gets the status and
/// body the closure produces.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a mock pool whose health flips with an atomic flag.
#[allow(dead_code)]
pub async fn start_flagged_backend(addr: SocketAddr, healthy: Arc<AtomicBool>) {
    start_programmable_backend(addr, move || {
        let healthy = healthy.clone();
        async move {
            if healthy.load(Ordering::SeqCst) {
                (200, "ok".to_string())
            } else {
                (500, "down".to_string())
            }
        }
    })
    .await;
}

/// Start a stub proxy control surface that captures pool-swap commands.
///
/// Returns the pool names received, in order. While `accept` is false
/// the stub rejects commands with a 500.
#[allow(dead_code)]
pub async fn start_control_surface(
    addr: SocketAddr,
    accept: Arc<AtomicBool>,
) -> Arc<Mutex<Vec<String>>> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let commands = Arc::new(Mutex::new(Vec::new()));
    let captured = commands.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let captured = captured.clone();
                    let accept = accept.clone();
                    tokio::spawn(async move {
                        let mut data = Vec::new();
                        let mut buf = [0u8; 4096];
                        let pool = loop {
                            match socket.read(&mut buf).await {
                                Ok(0) => break None,
                                Ok(n) => {
                                    data.extend_from_slice(&buf[..n]);
                                    if let Some(pool) = extract_pool(&data) {
                                        break Some(pool);
                                    }
                                }
                                Err(_) => break None,
                            }
                        };

                        let response = if accept.load(Ordering::SeqCst) {
                            if let Some(pool) = pool {
                                captured.lock().unwrap().push(pool);
                            }
                            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok"
                        } else {
                            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        };
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    commands
}

fn extract_pool(data: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(data);
    let marker = "\"active_pool\":\"";
    let start = text.find(marker)? + marker.len();
    let end = text[start..].find('"')? + start;
    Some(text[start..end].to_string())
}

/// Sink that records every alert it is handed.
#[allow(dead_code)]
pub struct RecordingSink {
    alerts: Arc<Mutex<Vec<Alert>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> (Self, Arc<Mutex<Vec<Alert>>>) {
        let alerts = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                alerts: alerts.clone(),
            },
            alerts,
        )
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}
