//! Access log tailing.
//!
//! # Responsibilities
//! - Follow the proxy access log from its current end
//! - Survive rotation and truncation by reopening
//! - Retry read failures with jittered backoff, never terminate the stream

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::source::buffer::OutcomeBuffer;
use crate::source::parser::LogParser;

/// Poll interval while the log has no new data.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

const RETRY_BASE_MS: u64 = 200;
const RETRY_MAX_MS: u64 = 10_000;

/// Tails the access log and feeds classified outcomes into the buffer.
///
/// Runs as an independent producer task; the evaluation tick never waits
/// on it.
pub struct LogTailer {
    path: PathBuf,
    parser: LogParser,
    buffer: Arc<OutcomeBuffer>,
    startup_wait: Duration,
}

impl LogTailer {
    pub fn new(
        path: impl Into<PathBuf>,
        parser: LogParser,
        buffer: Arc<OutcomeBuffer>,
        startup_wait: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            parser,
            buffer,
            startup_wait,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(path = ?self.path, "Log tailer starting");

        if !self.wait_for_file(&mut shutdown).await {
            return;
        }

        // Only the very first open starts from the end: everything before
        // the watcher came up is history. Reopens after rotation read the
        // new file from the beginning.
        let mut from_end = true;
        let mut attempt: u32 = 0;

        loop {
            let file = match File::open(&self.path).await {
                Ok(file) => file,
                Err(e) => {
                    attempt += 1;
                    let delay = calculate_backoff(attempt, RETRY_BASE_MS, RETRY_MAX_MS);
                    tracing::warn!(path = ?self.path, error = %e, delay = ?delay, "Failed to open access log, retrying");
                    if !sleep_or_shutdown(delay, &mut shutdown).await {
                        return;
                    }
                    continue;
                }
            };

            match self.follow(file, from_end, &mut shutdown).await {
                Follow::Reopen => {
                    from_end = false;
                    attempt = 0;
                }
                Follow::ReadError => {
                    attempt += 1;
                    let delay = calculate_backoff(attempt, RETRY_BASE_MS, RETRY_MAX_MS);
                    tracing::warn!(delay = ?delay, "Access log read error, reopening after backoff");
                    if !sleep_or_shutdown(delay, &mut shutdown).await {
                        return;
                    }
                    from_end = false;
                }
                Follow::Shutdown => {
                    tracing::info!("Log tailer received shutdown signal, exiting");
                    return;
                }
            }
        }
    }

    /// Read lines until rotation, error, or shutdown.
    async fn follow(
        &self,
        file: File,
        from_end: bool,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Follow {
        let mut reader = BufReader::new(file);
        let mut pos: u64 = 0;

        if from_end {
            match reader.seek(SeekFrom::End(0)).await {
                Ok(offset) => pos = offset,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to seek access log");
                    return Follow::ReadError;
                }
            }
        }

        let mut line = String::new();
        loop {
            line.clear();
            tokio::select! {
                result = reader.read_line(&mut line) => match result {
                    Ok(0) => {
                        // At EOF. A shrinking file means rotation or
                        // truncation; reopen and read the replacement.
                        match tokio::fs::metadata(&self.path).await {
                            Ok(meta) if meta.len() < pos => {
                                tracing::info!(path = ?self.path, "Access log rotated or truncated, reopening");
                                return Follow::Reopen;
                            }
                            Err(e) => {
                                tracing::warn!(path = ?self.path, error = %e, "Access log disappeared");
                                return Follow::ReadError;
                            }
                            _ => {}
                        }
                        if !sleep_or_shutdown(POLL_INTERVAL, shutdown).await {
                            return Follow::Shutdown;
                        }
                    }
                    Ok(n) => {
                        pos += n as u64;
                        let matched = match self.parser.parse(&line) {
                            Some(outcome) => {
                                self.buffer.push(outcome);
                                true
                            }
                            None => false,
                        };
                        metrics::record_log_line(matched);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Error reading access log line");
                        return Follow::ReadError;
                    }
                },
                _ = shutdown.recv() => return Follow::Shutdown,
            }
        }
    }

    /// Wait for the log file to exist and have content. Gives up after the
    /// configured startup wait and proceeds anyway: the open loop keeps
    /// retrying, this just avoids noisy logs during orchestration startup.
    async fn wait_for_file(&self, shutdown: &mut broadcast::Receiver<()>) -> bool {
        let deadline = time::Instant::now() + self.startup_wait;

        loop {
            match tokio::fs::metadata(&self.path).await {
                Ok(meta) if meta.len() > 0 => {
                    tracing::info!(path = ?self.path, size = meta.len(), "Access log ready");
                    return true;
                }
                _ => {}
            }
            if time::Instant::now() >= deadline {
                tracing::warn!(
                    path = ?self.path,
                    waited = ?self.startup_wait,
                    "Access log not ready yet, tailer will keep retrying"
                );
                return true;
            }
            if !sleep_or_shutdown(Duration::from_secs(2), shutdown).await {
                return false;
            }
        }
    }
}

enum Follow {
    Reopen,
    ReadError,
    Shutdown,
}

/// Sleep unless shutdown fires first. Returns false on shutdown.
async fn sleep_or_shutdown(duration: Duration, shutdown: &mut broadcast::Receiver<()>) -> bool {
    tokio::select! {
        _ = time::sleep(duration) => true,
        _ = shutdown.recv() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use std::io::Write;

    #[tokio::test]
    async fn tails_appended_lines_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"pool="blue" upstream_status=500"#).unwrap();
        file.flush().unwrap();

        let buffer = Arc::new(OutcomeBuffer::new(16));
        let tailer = LogTailer::new(
            file.path(),
            LogParser::new("blue", "green"),
            buffer.clone(),
            Duration::from_secs(5),
        );

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(tailer.run(shutdown.subscribe()));

        // Give the tailer time to reach the end of the file.
        time::sleep(Duration::from_millis(300)).await;
        // The pre-existing 500 line must not be picked up.
        assert!(buffer.drain().is_empty());

        writeln!(file, r#"pool="green" upstream_status=200 request_time=0.004"#).unwrap();
        writeln!(file, r#"pool="blue" upstream_status=503"#).unwrap();
        file.flush().unwrap();

        time::sleep(Duration::from_millis(600)).await;
        let outcomes = buffer.drain();
        assert_eq!(outcomes.len(), 2);

        shutdown.trigger();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn shuts_down_while_waiting_for_file() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(OutcomeBuffer::new(16));
        let tailer = LogTailer::new(
            dir.path().join("missing.log"),
            LogParser::new("blue", "green"),
            buffer,
            Duration::from_secs(60),
        );

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(tailer.run(shutdown.subscribe()));
        time::sleep(Duration::from_millis(100)).await;
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("tailer should exit promptly on shutdown")
            .unwrap();
    }
}
