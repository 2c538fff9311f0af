//! Streaming media downloader with cancellation and retry.
//!
//! Each task downloads one media URL to a preassigned path. The body is
//! streamed to disk chunk by chunk; the cancellation token is checked
//! between chunks, and a cancelled or failed write never leaves a partial
//! file behind.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::DownloadError;
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use crate::user_agent;

/// Connect timeout for media requests.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for media requests (bodies can be large).
const READ_TIMEOUT_SECS: u64 = 60;

/// Retry sleeps are chopped into ticks of this length so a cancellation
/// request is honored within about a second.
const RETRY_WAIT_TICK: Duration = Duration::from_secs(1);

/// Terminal state of one download.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The file was written completely.
    Completed,
    /// All allowed attempts failed; the final error is attached.
    Failed(DownloadError),
    /// Cancellation was observed before completion. Not an error and not
    /// a failure; any partial file has been removed.
    Cancelled,
}

impl DownloadOutcome {
    /// Whether the file landed on disk.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// How a single streaming attempt ended (error cases are `Err`).
enum StreamStatus {
    Done,
    Cancelled,
}

/// Downloads media files with bounded retries.
///
/// Cheap to clone (the inner `reqwest::Client` is reference-counted);
/// the scheduler hands one clone to each worker task.
#[derive(Debug, Clone)]
pub struct MediaDownloader {
    client: Client,
    policy: RetryPolicy,
}

impl Default for MediaDownloader {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl MediaDownloader {
    /// Creates a downloader with the given retry policy.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(policy: RetryPolicy) -> Self {
        let client = Client::builder()
            .user_agent(user_agent::default_user_agent())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client, policy }
    }

    /// The retry policy in effect.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Downloads `url` to `save_path`, retrying transient failures.
    ///
    /// Cancellation is checked before every attempt, between body chunks,
    /// and once per second while waiting between attempts. A permanent
    /// failure (404, other 4xx, local IO error) uses exactly one attempt.
    pub async fn download(
        &self,
        url: &str,
        save_path: &Path,
        cancel: &CancellationToken,
    ) -> DownloadOutcome {
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return DownloadOutcome::Cancelled;
            }
            attempt += 1;

            match self.attempt(url, save_path, cancel).await {
                Ok(StreamStatus::Done) => return DownloadOutcome::Completed,
                Ok(StreamStatus::Cancelled) => return DownloadOutcome::Cancelled,
                Err(e) => {
                    let failure_type = classify_error(&e);
                    match self.policy.should_retry(failure_type, attempt) {
                        RetryDecision::Retry {
                            delay,
                            attempt: next_attempt,
                        } => {
                            warn!(
                                url,
                                attempt = next_attempt,
                                delay_ms = delay.as_millis(),
                                error = %e,
                                "retrying download"
                            );
                            if wait_with_cancel(delay, cancel).await {
                                return DownloadOutcome::Cancelled;
                            }
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            debug!(url, %reason, "not retrying download");
                            return DownloadOutcome::Failed(e);
                        }
                    }
                }
            }
        }
    }

    /// One request/stream cycle. Any partial file is removed on failure
    /// or cancellation before returning.
    async fn attempt(
        &self,
        url: &str,
        save_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<StreamStatus, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let file = File::create(save_path)
            .await
            .map_err(|e| DownloadError::io(save_path, e))?;

        let result = stream_to_file(file, response, url, save_path, cancel).await;

        match result {
            Ok(StreamStatus::Done) => Ok(StreamStatus::Done),
            Ok(StreamStatus::Cancelled) => {
                debug!(path = %save_path.display(), "removing partial file after cancellation");
                let _ = tokio::fs::remove_file(save_path).await;
                Ok(StreamStatus::Cancelled)
            }
            Err(e) => {
                debug!(path = %save_path.display(), "removing partial file after error");
                let _ = tokio::fs::remove_file(save_path).await;
                Err(e)
            }
        }
    }
}

/// Streams the response body to `file`, checking cancellation between
/// chunks. The file handle is consumed so it is closed before the caller
/// deletes a partial write.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    cancel: &CancellationToken,
) -> Result<StreamStatus, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        if cancel.is_cancelled() {
            return Ok(StreamStatus::Cancelled);
        }

        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(StreamStatus::Done)
}

/// Sleeps `delay` in one-second ticks, returning `true` as soon as the
/// token fires.
async fn wait_with_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    let mut remaining = delay;
    while remaining > Duration::ZERO {
        let tick = remaining.min(RETRY_WAIT_TICK);
        tokio::select! {
            () = cancel.cancelled() => return true,
            () = tokio::time::sleep(tick) => {}
        }
        remaining = remaining.saturating_sub(tick);
    }
    cancel.is_cancelled()
}
