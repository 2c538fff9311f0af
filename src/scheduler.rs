//! Concurrent download scheduler with skip checks and run counters.
//!
//! The coordinating loop owns all shared state: the seen-URL set and the
//! run counters are touched only here, never inside worker tasks. Workers
//! receive a task, download it, and report a [`DownloadOutcome`] back over
//! a channel for the loop to fold in. Concurrency is bounded by a
//! semaphore whose permits are acquired before spawning.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::download::{DownloadOutcome, MediaDownloader};
use crate::sink::{DOWNLOAD_PHASE_SPAN, DOWNLOAD_PHASE_START, UiSink};
use crate::tasks::DownloadTask;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default number of parallel downloads.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Error type for scheduler construction.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Counters for one run, owned by the coordinating loop.
///
/// Terminal-state identity: `processed` equals the sum of the four
/// outcome counters plus any tasks dropped after cancellation (dropped
/// tasks advance `processed` only).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunCounters {
    /// Files written to disk.
    pub downloaded: usize,
    /// Tasks skipped because their URL was already handled this run.
    pub skipped_duplicate_url: usize,
    /// Tasks skipped because the destination file already existed.
    pub skipped_exists: usize,
    /// Dispatched tasks that neither succeeded nor were cancelled. This
    /// includes permanent first-attempt failures such as 404.
    pub failed: usize,
    /// Tasks that reached a terminal state (including dropped ones).
    pub processed: usize,
}

impl RunCounters {
    /// Sum of the outcome counters (excludes dropped tasks).
    #[must_use]
    pub fn accounted(&self) -> usize {
        self.downloaded + self.skipped_duplicate_url + self.skipped_exists + self.failed
    }
}

/// Bounded-parallelism download scheduler.
#[derive(Debug)]
pub struct Scheduler {
    concurrency: usize,
}

/// A worker's report back to the coordinating loop.
struct TaskCompletion {
    task: DownloadTask,
    outcome: DownloadOutcome,
}

impl Scheduler {
    /// Creates a scheduler with the given parallelism bound.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConcurrency`] if the value is
    /// outside `1..=100`.
    pub fn new(concurrency: usize) -> Result<Self, SchedulerError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(SchedulerError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self { concurrency })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs every task to a terminal state and returns the counters.
    ///
    /// Before dispatch each task passes two skip checks, in order:
    /// a URL already handled this run is skipped as a duplicate, and an
    /// already-existing destination file is skipped (marking its URL as
    /// handled). URLs are also marked at dispatch time, so two tasks
    /// sharing a URL never download it twice even when the first is
    /// still in flight.
    ///
    /// After cancellation no new tasks are dispatched; undispatched
    /// tasks advance `processed` (for progress) without touching the
    /// outcome counters, and in-flight tasks report their own outcome.
    pub async fn run_all(
        &self,
        tasks: Vec<DownloadTask>,
        downloader: &MediaDownloader,
        cancel: &CancellationToken,
        sink: &dyn UiSink,
    ) -> RunCounters {
        let total = tasks.len();
        let mut counters = RunCounters::default();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskCompletion>();

        info!(total, concurrency = self.concurrency, "starting download phase");

        for task in tasks {
            // Fold whatever has already completed so logs and progress
            // keep pace with the workers
            while let Ok(completion) = rx.try_recv() {
                fold_outcome(&mut counters, completion, sink, total);
            }

            if cancel.is_cancelled() {
                // Dropped without dispatch: progress only
                debug!(task = %task.display_id, "dropping task after cancellation");
                counters.processed += 1;
                emit_progress(sink, counters.processed, total);
                continue;
            }

            if seen_urls.contains(&task.url) {
                counters.skipped_duplicate_url += 1;
                counters.processed += 1;
                sink.log(&format!("SKIPPED (duplicate URL this run): {}", task.display_id));
                sink.item_processed(&task.group_name, false, true, false);
                emit_progress(sink, counters.processed, total);
                continue;
            }

            if tokio::fs::try_exists(&task.save_path).await.unwrap_or(false) {
                seen_urls.insert(task.url.clone());
                counters.skipped_exists += 1;
                counters.processed += 1;
                sink.log(&format!("SKIPPED (already exists): {}", task.display_id));
                sink.item_processed(&task.group_name, false, true, false);
                emit_progress(sink, counters.processed, total);
                continue;
            }

            // Marked at dispatch so an identical URL later in the list is
            // deduplicated even while this one is still in flight
            seen_urls.insert(task.url.clone());

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                warn!("download semaphore closed unexpectedly");
                break;
            };
            let tx = tx.clone();
            let worker_downloader = downloader.clone();
            let worker_cancel = cancel.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let outcome = worker_downloader
                    .download(&task.url, &task.save_path, &worker_cancel)
                    .await;
                let _ = tx.send(TaskCompletion { task, outcome });
            });
        }

        // All dispatching done; drain remaining completions
        drop(tx);
        while let Some(completion) = rx.recv().await {
            fold_outcome(&mut counters, completion, sink, total);
        }

        info!(
            downloaded = counters.downloaded,
            skipped_duplicate = counters.skipped_duplicate_url,
            skipped_exists = counters.skipped_exists,
            failed = counters.failed,
            processed = counters.processed,
            "download phase complete"
        );
        counters
    }
}

/// Folds one worker report into the counters and emits events.
fn fold_outcome(
    counters: &mut RunCounters,
    completion: TaskCompletion,
    sink: &dyn UiSink,
    total: usize,
) {
    counters.processed += 1;
    let task = completion.task;
    match completion.outcome {
        DownloadOutcome::Completed => {
            counters.downloaded += 1;
            sink.log(&format!("OK: {}", task.display_id));
            sink.item_processed(&task.group_name, true, false, false);
        }
        DownloadOutcome::Cancelled => {
            sink.log(&format!("CANCELLED: {}", task.display_id));
            sink.item_processed(&task.group_name, false, false, false);
        }
        DownloadOutcome::Failed(e) => {
            counters.failed += 1;
            warn!(task = %task.display_id, error = %e, "download failed");
            sink.log(&format!("FAILED: {} ({e})", task.display_id));
            sink.item_processed(&task.group_name, false, false, true);
        }
    }
    emit_progress(sink, counters.processed, total);
}

/// Maps processed/total onto the overall `[60, 100]` range and the
/// download-phase `[0, 100]` range.
#[allow(clippy::cast_possible_truncation)]
fn emit_progress(sink: &dyn UiSink, processed: usize, total: usize) {
    if total == 0 {
        return;
    }
    let download_phase = (processed * 100 / total).min(100);
    let overall = usize::from(DOWNLOAD_PHASE_START)
        + (processed * usize::from(DOWNLOAD_PHASE_SPAN) / total);
    sink.progress(overall.min(100) as u8, download_phase as u8, processed, total);
}
