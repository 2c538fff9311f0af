//! Run orchestration: fetch, group, prepare, download, summarize.
//!
//! One [`Orchestrator::run`] call is one run: it owns the posts for the
//! duration, sequences the phases, and translates internal state into
//! sink events. Per-task failures never abort a run; fetch-phase
//! failures do, since there is nothing to act on.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{ApiClient, FetchError};
use crate::download::MediaDownloader;
use crate::group::group_posts;
use crate::scheduler::{RunCounters, Scheduler};
use crate::sink::{DOWNLOAD_PHASE_START, FETCH_PHASE_SPAN, UiSink};
use crate::tasks::prepare_tasks;

/// What to fetch and where to put it.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Service segment of the feed (e.g. `patreon`).
    pub service: String,
    /// Creator id within the service.
    pub creator_id: String,
    /// Root directory for the creator's output tree.
    pub output_dir: PathBuf,
}

/// Terminal state of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// True only when the run was not cancelled and nothing failed.
    pub success: bool,
    /// Whether cancellation was observed.
    pub cancelled: bool,
    /// Final counters (all zero when the run ended before downloads).
    pub counters: RunCounters,
    /// Human-readable closing message, also emitted via the sink.
    pub summary: String,
}

/// Sequences one fetch-group-prepare-download run.
#[derive(Debug)]
pub struct Orchestrator {
    api: ApiClient,
    downloader: MediaDownloader,
    scheduler: Scheduler,
}

impl Orchestrator {
    /// Assembles an orchestrator from its three collaborators.
    #[must_use]
    pub fn new(api: ApiClient, downloader: MediaDownloader, scheduler: Scheduler) -> Self {
        Self {
            api,
            downloader,
            scheduler,
        }
    }

    /// Executes a full run, emitting progress on `[0, 100]`: fetch fills
    /// `[0, 50]`, grouping and preparation end at 60, downloads fill
    /// `[60, 100]`.
    pub async fn run(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
        sink: &dyn UiSink,
    ) -> RunReport {
        info!(
            service = %request.service,
            creator = %request.creator_id,
            "starting run"
        );
        sink.log(&format!(
            "Starting run for {}/{}...",
            request.service, request.creator_id
        ));
        sink.progress(0, 0, 0, 0);

        // Phase 1: fetch
        sink.log("Phase 1: fetching post list...");
        let posts = match self
            .api
            .fetch_all_posts(&request.service, &request.creator_id, cancel, sink)
            .await
        {
            Ok(posts) => posts,
            Err(FetchError::Cancelled) => {
                return finish(sink, false, true, "Run cancelled while fetching posts.");
            }
            Err(e @ FetchError::NotFound { .. }) => {
                warn!(error = %e, "creator not found");
                return finish(sink, false, false, &e.to_string());
            }
            Err(e) => {
                warn!(error = %e, "fetch phase failed");
                return finish(sink, false, false, &format!("Fetching posts failed: {e}"));
            }
        };

        if posts.is_empty() {
            return finish(
                sink,
                false,
                false,
                &format!(
                    "No posts found for {}/{}.",
                    request.service, request.creator_id
                ),
            );
        }
        sink.log(&format!("Phase 1 complete: {} posts retrieved.", posts.len()));
        sink.progress(FETCH_PHASE_SPAN, 0, 0, 0);

        // Phase 2: group, prepare tasks and manifests
        sink.log("Phase 2: grouping posts and preparing tasks...");
        let groups = group_posts(&posts);
        if groups.is_empty() {
            return finish(sink, true, false, "Completed. No posts with usable media.");
        }

        let (tasks, summaries) = match prepare_tasks(
            &groups,
            &request.output_dir,
            &request.service,
            &request.creator_id,
            self.api.media_origin(),
            sink,
        )
        .await
        {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "task preparation failed");
                return finish(sink, false, false, &format!("Preparing output failed: {e}"));
            }
        };

        sink.groups_ready(&summaries);
        if tasks.is_empty() {
            return finish(sink, true, false, "Completed. Nothing new to download.");
        }

        let total = tasks.len();
        sink.log(&format!(
            "Phase 2 complete: {} groups ready, {} files to process.",
            summaries.len(),
            total
        ));
        sink.progress(DOWNLOAD_PHASE_START, 0, 0, total);

        // Phase 3: concurrent downloads
        sink.log(&format!(
            "Phase 3: downloading (up to {} in parallel)...",
            self.scheduler.concurrency()
        ));
        let counters = self
            .scheduler
            .run_all(tasks, &self.downloader, cancel, sink)
            .await;
        sink.log("Phase 3 complete.");

        let cancelled = cancel.is_cancelled();
        if !cancelled && counters.processed >= total {
            sink.progress(100, 100, counters.processed, total);
        }

        let summary = summarize(&counters);
        let message = if cancelled {
            format!("Run cancelled. {summary}")
        } else {
            format!("Run complete. {summary}")
        };
        let success = !cancelled && counters.failed == 0;

        sink.log(&message);
        sink.finished(success, &message);
        info!(success, cancelled, "run finished");

        RunReport {
            success,
            cancelled,
            counters,
            summary: message,
        }
    }
}

/// Builds an early-exit report, emitting the closing events.
fn finish(sink: &dyn UiSink, success: bool, cancelled: bool, message: &str) -> RunReport {
    sink.log(message);
    sink.finished(success, message);
    info!(success, cancelled, "run finished early");
    RunReport {
        success,
        cancelled,
        counters: RunCounters::default(),
        summary: message.to_string(),
    }
}

/// Renders counters into the closing summary sentence.
fn summarize(counters: &RunCounters) -> String {
    let mut parts = vec![format!("{} downloaded", counters.downloaded)];
    if counters.skipped_exists > 0 {
        parts.push(format!("{} skipped (already existed)", counters.skipped_exists));
    }
    if counters.skipped_duplicate_url > 0 {
        parts.push(format!(
            "{} skipped (duplicate URL)",
            counters.skipped_duplicate_url
        ));
    }
    if counters.failed > 0 {
        parts.push(format!("{} failed (after retries)", counters.failed));
    }
    format!("Summary: {}.", parts.join(", "))
}
