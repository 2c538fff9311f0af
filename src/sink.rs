//! Event sink connecting the engine to whatever front end drives it.
//!
//! The engine never renders anything; it narrates a run through this
//! trait. The CLI binary implements it with tracing logs and an indicatif
//! bar, tests implement it with a recording stub.

use crate::tasks::GroupSummary;

/// Share of the overall progress scale consumed by the fetch phase.
pub const FETCH_PHASE_SPAN: u8 = 50;

/// Overall progress value at which the download phase begins; the range
/// `[0, 50]` belongs to fetch, `(50, 60)` to grouping and preparation.
pub const DOWNLOAD_PHASE_START: u8 = 60;

/// Share of the overall progress scale consumed by the download phase.
pub const DOWNLOAD_PHASE_SPAN: u8 = 40;

/// Receives log, progress, and completion events for one run.
///
/// Implementations must be cheap and non-blocking; events are emitted
/// from the coordinating loop, never from worker tasks.
pub trait UiSink: Send + Sync {
    /// A human-readable log line.
    fn log(&self, message: &str);

    /// Progress update: `overall` on `[0, 100]`, `download_phase` on
    /// `[0, 100]` within the download phase, plus processed/total task
    /// counts (zero until the download phase starts).
    fn progress(&self, overall: u8, download_phase: u8, processed: usize, total: usize);

    /// Groups have been materialized on disk; manifests are written.
    fn groups_ready(&self, groups: &[GroupSummary]);

    /// One task reached a terminal state. `skipped` covers both skip
    /// reasons; a cancelled task reports all three flags false.
    fn item_processed(
        &self,
        group_name: &str,
        succeeded: bool,
        skipped: bool,
        failed_after_retry: bool,
    );

    /// The run reached a terminal state.
    fn finished(&self, success: bool, summary: &str);
}

/// Sink that discards every event. Useful for tests and headless callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl UiSink for NullSink {
    fn log(&self, _message: &str) {}
    fn progress(&self, _overall: u8, _download_phase: u8, _processed: usize, _total: usize) {}
    fn groups_ready(&self, _groups: &[GroupSummary]) {}
    fn item_processed(
        &self,
        _group_name: &str,
        _succeeded: bool,
        _skipped: bool,
        _failed_after_retry: bool,
    ) {
    }
    fn finished(&self, _success: bool, _summary: &str) {}
}
