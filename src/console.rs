//! Terminal sink: tracing log lines plus an indicatif bar for downloads.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{error, info};

use feedgrab::{GroupSummary, UiSink};

/// Renders run events on the terminal.
///
/// Log lines go through tracing so they respect the verbosity filter;
/// the progress bar appears once the download phase starts and tracks
/// processed/total task counts.
pub(crate) struct ConsoleSink {
    bar: ProgressBar,
    quiet: bool,
}

impl ConsoleSink {
    pub(crate) fn new(quiet: bool) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar, quiet }
    }
}

impl UiSink for ConsoleSink {
    fn log(&self, message: &str) {
        // Suspend keeps the bar from clobbering log lines
        self.bar.suspend(|| info!("{message}"));
    }

    fn progress(&self, _overall: u8, _download_phase: u8, processed: usize, total: usize) {
        if self.quiet || total == 0 {
            return;
        }
        if self.bar.length() != Some(total as u64) {
            self.bar.set_length(total as u64);
            self.bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        self.bar.set_position(processed as u64);
    }

    fn groups_ready(&self, groups: &[GroupSummary]) {
        self.bar.suspend(|| {
            for group in groups {
                info!(
                    "Group '{}': {} files -> {}",
                    group.name,
                    group.item_count,
                    group.path.display()
                );
            }
        });
    }

    fn item_processed(
        &self,
        group_name: &str,
        _succeeded: bool,
        _skipped: bool,
        _failed_after_retry: bool,
    ) {
        if !self.quiet {
            self.bar.set_message(group_name.to_string());
        }
    }

    fn finished(&self, success: bool, summary: &str) {
        self.bar.finish_and_clear();
        if success {
            info!("{summary}");
        } else {
            error!("{summary}");
        }
    }
}
