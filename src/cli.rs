//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use feedgrab::{DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES};

/// Default archive origin.
pub const DEFAULT_BASE_URL: &str = "https://kemono.su";

/// Fetch a creator's post feed and download grouped media.
///
/// Feedgrab walks the creator's paginated feed, groups posts that belong
/// to the same titled series into one folder each, and downloads every
/// media file with sequential names plus a per-folder manifest.
#[derive(Parser, Debug)]
#[command(name = "feedgrab")]
#[command(author, version, about)]
pub struct Args {
    /// Service the creator posts on (e.g. patreon, fanbox)
    pub service: String,

    /// Creator id within the service
    pub creator_id: String,

    /// Root output directory
    #[arg(short = 'o', long, default_value = ".")]
    pub output: PathBuf,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Maximum retry attempts for transient download failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Archive origin to fetch from
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
