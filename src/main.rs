//! CLI entry point for feedgrab.

use anyhow::{Context, Result};
use clap::Parser;
use feedgrab::{
    ApiClient, MediaDownloader, Orchestrator, RetryPolicy, RunRequest, Scheduler,
    download::DEFAULT_RETRY_DELAY,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;
mod console;

use cli::Args;
use console::ConsoleSink;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let api = ApiClient::new(&args.base_url)
        .with_context(|| format!("invalid base URL '{}'", args.base_url))?;
    let downloader = MediaDownloader::new(RetryPolicy::new(
        u32::from(args.max_retries),
        DEFAULT_RETRY_DELAY,
    ));
    let scheduler = Scheduler::new(usize::from(args.concurrency))?;
    let orchestrator = Orchestrator::new(api, downloader, scheduler);

    let request = RunRequest {
        service: args.service.clone(),
        creator_id: args.creator_id.clone(),
        output_dir: args.output.clone(),
    };

    // Ctrl-C requests cooperative cancellation; the run winds down and
    // reports a cancelled summary instead of dying mid-write
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested (Ctrl-C), finishing in-flight work...");
            signal_token.cancel();
        }
    });

    let sink = ConsoleSink::new(args.quiet);
    let report = orchestrator.run(&request, &cancel, &sink).await;

    info!(
        downloaded = report.counters.downloaded,
        skipped_exists = report.counters.skipped_exists,
        skipped_duplicate = report.counters.skipped_duplicate_url,
        failed = report.counters.failed,
        "run finished"
    );

    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}
