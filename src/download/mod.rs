//! Media download: streaming HTTP writes with retry and cancellation.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Fixed-delay retry for transient failures, single attempt for
//!   permanent ones
//! - Cooperative cancellation between chunks and between attempts
//! - Partial files are always cleaned up

mod client;
mod error;
mod retry;

pub use client::{DownloadOutcome, MediaDownloader};
pub use error::DownloadError;
pub use retry::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, FailureType, RetryDecision, RetryPolicy,
    classify_error,
};
