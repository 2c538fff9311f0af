//! Error types for the paginated feed fetch.

use thiserror::Error;

/// Errors that can occur while fetching a creator's post feed.
///
/// The fetch loop is fail-fast: any error aborts the run with nothing
/// returned to the caller. Cancellation is modeled as its own variant so
/// callers can tell a cancelled fetch from a failed one.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The creator/service pair does not exist (HTTP 404 on the feed).
    #[error("creator '{service}/{creator_id}' not found (HTTP 404)")]
    NotFound {
        /// Service segment of the feed URL.
        service: String,
        /// Creator id segment of the feed URL.
        creator_id: String,
    },

    /// Non-404 HTTP error response from the feed endpoint.
    #[error("HTTP {status} fetching posts from {url}")]
    HttpStatus {
        /// The page URL that returned the error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level error (DNS, connection refused, timeout, TLS).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The page URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The page body was not the expected JSON array of posts.
    #[error("malformed post page at {url}: {source}")]
    Schema {
        /// The page URL whose body failed to decode.
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The configured API base URL could not be parsed.
    #[error("invalid API base URL: {url}")]
    InvalidBaseUrl {
        /// The offending URL string.
        url: String,
    },

    /// The run was cancelled before or during the fetch.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }
}
