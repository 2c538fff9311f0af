//! Paginated feed client for Kemono-style archive APIs.
//!
//! The feed endpoint is `{origin}/api/v1/{service}/user/{creator}?o={offset}`
//! and serves at most [`PAGE_SIZE`] posts per page. The fetch loop is
//! strictly sequential (one in-flight request) with a polite fixed delay
//! between pages, and fail-fast: any HTTP or network error aborts the
//! whole fetch with nothing returned.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::error::FetchError;
use super::post::{Post, RawPost};
use crate::sink::{FETCH_PHASE_SPAN, UiSink};
use crate::user_agent;

/// Posts per feed page; a shorter page terminates the loop.
pub const PAGE_SIZE: usize = 50;

/// Fixed delay between page requests, to avoid hammering the archive.
pub const PAGE_DELAY: Duration = Duration::from_millis(600);

/// Connect timeout for feed requests.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for feed requests (pages are small JSON bodies).
const READ_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the paginated post feed.
///
/// Create once per run and reuse; the underlying `reqwest::Client` pools
/// connections.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    origin: Url,
    page_delay: Duration,
}

impl ApiClient {
    /// Creates a client for the archive at `base_url` (e.g.
    /// `https://kemono.su`). Only the URL's origin is kept; the API path
    /// is appended per request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidBaseUrl`] when `base_url` does not
    /// parse as an absolute http(s) URL.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[allow(clippy::expect_used)]
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(base_url).map_err(|_| FetchError::InvalidBaseUrl {
            url: base_url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(FetchError::InvalidBaseUrl {
                url: base_url.to_string(),
            });
        }
        let origin = Url::parse(&parsed.origin().ascii_serialization()).map_err(|_| {
            FetchError::InvalidBaseUrl {
                url: base_url.to_string(),
            }
        })?;

        let client = Client::builder()
            .user_agent(user_agent::default_user_agent())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");

        Ok(Self {
            client,
            origin,
            page_delay: PAGE_DELAY,
        })
    }

    /// Overrides the inter-page delay (tests use `Duration::ZERO`).
    #[must_use]
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// The archive origin media paths are resolved against.
    #[must_use]
    pub fn media_origin(&self) -> &Url {
        &self.origin
    }

    /// Fetches every post for `service`/`creator_id`, page by page.
    ///
    /// Reports approximate progress on the overall `[0, 50]` scale: while
    /// pages come back full the estimate assumes one more page; the first
    /// short page fixes the total. Cancellation is checked before each
    /// page request and interrupts the inter-page delay.
    ///
    /// # Errors
    ///
    /// - [`FetchError::NotFound`] for a 404 on the feed
    /// - [`FetchError::HttpStatus`] / [`FetchError::Network`] /
    ///   [`FetchError::Schema`] abort the fetch with nothing returned
    /// - [`FetchError::Cancelled`] when the token fires first
    pub async fn fetch_all_posts(
        &self,
        service: &str,
        creator_id: &str,
        cancel: &CancellationToken,
        sink: &dyn UiSink,
    ) -> Result<Vec<Post>, FetchError> {
        let mut all_posts: Vec<Post> = Vec::new();
        let mut offset = 0usize;
        let mut page_num = 1u32;
        let mut estimated_total: Option<usize> = None;
        let feed_url = format!("{}api/v1/{service}/user/{creator_id}", self.origin);

        loop {
            if cancel.is_cancelled() {
                sink.log("Run cancelled while fetching posts.");
                return Err(FetchError::Cancelled);
            }

            let page_url = format!("{feed_url}?o={offset}");
            sink.log(&format!("Fetching page {page_num}: {page_url}"));
            debug!(page = page_num, offset, "requesting feed page");

            let page = self
                .fetch_page(&feed_url, &page_url, offset, service, creator_id)
                .await?;

            if page.is_empty() {
                sink.log("No more posts found.");
                break;
            }

            let accumulated = all_posts.len() + page.len();
            if estimated_total.is_none() && page.len() == PAGE_SIZE {
                // Guess one more full page until proven otherwise
                estimated_total = Some(accumulated + PAGE_SIZE);
            } else if estimated_total.is_none() || page.len() < PAGE_SIZE {
                estimated_total = Some(accumulated);
            }
            if let Some(total) = estimated_total.filter(|t| *t > 0) {
                let overall = (accumulated * usize::from(FETCH_PHASE_SPAN) / total)
                    .min(usize::from(FETCH_PHASE_SPAN));
                #[allow(clippy::cast_possible_truncation)]
                sink.progress(overall as u8, 0, 0, 0);
            }

            let short_page = page.len() < PAGE_SIZE;
            sink.log(&format!(
                "Received {} posts (accumulated: {accumulated}).",
                page.len()
            ));
            all_posts.extend(page);

            if short_page {
                break;
            }

            offset += PAGE_SIZE;
            page_num += 1;

            tokio::select! {
                () = cancel.cancelled() => {
                    sink.log("Run cancelled while fetching posts.");
                    return Err(FetchError::Cancelled);
                }
                () = tokio::time::sleep(self.page_delay) => {}
            }
        }

        info!(posts = all_posts.len(), "post retrieval complete");
        sink.log(&format!(
            "Post retrieval complete: {} posts.",
            all_posts.len()
        ));
        Ok(all_posts)
    }

    /// Fetches and decodes one feed page.
    async fn fetch_page(
        &self,
        feed_url: &str,
        page_url: &str,
        offset: usize,
        service: &str,
        creator_id: &str,
    ) -> Result<Vec<Post>, FetchError> {
        let response = self
            .client
            .get(feed_url)
            .query(&[("o", offset)])
            .send()
            .await
            .map_err(|e| FetchError::network(page_url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(service, creator_id, "feed returned 404");
            return Err(FetchError::NotFound {
                service: service.to_string(),
                creator_id: creator_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::http_status(page_url, status.as_u16()));
        }

        let raw: Vec<RawPost> = response.json().await.map_err(|e| {
            if e.is_decode() {
                FetchError::Schema {
                    url: page_url.to_string(),
                    source: e,
                }
            } else {
                FetchError::network(page_url, e)
            }
        })?;

        Ok(raw.into_iter().map(Post::from).collect())
    }
}
