//! Shared User-Agent string for API and media HTTP clients.
//!
//! Single source for project URL and UA format so feed and media traffic
//! stay consistent and easy to update (good citizenship; RFC 9308).

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/feedgrab/feedgrab";

/// Default User-Agent for all outbound requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("feedgrab/{version} (archive-fetch-tool; +{PROJECT_UA_URL})")
}
