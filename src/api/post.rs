//! Post and media-reference models decoded from the archive API.
//!
//! The remote schema is loose: every field may be missing, `null`, or an
//! empty object. Pages are decoded into the tolerant [`RawPost`] shape at
//! the fetch boundary, then converted to [`Post`], which downstream code
//! can rely on: media refs always carry a non-empty `path`.

use serde::Deserialize;

/// A single media reference (the post's main file or one attachment).
///
/// `path` is API-relative (e.g. `/data/ab/cd/hash.jpg`) and must be
/// resolved against the API origin before download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    /// API-relative path to the media resource.
    pub path: String,
    /// Original filename as reported by the API.
    pub name: String,
}

/// A creator post, validated from the raw API payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub title: String,
    /// Publication timestamp as the API reports it (ISO-8601 string in
    /// practice); missing values become the empty string, which sorts first.
    pub published: String,
    /// Main file, present only when the API gave it a usable path.
    pub file: Option<MediaRef>,
    /// Attachments with usable paths, original order preserved.
    pub attachments: Vec<MediaRef>,
}

impl Post {
    /// Whether this post references at least one downloadable media file.
    #[must_use]
    pub fn has_media(&self) -> bool {
        self.file.is_some() || !self.attachments.is_empty()
    }

    /// Whether the title contains anything beyond whitespace.
    #[must_use]
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Raw post as the API serves it: every field optional.
#[derive(Debug, Deserialize)]
pub(crate) struct RawPost {
    id: Option<String>,
    title: Option<String>,
    published: Option<String>,
    file: Option<RawMediaRef>,
    #[serde(default)]
    attachments: Option<Vec<RawMediaRef>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMediaRef {
    path: Option<String>,
    name: Option<String>,
}

impl RawMediaRef {
    /// Keeps the ref only when it points somewhere.
    fn validate(self) -> Option<MediaRef> {
        let path = self.path.filter(|p| !p.is_empty())?;
        let name = self.name.unwrap_or_else(|| "file".to_string());
        Some(MediaRef { path, name })
    }
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            title: raw.title.unwrap_or_default(),
            published: raw.published.unwrap_or_default(),
            file: raw.file.and_then(RawMediaRef::validate),
            attachments: raw
                .attachments
                .unwrap_or_default()
                .into_iter()
                .filter_map(RawMediaRef::validate)
                .collect(),
        }
    }
}
