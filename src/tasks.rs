//! Turns grouped posts into a flat download task list plus per-group
//! manifests.
//!
//! Every media file in a group gets a deterministic sequential filename
//! assigned here, before any download starts, so the on-disk layout and
//! the manifest never depend on download completion order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use url::Url;

use crate::api::Post;
use crate::filename::{extension_from_api_path, padding_width, sanitize_name};
use crate::sink::UiSink;

/// Per-group mapping file from sequential names back to originals.
pub const MANIFEST_FILENAME: &str = "_manifest.txt";

/// First line of every manifest.
const MANIFEST_HEADER: &str = "# Mapping: Sequential Filename : Original Filename (PostID: ...)";

/// One unit of download work, consumed exactly once by the scheduler.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    /// Fully resolved media URL.
    pub url: String,
    /// Preassigned destination path.
    pub save_path: PathBuf,
    /// Folder name of the owning group, for per-group events.
    pub group_name: String,
    /// Human-readable identifier used in log lines.
    pub display_id: String,
}

/// What a front end needs to show one group: name, folder, item count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub name: String,
    pub path: PathBuf,
    pub item_count: usize,
}

/// Errors that abort task preparation.
///
/// Only directory creation is fatal; a manifest that cannot be written
/// is logged and skipped, since the downloads themselves can still
/// proceed.
#[derive(Debug, Error)]
pub enum PrepareError {
    /// An output directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Prepares download tasks and writes one manifest per group.
///
/// Layout: `output_root/<sanitized service_creatorId>/<group>/<NNNN>.<ext>`.
/// Within a group, every post's main file is enumerated before its
/// attachments, in post order; the sequence number is 1-based across the
/// whole group and zero-padded wide enough for the group's item count
/// (minimum four digits).
///
/// Media refs whose API path cannot be resolved against `media_origin`
/// are malformed; they are logged and skipped, and the run continues.
///
/// # Errors
///
/// Returns [`PrepareError::CreateDir`] when an output directory cannot
/// be created.
pub async fn prepare_tasks(
    groups: &BTreeMap<String, Vec<Post>>,
    output_root: &Path,
    service: &str,
    creator_id: &str,
    media_origin: &Url,
    sink: &dyn UiSink,
) -> Result<(Vec<DownloadTask>, Vec<GroupSummary>), PrepareError> {
    let creator_folder = sanitize_name(&format!("{service}_{creator_id}"));
    let base_dir = output_root.join(creator_folder);
    fs::create_dir_all(&base_dir)
        .await
        .map_err(|e| PrepareError::CreateDir {
            path: base_dir.clone(),
            source: e,
        })?;
    sink.log(&format!("Creator directory: {}", base_dir.display()));

    let mut all_tasks: Vec<DownloadTask> = Vec::new();
    let mut summaries: Vec<GroupSummary> = Vec::new();

    // BTreeMap iteration gives a stable alphabetical processing order
    for (group_name, posts) in groups {
        let group_dir = base_dir.join(group_name);
        fs::create_dir_all(&group_dir)
            .await
            .map_err(|e| PrepareError::CreateDir {
                path: group_dir.clone(),
                source: e,
            })?;

        let items = collect_group_media(posts, media_origin, sink);
        if items.is_empty() {
            continue;
        }

        let width = padding_width(items.len());
        summaries.push(GroupSummary {
            name: group_name.clone(),
            path: group_dir.clone(),
            item_count: items.len(),
        });

        let mut manifest_lines: Vec<String> = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let seq = index + 1;
            let extension = extension_from_api_path(&item.api_path);
            let filename = format!("{seq:0width$}{extension}");
            let save_path = group_dir.join(&filename);
            let original = sanitize_name(&item.original_name);

            manifest_lines.push(format!(
                "{filename} : {original} (PostID: {})",
                item.post_id
            ));
            all_tasks.push(DownloadTask {
                url: item.url.clone(),
                save_path,
                group_name: group_name.clone(),
                display_id: format!(
                    "'{filename}' (group: '{group_name}', original: '{original}', post: {})",
                    item.post_id
                ),
            });
        }

        // Manifest lands on disk before any download for the group starts
        let manifest_path = group_dir.join(MANIFEST_FILENAME);
        let content = format!(
            "{MANIFEST_HEADER}\n{}\n{}",
            "-".repeat(60),
            manifest_lines.join("\n")
        );
        match fs::write(&manifest_path, content).await {
            Ok(()) => {
                debug!(group = %group_name, path = %manifest_path.display(), "manifest written");
                sink.log(&format!("Manifest written for '{group_name}'."));
            }
            Err(e) => {
                warn!(group = %group_name, error = %e, "could not write manifest");
                sink.log(&format!(
                    "ERROR: could not write manifest for group '{group_name}': {e}"
                ));
            }
        }
    }

    Ok((all_tasks, summaries))
}

/// One media file within a group, before sequence assignment.
struct GroupMediaItem {
    url: String,
    original_name: String,
    post_id: String,
    api_path: String,
}

/// Flattens a group's posts into media items: main file first, then
/// attachments, preserving post order.
fn collect_group_media(posts: &[Post], media_origin: &Url, sink: &dyn UiSink) -> Vec<GroupMediaItem> {
    let mut items = Vec::new();
    for post in posts {
        let refs = post
            .file
            .iter()
            .chain(post.attachments.iter());
        for media in refs {
            match media_origin.join(&media.path) {
                Ok(url) => items.push(GroupMediaItem {
                    url: url.to_string(),
                    original_name: media.name.clone(),
                    post_id: post.id.clone(),
                    api_path: media.path.clone(),
                }),
                Err(_) => {
                    warn!(post = %post.id, path = %media.path, "unresolvable media path, skipping");
                    sink.log(&format!(
                        "Skipping malformed media path '{}' (post {}).",
                        media.path, post.id
                    ));
                }
            }
        }
    }
    items
}
