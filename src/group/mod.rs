//! Title-based grouping of posts into output folders.
//!
//! Posts whose titles differ only by a trailing part/volume/page marker
//! belong to the same series and share one folder. The algorithm strips
//! the marker, normalizes what remains for comparison, and groups posts
//! whose normalized base names agree - but only when the base name has
//! enough words to be distinctive. Everything else becomes a singleton
//! folder named after its own title.

mod suffix;

use std::collections::{BTreeMap, HashMap, HashSet};

use deunicode::deunicode;
use tracing::debug;

use crate::api::Post;
use crate::filename::{UNTITLED, sanitize_name};
use suffix::strip_trailing_suffix;

/// Minimum word count for a normalized base name to form a shared group.
///
/// One-word bases ("Sketch", "WIP") collide across unrelated posts, so
/// they stay singletons.
pub const MIN_WORDS_FOR_GROUP: usize = 2;

/// Partitions posts into folders keyed by sanitized folder name.
///
/// Only posts with at least one media reference and a non-blank title
/// participate; everything else is excluded entirely. Within each folder,
/// posts are sorted ascending by `published` (missing values sort first),
/// ties keeping input order. Folder-name collisions between independent
/// derivations merge their member lists, deduplicated by post id.
#[must_use]
pub fn group_posts(posts: &[Post]) -> BTreeMap<String, Vec<Post>> {
    struct Candidate<'a> {
        post: &'a Post,
        normalized: String,
        folder_basis: String,
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for post in posts {
        if !post.has_media() || !post.has_title() {
            continue;
        }
        let title = post.title.trim();
        let base = strip_trailing_suffix(title);
        // A title that was nothing but a suffix keeps its original form
        let folder_basis = if base.is_empty() {
            title.to_string()
        } else {
            base.clone()
        };
        candidates.push(Candidate {
            post,
            normalized: normalize_for_comparison(&base),
            folder_basis,
        });
    }

    if candidates.is_empty() {
        return BTreeMap::new();
    }

    // Bucket by normalized base name, first-seen order preserved
    let mut bucket_order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
    let mut singles: Vec<usize> = Vec::new();

    for (idx, candidate) in candidates.iter().enumerate() {
        let words = candidate.normalized.split_whitespace().count();
        if words >= MIN_WORDS_FOR_GROUP {
            let bucket = buckets.entry(candidate.normalized.clone()).or_default();
            if bucket.is_empty() {
                bucket_order.push(candidate.normalized.clone());
            }
            bucket.push(idx);
        } else {
            singles.push(idx);
        }
    }

    let mut groups: BTreeMap<String, Vec<Post>> = BTreeMap::new();
    let mut grouped_ids: HashSet<String> = HashSet::new();

    for normalized in &bucket_order {
        let Some(indices) = buckets.get(normalized) else {
            continue;
        };
        if indices.len() > 1 {
            // Folder named after the first member's base title
            let folder = sanitize_name(&candidates[indices[0]].folder_basis);
            debug!(%folder, members = indices.len(), "formed shared group");
            let entry = groups.entry(folder).or_default();
            for &idx in indices {
                let post = candidates[idx].post;
                if grouped_ids.insert(post.id.clone()) {
                    entry.push(post.clone());
                }
            }
        } else {
            // A normalized name seen once is a singleton after all
            singles.extend(indices);
        }
    }

    singles.sort_unstable();

    for idx in singles {
        let candidate = &candidates[idx];
        if grouped_ids.contains(&candidate.post.id) {
            continue;
        }
        let mut folder = sanitize_name(&candidate.folder_basis);
        if folder == UNTITLED {
            // Degenerate title: name the folder after the post instead
            folder = format!("post_{}", sanitize_name(&candidate.post.id));
        }
        grouped_ids.insert(candidate.post.id.clone());
        groups.entry(folder).or_default().push(candidate.post.clone());
    }

    for members in groups.values_mut() {
        members.sort_by(|a, b| a.published.cmp(&b.published));
    }

    groups
}

/// Normalizes a base title for comparison: ASCII transliteration,
/// lowercase, alphanumeric and spaces only, whitespace collapsed.
fn normalize_for_comparison(base: &str) -> String {
    let ascii = deunicode(base).to_lowercase();
    let kept: String = ascii
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
