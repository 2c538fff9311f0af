//! Shared test helpers: a recording sink and feed-page builders.

#![allow(dead_code)]

use std::sync::Mutex;

use feedgrab::{GroupSummary, UiSink};
use serde_json::{Value, json};

/// Everything a run can tell a front end, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Log(String),
    Progress {
        overall: u8,
        download_phase: u8,
        processed: usize,
        total: usize,
    },
    GroupsReady(Vec<GroupSummary>),
    ItemProcessed {
        group: String,
        succeeded: bool,
        skipped: bool,
        failed: bool,
    },
    Finished {
        success: bool,
        summary: String,
    },
}

/// Sink that records every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Log(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Option<(bool, String)> {
        self.events().into_iter().find_map(|e| match e {
            Event::Finished { success, summary } => Some((success, summary)),
            _ => None,
        })
    }

    pub fn overall_progress_values(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Progress { overall, .. } => Some(overall),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl UiSink for RecordingSink {
    fn log(&self, message: &str) {
        self.push(Event::Log(message.to_string()));
    }

    fn progress(&self, overall: u8, download_phase: u8, processed: usize, total: usize) {
        self.push(Event::Progress {
            overall,
            download_phase,
            processed,
            total,
        });
    }

    fn groups_ready(&self, groups: &[GroupSummary]) {
        self.push(Event::GroupsReady(groups.to_vec()));
    }

    fn item_processed(&self, group_name: &str, succeeded: bool, skipped: bool, failed: bool) {
        self.push(Event::ItemProcessed {
            group: group_name.to_string(),
            succeeded,
            skipped,
            failed,
        });
    }

    fn finished(&self, success: bool, summary: &str) {
        self.push(Event::Finished {
            success,
            summary: summary.to_string(),
        });
    }
}

/// Builds a feed post with a main file.
pub fn feed_post(id: &str, title: &str, published: &str, file_path: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "published": published,
        "file": {"path": file_path, "name": format!("{id}.jpg")},
        "attachments": []
    })
}

/// Builds `count` filler posts with distinct ids and media paths.
pub fn filler_posts(count: usize, id_offset: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let n = id_offset + i;
            feed_post(
                &format!("id{n}"),
                &format!("Filler Series part {n}"),
                &format!("2023-01-{:02}", (n % 28) + 1),
                &format!("/data/{n}.jpg"),
            )
        })
        .collect()
}
