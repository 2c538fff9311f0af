//! End-to-end orchestrator tests: mock feed + mock media server in,
//! folder tree + manifests + counters out.

mod support;

use std::time::Duration;

use feedgrab::{
    ApiClient, MediaDownloader, Orchestrator, RetryPolicy, RunRequest, Scheduler,
};
use serde_json::{Value, json};
use support::{Event, RecordingSink, feed_post};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_PATH: &str = "/api/v1/testsvc/user/creator1";

fn orchestrator_for(server: &MockServer, concurrency: usize) -> Orchestrator {
    let api = ApiClient::new(&server.uri())
        .unwrap()
        .with_page_delay(Duration::ZERO);
    let downloader = MediaDownloader::new(RetryPolicy::new(0, Duration::ZERO));
    Orchestrator::new(api, downloader, Scheduler::new(concurrency).unwrap())
}

fn request_for(tmp: &TempDir) -> RunRequest {
    RunRequest {
        service: "testsvc".to_string(),
        creator_id: "creator1".to_string(),
        output_dir: tmp.path().to_path_buf(),
    }
}

async fn mount_feed(server: &MockServer, posts: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts))
        .mount(server)
        .await;
}

async fn mount_media(server: &MockServer, media_path: &str, body: &[u8], expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(media_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(expected_hits)
        .mount(server)
        .await;
}

/// A small feed: one three-post series (first post also has an
/// attachment) plus one standalone post.
fn series_feed() -> Vec<Value> {
    vec![
        json!({
            "id": "p1",
            "title": "Beach Day part 1",
            "published": "2023-01-01",
            "file": {"path": "/data/beach1.jpg", "name": "b1.jpg"},
            "attachments": [{"path": "/data/beach1b.png", "name": "b1b.png"}]
        }),
        feed_post("p2", "Beach Day part 2", "2023-01-02", "/data/beach2.jpg"),
        feed_post("p3", "Beach Day #3", "2023-01-03", "/data/beach3.jpg"),
        feed_post("p4", "Retrato único", "2023-03-01", "/data/solo.jpg"),
        json!({"id": "p5", "title": "Text only, no media", "published": "2023-04-01"}),
    ]
}

async fn mount_series_media(server: &MockServer, hits_each: u64) {
    mount_media(server, "/data/beach1.jpg", b"one", hits_each).await;
    mount_media(server, "/data/beach1b.png", b"one-b", hits_each).await;
    mount_media(server, "/data/beach2.jpg", b"two", hits_each).await;
    mount_media(server, "/data/beach3.jpg", b"three", hits_each).await;
    mount_media(server, "/data/solo.jpg", b"solo", hits_each).await;
}

#[tokio::test]
async fn test_full_run_produces_grouped_tree_and_manifests() {
    let server = MockServer::start().await;
    mount_feed(&server, series_feed()).await;
    mount_series_media(&server, 1).await;

    let tmp = TempDir::new().unwrap();
    let sink = RecordingSink::default();
    let report = orchestrator_for(&server, 3)
        .run(&request_for(&tmp), &CancellationToken::new(), &sink)
        .await;

    assert!(report.success, "summary: {}", report.summary);
    assert!(!report.cancelled);
    assert_eq!(report.counters.downloaded, 5);
    assert_eq!(report.counters.processed, 5);
    assert_eq!(report.counters.accounted(), report.counters.processed);

    // Series folder: post order by published, main file before attachment
    let beach = tmp.path().join("testsvc_creator1").join("Beach_Day");
    assert_eq!(std::fs::read(beach.join("0001.jpg")).unwrap(), b"one");
    assert_eq!(std::fs::read(beach.join("0002.png")).unwrap(), b"one-b");
    assert_eq!(std::fs::read(beach.join("0003.jpg")).unwrap(), b"two");
    assert_eq!(std::fs::read(beach.join("0004.jpg")).unwrap(), b"three");

    let manifest = std::fs::read_to_string(beach.join("_manifest.txt")).unwrap();
    assert!(manifest.contains("0001.jpg : b1.jpg (PostID: p1)"), "{manifest}");
    assert!(manifest.contains("0002.png : b1b.png (PostID: p1)"), "{manifest}");
    assert!(manifest.contains("0004.jpg : p3.jpg (PostID: p3)"), "{manifest}");

    // Standalone post gets its own folder
    let solo = tmp.path().join("testsvc_creator1").join("Retrato_unico");
    assert_eq!(std::fs::read(solo.join("0001.jpg")).unwrap(), b"solo");

    // Groups-ready event carries name/path/count per group, sorted
    let groups = sink
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::GroupsReady(groups) => Some(groups),
            _ => None,
        })
        .expect("groups_ready must fire");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].name, "Beach_Day");
    assert_eq!(groups[0].item_count, 4);
    assert_eq!(groups[1].name, "Retrato_unico");
    assert_eq!(groups[1].item_count, 1);

    // Terminal events: progress reaches 100 and finished reports success
    assert_eq!(sink.overall_progress_values().last(), Some(&100));
    let (success, summary) = sink.finished().expect("finished must fire");
    assert!(success);
    assert!(summary.contains("5 downloaded"), "{summary}");
}

#[tokio::test]
async fn test_duplicate_media_url_across_groups_is_skipped() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        vec![
            feed_post("p1", "Otra Cosa", "2023-01-01", "/data/shared.jpg"),
            feed_post("p2", "Solo Uno", "2023-01-02", "/data/shared.jpg"),
        ],
    )
    .await;
    // The shared URL must be fetched exactly once
    mount_media(&server, "/data/shared.jpg", b"shared", 1).await;

    let tmp = TempDir::new().unwrap();
    let sink = RecordingSink::default();
    let report = orchestrator_for(&server, 2)
        .run(&request_for(&tmp), &CancellationToken::new(), &sink)
        .await;

    assert!(report.success);
    assert_eq!(report.counters.downloaded, 1);
    assert_eq!(report.counters.skipped_duplicate_url, 1);
    assert_eq!(report.counters.processed, 2);

    // Only the first task's folder received the file
    let creator_dir = tmp.path().join("testsvc_creator1");
    assert!(creator_dir.join("Otra_Cosa").join("0001.jpg").exists());
    assert!(!creator_dir.join("Solo_Uno").join("0001.jpg").exists());

    let skips: Vec<Event> = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::ItemProcessed { skipped: true, .. }))
        .collect();
    assert_eq!(skips.len(), 1);
}

#[tokio::test]
async fn test_second_run_skips_existing_files() {
    let server = MockServer::start().await;
    mount_feed(&server, series_feed()).await;
    // Each media URL is hit only by the first run
    mount_series_media(&server, 1).await;

    let tmp = TempDir::new().unwrap();

    let first = orchestrator_for(&server, 3)
        .run(&request_for(&tmp), &CancellationToken::new(), &RecordingSink::default())
        .await;
    assert_eq!(first.counters.downloaded, 5);

    let second = orchestrator_for(&server, 3)
        .run(&request_for(&tmp), &CancellationToken::new(), &RecordingSink::default())
        .await;

    assert!(second.success, "summary: {}", second.summary);
    assert_eq!(second.counters.downloaded, 0);
    assert_eq!(second.counters.skipped_exists, 5);
    assert_eq!(second.counters.processed, 5);
}

#[tokio::test]
async fn test_failed_media_download_marks_run_unsuccessful() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        vec![
            feed_post("p1", "Primera Foto", "2023-01-01", "/data/ok.jpg"),
            feed_post("p2", "Segunda Foto", "2023-01-02", "/data/missing.jpg"),
        ],
    )
    .await;
    mount_media(&server, "/data/ok.jpg", b"fine", 1).await;
    Mock::given(method("GET"))
        .and(path("/data/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let sink = RecordingSink::default();
    let report = orchestrator_for(&server, 2)
        .run(&request_for(&tmp), &CancellationToken::new(), &sink)
        .await;

    // A permanent first-attempt failure still counts as failed
    assert!(!report.success);
    assert!(!report.cancelled);
    assert_eq!(report.counters.downloaded, 1);
    assert_eq!(report.counters.failed, 1);

    let (success, summary) = sink.finished().unwrap();
    assert!(!success);
    assert!(summary.contains("1 failed (after retries)"), "{summary}");
}

#[tokio::test]
async fn test_cancelled_before_fetch_reports_cancelled_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(series_feed()))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let tmp = TempDir::new().unwrap();
    let sink = RecordingSink::default();
    let report = orchestrator_for(&server, 2)
        .run(&request_for(&tmp), &cancel, &sink)
        .await;

    assert!(!report.success);
    assert!(report.cancelled);
    let (success, summary) = sink.finished().unwrap();
    assert!(!success);
    assert!(summary.to_lowercase().contains("cancelled"), "{summary}");
    // Nothing was created
    assert!(std::fs::read_dir(tmp.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_zero_posts_is_a_failed_run() {
    let server = MockServer::start().await;
    mount_feed(&server, Vec::new()).await;

    let tmp = TempDir::new().unwrap();
    let sink = RecordingSink::default();
    let report = orchestrator_for(&server, 2)
        .run(&request_for(&tmp), &CancellationToken::new(), &sink)
        .await;

    assert!(!report.success);
    let (_, summary) = sink.finished().unwrap();
    assert!(summary.contains("No posts found"), "{summary}");
}

#[tokio::test]
async fn test_posts_without_usable_media_complete_cleanly() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        vec![
            json!({"id": "p1", "title": "Only words", "published": "2023-01-01"}),
            json!({"id": "p2", "title": "   ", "published": "2023-01-02",
                   "file": {"path": "/data/untitled.jpg", "name": "u.jpg"}}),
        ],
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let sink = RecordingSink::default();
    let report = orchestrator_for(&server, 2)
        .run(&request_for(&tmp), &CancellationToken::new(), &sink)
        .await;

    // Nothing to do is a clean completion, not a failure
    assert!(report.success);
    let (success, summary) = sink.finished().unwrap();
    assert!(success);
    assert!(summary.contains("No posts with usable media"), "{summary}");
}

#[tokio::test]
async fn test_creator_not_found_surfaces_distinct_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let sink = RecordingSink::default();
    let report = orchestrator_for(&server, 2)
        .run(&request_for(&tmp), &CancellationToken::new(), &sink)
        .await;

    assert!(!report.success);
    let (_, summary) = sink.finished().unwrap();
    assert!(summary.contains("not found"), "{summary}");
    assert!(summary.contains("testsvc/creator1"), "{summary}");
}
