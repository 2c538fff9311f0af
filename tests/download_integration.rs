//! Integration tests for the retrying media downloader.

use std::time::Duration;

use feedgrab::{DownloadError, DownloadOutcome, MediaDownloader, RetryPolicy};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader(max_retries: u32, delay: Duration) -> MediaDownloader {
    MediaDownloader::new(RetryPolicy::new(max_retries, delay))
}

#[tokio::test]
async fn test_download_writes_full_content() {
    let content = b"binary image bytes \x00\x01\x02 end";
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pic.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let save_path = tmp.path().join("0001.jpg");
    let outcome = downloader(0, Duration::ZERO)
        .download(
            &format!("{}/data/pic.jpg", server.uri()),
            &save_path,
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_success(), "got {outcome:?}");
    assert_eq!(std::fs::read(&save_path).unwrap(), content);
}

#[tokio::test]
async fn test_download_404_uses_exactly_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let save_path = tmp.path().join("gone.jpg");
    let outcome = downloader(3, Duration::ZERO)
        .download(
            &format!("{}/data/gone.jpg", server.uri()),
            &save_path,
            &CancellationToken::new(),
        )
        .await;

    assert!(
        matches!(
            outcome,
            DownloadOutcome::Failed(DownloadError::HttpStatus { status: 404, .. })
        ),
        "got {outcome:?}"
    );
    assert!(!save_path.exists(), "no file should remain after a 404");
}

#[tokio::test]
async fn test_download_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/forbidden.jpg"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let outcome = downloader(3, Duration::ZERO)
        .download(
            &format!("{}/data/forbidden.jpg", server.uri()),
            &tmp.path().join("f.jpg"),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Failed(DownloadError::HttpStatus { status: 403, .. })
    ));
}

#[tokio::test]
async fn test_download_retries_server_error_then_succeeds() {
    let server = MockServer::start().await;
    // First attempt hits the exhaustible 503 mock, the retry falls
    // through to the success mock
    Mock::given(method("GET"))
        .and(path("/data/flaky.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/flaky.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"recovered".to_vec()))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let save_path = tmp.path().join("flaky.jpg");
    let outcome = downloader(2, Duration::from_millis(10))
        .download(
            &format!("{}/data/flaky.jpg", server.uri()),
            &save_path,
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_success(), "got {outcome:?}");
    assert_eq!(std::fs::read(&save_path).unwrap(), b"recovered");
}

#[tokio::test]
async fn test_download_gives_up_after_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/down.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3) // initial attempt + two retries
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let save_path = tmp.path().join("down.jpg");
    let outcome = downloader(2, Duration::from_millis(10))
        .download(
            &format!("{}/data/down.jpg", server.uri()),
            &save_path,
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Failed(DownloadError::HttpStatus { status: 503, .. })
    ));
    assert!(!save_path.exists());
}

#[tokio::test]
async fn test_download_429_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/limited.jpg"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/limited.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let outcome = downloader(1, Duration::from_millis(10))
        .download(
            &format!("{}/data/limited.jpg", server.uri()),
            &tmp.path().join("l.jpg"),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_success(), "got {outcome:?}");
}

#[tokio::test]
async fn test_cancellation_during_retry_wait_is_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/slow.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let save_path = tmp.path().join("slow.jpg");
    let cancel = CancellationToken::new();
    let url = format!("{}/data/slow.jpg", server.uri());

    let dl = downloader(3, Duration::from_secs(30));
    let worker_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        dl.download(&url, &save_path, &worker_cancel).await
    });

    // Let the first attempt fail and the retry wait begin, then cancel
    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("cancellation must interrupt the retry wait")
        .unwrap();
    assert!(matches!(outcome, DownloadOutcome::Cancelled), "got {outcome:?}");
    assert!(!tmp.path().join("slow.jpg").exists());
}
