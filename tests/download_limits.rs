//! Streaming download behavior: size-cap enforcement mid-stream, partial
//! file cleanup, redirects, transport failures and cancellation.

use axum::{
    response::Redirect,
    routing::get,
    Router,
};
use media_pipeline::config::SourceConfig;
use media_pipeline::error::PipelineError;
use media_pipeline::source;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });
    format!("http://{}", addr)
}

fn media_server() -> Router {
    Router::new()
        .route("/small.mp4", get(|| async { vec![0u8; 1024] }))
        .route("/big.mp4", get(|| async { vec![0u8; 256 * 1024] }))
        .route(
            "/moved.mp4",
            get(|| async { Redirect::temporary("/small.mp4") }),
        )
}

fn source_config(max_bytes: u64) -> SourceConfig {
    SourceConfig {
        max_bytes,
        download_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_download_within_cap_succeeds() {
    let base = serve(media_server()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("video.mp4");

    let size = source::fetch(
        &format!("{}/small.mp4", base),
        &dest,
        &source_config(64 * 1024),
        &reqwest::Client::new(),
        &CancellationToken::new(),
    )
    .await
    .expect("download");

    assert_eq!(size, 1024);
    assert_eq!(std::fs::metadata(&dest).expect("metadata").len(), 1024);
}

#[tokio::test]
async fn test_oversized_download_aborts_and_removes_partial_file() {
    let base = serve(media_server()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("video.mp4");

    let err = source::fetch(
        &format!("{}/big.mp4", base),
        &dest,
        &source_config(64 * 1024),
        &reqwest::Client::new(),
        &CancellationToken::new(),
    )
    .await
    .expect_err("must exceed cap");

    assert!(matches!(err, PipelineError::SourceTooLarge { .. }));
    // The abort happens mid-stream; no partial file may survive.
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let base = serve(media_server()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("video.mp4");

    let size = source::fetch(
        &format!("{}/moved.mp4", base),
        &dest,
        &source_config(64 * 1024),
        &reqwest::Client::new(),
        &CancellationToken::new(),
    )
    .await
    .expect("download via redirect");

    assert_eq!(size, 1024);
}

#[tokio::test]
async fn test_http_error_maps_to_download_error() {
    let base = serve(media_server()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("video.mp4");

    let err = source::fetch(
        &format!("{}/nope.mp4", base),
        &dest,
        &source_config(64 * 1024),
        &reqwest::Client::new(),
        &CancellationToken::new(),
    )
    .await
    .expect_err("404 must fail");

    assert!(matches!(err, PipelineError::Download(_)));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_cancellation_aborts_download() {
    let base = serve(media_server()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("video.mp4");

    let token = CancellationToken::new();
    token.cancel();

    let err = source::fetch(
        &format!("{}/big.mp4", base),
        &dest,
        &source_config(1024 * 1024),
        &reqwest::Client::new(),
        &token,
    )
    .await
    .expect_err("cancelled run must not complete");

    assert!(matches!(err, PipelineError::Cancelled));
    assert!(!dest.exists());
}
