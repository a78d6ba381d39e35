//! Gateway routes: health, input validation, fatal-error mapping and
//! task-store lookups.

use breakdown_gateway::routes;
use breakdown_gateway::state::AppState;
use media_pipeline::config::{
    AsrConfig, FfmpegConfig, PipelineConfig, SegmenterConfig, SourceConfig, StorageConfig,
};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

fn test_config(temp_root: &Path) -> PipelineConfig {
    PipelineConfig {
        ffmpeg: FfmpegConfig {
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: None,
            frames_per_segment: 2,
            frame_quality: 8,
            transcode_limit: 2,
        },
        source: SourceConfig {
            max_bytes: 1024 * 1024,
            download_timeout: Duration::from_secs(5),
        },
        asr: AsrConfig {
            app_id: String::new(),
            access_key: String::new(),
            resource_id: "volc.bigasr.auc".to_string(),
            submit_endpoint: "http://127.0.0.1:9/submit".to_string(),
            query_endpoint: "http://127.0.0.1:9/query".to_string(),
            initial_delay: Duration::from_millis(10),
            poll_interval: Duration::from_millis(10),
            max_attempts: 2,
        },
        storage: StorageConfig {
            bucket: None,
            region: "cn-beijing".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            key_prefix: "videobreak".to_string(),
            signed_url_ttl: Duration::from_secs(3600),
            upload_limit: 4,
        },
        segmenter: SegmenterConfig {
            min_segment_secs: 0.5,
        },
        temp_root: temp_root.to_path_buf(),
    }
}

async fn start_test_gateway(temp_root: &Path) -> String {
    let state = AppState::new(test_config(temp_root));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_healthz() {
    let root = tempfile::tempdir().expect("tempdir");
    let base = start_test_gateway(root.path()).await;

    let resp = reqwest::get(format!("{}/healthz", base))
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_empty_locator_is_bad_request() {
    let root = tempfile::tempdir().expect("tempdir");
    let base = start_test_gateway(root.path()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/v1/breakdowns", base))
        .json(&json!({ "video_url": "   " }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.expect("json");
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .contains("video_url"));
}

#[tokio::test]
async fn test_missing_local_file_maps_to_not_found() {
    let root = tempfile::tempdir().expect("tempdir");
    let base = start_test_gateway(root.path()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/v1/breakdowns", base))
        .json(&json!({ "video_url": "/definitely/not/here.mp4" }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.expect("json");
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .contains("does not exist"));
}

#[tokio::test]
async fn test_unknown_task_lookup_is_not_found() {
    let root = tempfile::tempdir().expect("tempdir");
    let base = start_test_gateway(root.path()).await;

    let resp = reqwest::get(format!("{}/v1/breakdowns/20990101_000000_ffffffff", base))
        .await
        .expect("request");
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.expect("json");
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .contains("unknown task"));
}
