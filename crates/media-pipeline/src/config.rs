//! Pipeline configuration.
//!
//! Built once at startup from environment variables and passed by
//! reference into every component; components never read ambient env
//! state themselves.

use crate::ffmpeg;
use anyhow::Result;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_VIDEO_BYTES: u64 = 2 * 1024 * 1024 * 1024; // 2 GiB
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 7 * 24 * 3600;
const DEFAULT_ASR_SUBMIT_ENDPOINT: &str =
    "https://openspeech.bytedance.com/api/v3/auc/bigmodel/submit";
const DEFAULT_ASR_QUERY_ENDPOINT: &str =
    "https://openspeech.bytedance.com/api/v3/auc/bigmodel/query";

/// First non-empty value among the given env names.
fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| env::var(name).ok().filter(|v| !v.is_empty()))
}

fn env_parse<T: std::str::FromStr>(names: &[&str], default: T) -> T {
    env_first(names)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    pub ffmpeg_bin: String,
    /// Absent when only ffmpeg is installed; probing then falls back to
    /// parsing ffmpeg diagnostics.
    pub ffprobe_bin: Option<String>,
    /// Keyframes sampled per segment.
    pub frames_per_segment: u32,
    /// JPEG quality for keyframes (2 best .. 31 worst).
    pub frame_quality: u32,
    /// Max transcoder processes in flight across all segments.
    pub transcode_limit: usize,
}

impl FfmpegConfig {
    pub fn from_env() -> Self {
        let (ffmpeg_bin, ffprobe_bin) = ffmpeg::resolve_binaries();
        Self {
            ffmpeg_bin,
            ffprobe_bin,
            frames_per_segment: env_parse(
                &["FRAMES_PER_SEGMENT", "FFMPEG_FRAMES_PER_SEGMENT"],
                2u32,
            )
            .max(1),
            frame_quality: env_parse(&["FRAME_QUALITY"], 8u32).clamp(2, 31),
            transcode_limit: env_parse(&["FFMPEG_CONCURRENCY"], 4usize).max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub max_bytes: u64,
    pub download_timeout: Duration,
}

impl SourceConfig {
    pub fn from_env() -> Self {
        Self {
            max_bytes: env_parse(&["MAX_VIDEO_BYTES"], DEFAULT_MAX_VIDEO_BYTES),
            download_timeout: Duration::from_secs(env_parse(
                &["DOWNLOAD_TIMEOUT_SECS"],
                DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsrConfig {
    pub app_id: String,
    pub access_key: String,
    pub resource_id: String,
    pub submit_endpoint: String,
    pub query_endpoint: String,
    /// Wait before the first poll after submitting.
    pub initial_delay: Duration,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl AsrConfig {
    pub fn from_env() -> Self {
        Self {
            app_id: env_first(&["ASR_APP_ID", "VOLC_ASR_APP_ID"]).unwrap_or_default(),
            access_key: env_first(&["ASR_ACCESS_KEY", "VOLC_ASR_ACCESS_KEY"]).unwrap_or_default(),
            resource_id: env_first(&["ASR_RESOURCE_ID", "VOLC_ASR_RESOURCE_ID"])
                .unwrap_or_else(|| "volc.bigasr.auc".to_string()),
            submit_endpoint: env_first(&["ASR_ENDPOINT", "VOLC_ASR_ENDPOINT"])
                .unwrap_or_else(|| DEFAULT_ASR_SUBMIT_ENDPOINT.to_string()),
            query_endpoint: env_first(&["ASR_QUERY_ENDPOINT", "VOLC_ASR_QUERY_ENDPOINT"])
                .unwrap_or_else(|| DEFAULT_ASR_QUERY_ENDPOINT.to_string()),
            initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(3),
            max_attempts: 15,
        }
    }

    /// Speech recognition runs only when both credentials are present;
    /// absence disables the feature rather than erroring.
    pub fn enabled(&self) -> bool {
        !self.app_id.is_empty() && !self.access_key.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Object storage is considered configured iff a bucket is set.
    pub bucket: Option<String>,
    pub region: String,
    /// Custom S3-compatible endpoint; path-style addressing is used when set.
    pub endpoint: Option<String>,
    /// Static credentials; when absent the SDK default provider chain
    /// (env/profile/instance identity) is used instead.
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub key_prefix: String,
    pub signed_url_ttl: Duration,
    /// Max artifact uploads in flight.
    pub upload_limit: usize,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            bucket: env_first(&["S3_BUCKET", "TOS_BUCKET", "DATABASE_TOS_BUCKET"]),
            region: env_first(&["S3_REGION", "TOS_REGION", "DATABASE_TOS_REGION"])
                .unwrap_or_else(|| "cn-beijing".to_string()),
            endpoint: env_first(&["S3_ENDPOINT"]),
            access_key: env_first(&["S3_ACCESS_KEY", "VOLCENGINE_ACCESS_KEY"]),
            secret_key: env_first(&["S3_SECRET_KEY", "VOLCENGINE_SECRET_KEY"]),
            key_prefix: env_first(&["TOS_OUTPUT_PREFIX", "S3_OUTPUT_PREFIX"])
                .unwrap_or_else(|| "videobreak".to_string()),
            signed_url_ttl: Duration::from_secs(env_parse(
                &["SIGNED_URL_TTL_SECS"],
                DEFAULT_SIGNED_URL_TTL_SECS,
            )),
            upload_limit: env_parse(&["UPLOAD_CONCURRENCY"], 10usize).max(1),
        }
    }

    pub fn enabled(&self) -> bool {
        self.bucket.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Candidate segments shorter than this are dropped. The constant
    /// guards against zero/near-zero extraction windows; treat it as
    /// tunable, not load-bearing.
    pub min_segment_secs: f64,
}

impl SegmenterConfig {
    pub fn from_env() -> Self {
        Self {
            min_segment_secs: env_parse(&["MIN_SEGMENT_SECS"], 0.5f64),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ffmpeg: FfmpegConfig,
    pub source: SourceConfig,
    pub asr: AsrConfig,
    pub storage: StorageConfig,
    pub segmenter: SegmenterConfig,
    /// Root under which per-run scratch workspaces are created.
    pub temp_root: PathBuf,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ffmpeg: FfmpegConfig::from_env(),
            source: SourceConfig::from_env(),
            asr: AsrConfig::from_env(),
            storage: StorageConfig::from_env(),
            segmenter: SegmenterConfig::from_env(),
            temp_root: PathBuf::from(
                env_first(&["MEDIA_TEMP_DIR", "FFMPEG_MEDIA_TEMP_DIR"])
                    .unwrap_or_else(|| "./.media-cache".to_string()),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asr_enabled_requires_both_credentials() {
        let mut cfg = AsrConfig {
            app_id: String::new(),
            access_key: String::new(),
            resource_id: "volc.bigasr.auc".to_string(),
            submit_endpoint: DEFAULT_ASR_SUBMIT_ENDPOINT.to_string(),
            query_endpoint: DEFAULT_ASR_QUERY_ENDPOINT.to_string(),
            initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(3),
            max_attempts: 15,
        };
        assert!(!cfg.enabled());

        cfg.app_id = "app".to_string();
        assert!(!cfg.enabled());

        cfg.access_key = "key".to_string();
        assert!(cfg.enabled());
    }

    #[test]
    fn test_storage_enabled_requires_bucket() {
        let mut cfg = StorageConfig {
            bucket: None,
            region: "cn-beijing".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            key_prefix: "videobreak".to_string(),
            signed_url_ttl: Duration::from_secs(DEFAULT_SIGNED_URL_TTL_SECS),
            upload_limit: 10,
        };
        assert!(!cfg.enabled());

        cfg.bucket = Some("uploads".to_string());
        assert!(cfg.enabled());
    }

    #[test]
    fn test_env_parse_defaults_and_overrides() {
        std::env::remove_var("FRAMES_PER_SEGMENT_TEST");
        assert_eq!(env_parse(&["FRAMES_PER_SEGMENT_TEST"], 2u32), 2);

        std::env::set_var("FRAMES_PER_SEGMENT_TEST", "5");
        assert_eq!(env_parse(&["FRAMES_PER_SEGMENT_TEST"], 2u32), 5);

        std::env::set_var("FRAMES_PER_SEGMENT_TEST", "not-a-number");
        assert_eq!(env_parse(&["FRAMES_PER_SEGMENT_TEST"], 2u32), 2);

        std::env::remove_var("FRAMES_PER_SEGMENT_TEST");
    }
}
