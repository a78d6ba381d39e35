//! Asynchronous speech recognition: submit, then poll to a terminal state.
//!
//! The service communicates job state through the `X-Api-Status-Code`
//! response header. Missing credentials disable the feature entirely;
//! every other failure mode degrades to "no transcript" and the pipeline
//! carries on.

use crate::config::AsrConfig;
use common::media::{Transcript, TranscriptUtterance};
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

const STATUS_HEADER: &str = "X-Api-Status-Code";
const STATUS_SUCCESS: &str = "20000000";
const STATUS_PROCESSING: &str = "20000001";
const STATUS_QUEUED: &str = "20000002";
const STATUS_SILENT: &str = "20000003";

/// Terminal state of one recognition job.
#[derive(Debug, Clone, PartialEq)]
pub enum AsrOutcome {
    /// Credentials absent; recognition never ran.
    NotConfigured,
    Succeeded(Transcript),
    /// The service recognized the audio as silence. Distinct from
    /// `Failed`: the transcript exists and is empty.
    Silent,
    Failed,
    /// Poll attempts exhausted without a terminal status. Non-fatal;
    /// treated exactly like `Failed` downstream.
    TimedOut,
}

impl AsrOutcome {
    /// Collapse to the transcript the pipeline carries forward.
    pub fn into_transcript(self) -> Option<Transcript> {
        match self {
            AsrOutcome::Succeeded(t) => Some(t),
            AsrOutcome::Silent => Some(Transcript::default()),
            AsrOutcome::NotConfigured | AsrOutcome::Failed | AsrOutcome::TimedOut => None,
        }
    }
}

/// Run one recognition job over an audio URL to a terminal outcome.
pub async fn transcribe(cfg: &AsrConfig, client: &Client, audio_url: &str) -> AsrOutcome {
    if !cfg.enabled() {
        info!("speech recognition credentials absent, skipping");
        return AsrOutcome::NotConfigured;
    }

    let request_id = Uuid::new_v4().to_string();

    let payload = json!({
        "user": { "uid": "video-breakdown" },
        "audio": { "url": audio_url, "format": "mp3" },
        "request": {
            "model_name": "bigmodel",
            "enable_itn": true,
            "enable_punc": true,
            "show_utterances": true,
        },
    });

    let submit = apply_headers(client.post(&cfg.submit_endpoint), cfg, &request_id)
        .timeout(std::time::Duration::from_secs(120))
        .json(&payload)
        .send()
        .await;
    match submit.and_then(|r| r.error_for_status()) {
        Ok(_) => info!(request_id = %request_id, "recognition job submitted"),
        Err(e) => {
            error!(error = %e, "recognition submit failed");
            return AsrOutcome::Failed;
        }
    }

    tokio::time::sleep(cfg.initial_delay).await;

    for attempt in 1..=cfg.max_attempts {
        let resp = match apply_headers(client.post(&cfg.query_endpoint), cfg, &request_id)
            .timeout(std::time::Duration::from_secs(60))
            .json(&json!({}))
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(resp) => resp,
            Err(e) => {
                error!(error = %e, "recognition query failed");
                return AsrOutcome::Failed;
            }
        };

        let status_code = resp
            .headers()
            .get(STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        match status_code.as_str() {
            STATUS_SUCCESS => {
                let body: serde_json::Value = match resp.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        error!(error = %e, "unparseable recognition result");
                        return AsrOutcome::Failed;
                    }
                };
                return match parse_result(&body) {
                    Some(transcript) => AsrOutcome::Succeeded(transcript),
                    None => {
                        warn!(request_id = %request_id, "recognition result carried no text");
                        AsrOutcome::Failed
                    }
                };
            }
            STATUS_SILENT => {
                info!(request_id = %request_id, "audio recognized as silence");
                return AsrOutcome::Silent;
            }
            STATUS_PROCESSING | STATUS_QUEUED => {
                info!(
                    attempt = attempt,
                    max_attempts = cfg.max_attempts,
                    "recognition still processing"
                );
                tokio::time::sleep(cfg.poll_interval).await;
            }
            other => {
                error!(status_code = %other, "recognition returned error status");
                return AsrOutcome::Failed;
            }
        }
    }

    error!(request_id = %request_id, "recognition polling exhausted");
    AsrOutcome::TimedOut
}

fn apply_headers(
    req: reqwest::RequestBuilder,
    cfg: &AsrConfig,
    request_id: &str,
) -> reqwest::RequestBuilder {
    req.header("Content-Type", "application/json")
        .header("X-Api-App-Key", &cfg.app_id)
        .header("X-Api-Access-Key", &cfg.access_key)
        .header("X-Api-Resource-Id", &cfg.resource_id)
        .header("X-Api-Request-Id", request_id)
        .header("X-Api-Sequence", "-1")
}

/// Parse the service result body: overall text plus per-utterance spans
/// with millisecond timestamps. Returns `None` when no text was
/// recognized at all.
fn parse_result(body: &serde_json::Value) -> Option<Transcript> {
    let result = body.get("result")?;

    let text = result
        .get("text")
        .and_then(|t| t.as_str())
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    let mut utterances = Vec::new();
    if let Some(items) = result.get("utterances").and_then(|u| u.as_array()) {
        for item in items {
            let Some(utt_text) = item.get("text").and_then(|t| t.as_str()) else {
                continue;
            };
            let utt_text = utt_text.trim();
            if utt_text.is_empty() {
                continue;
            }
            let start_ms = item.get("start_time").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let end_ms = item.get("end_time").and_then(|v| v.as_f64()).unwrap_or(0.0);
            utterances.push(TranscriptUtterance {
                start_secs: start_ms / 1000.0,
                end_secs: end_ms / 1000.0,
                text: utt_text.to_string(),
            });
        }
    }

    if text.is_empty() {
        return None;
    }

    Some(Transcript { text, utterances })
}
