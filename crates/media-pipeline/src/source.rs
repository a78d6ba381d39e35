//! Source resolution: one locator string in, one readable file in the
//! workspace out.

use crate::config::SourceConfig;
use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// How a locator resolves, decided before any I/O beyond an existence
/// check: local-path shapes (absolute, drive letter, `file://`) and
/// relative paths that exist as readable files are local; everything
/// else is treated as a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Local(PathBuf),
    Remote(String),
}

pub fn classify(locator: &str) -> SourceKind {
    if let Some(stripped) = locator.strip_prefix("file://") {
        // file:///C:/path -> C:/path on Windows, /path stays /path.
        let local = if stripped.len() > 3
            && stripped.starts_with('/')
            && stripped.as_bytes()[2] == b':'
        {
            &stripped[1..]
        } else {
            stripped
        };
        return SourceKind::Local(PathBuf::from(local));
    }

    if locator.starts_with('/') {
        return SourceKind::Local(PathBuf::from(locator));
    }

    // Windows drive letter: C:\... or C:/...
    let bytes = locator.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
    {
        return SourceKind::Local(PathBuf::from(locator));
    }

    // Relative paths count as local only when they resolve to a real file.
    let candidate = Path::new(locator);
    if candidate.is_file() {
        return SourceKind::Local(candidate.to_path_buf());
    }

    SourceKind::Remote(locator.to_string())
}

/// Materialize the locator as `dest` inside the workspace, returning the
/// byte size. Local sources are size-checked then copied; remote sources
/// are stream-downloaded with the byte cap enforced per chunk, so an
/// oversized body is rejected mid-stream rather than after it has been
/// fully written to disk.
pub async fn fetch(
    locator: &str,
    dest: &Path,
    cfg: &SourceConfig,
    client: &reqwest::Client,
    cancel: &CancellationToken,
) -> Result<u64, PipelineError> {
    match classify(locator) {
        SourceKind::Local(path) => copy_local(&path, dest, cfg).await,
        SourceKind::Remote(url) => download(&url, dest, cfg, client, cancel).await,
    }
}

async fn copy_local(src: &Path, dest: &Path, cfg: &SourceConfig) -> Result<u64, PipelineError> {
    let meta = tokio::fs::metadata(src)
        .await
        .map_err(|_| PipelineError::SourceNotFound(src.display().to_string()))?;
    if !meta.is_file() {
        return Err(PipelineError::SourceNotFound(src.display().to_string()));
    }
    if meta.len() > cfg.max_bytes {
        return Err(PipelineError::SourceTooLarge {
            limit_bytes: cfg.max_bytes,
        });
    }

    tokio::fs::copy(src, dest)
        .await
        .map_err(|e| PipelineError::Workspace(format!("copy source into workspace: {}", e)))?;

    info!(
        src = %src.display(),
        size_mb = meta.len() / (1024 * 1024),
        "using local source file"
    );
    Ok(meta.len())
}

async fn download(
    url: &str,
    dest: &Path,
    cfg: &SourceConfig,
    client: &reqwest::Client,
    cancel: &CancellationToken,
) -> Result<u64, PipelineError> {
    info!(url = %truncate(url, 100), "downloading video");

    let resp = client
        .get(url)
        .timeout(cfg.download_timeout)
        .send()
        .await
        .map_err(|e| PipelineError::Download(e.to_string()))?;
    let mut resp = resp
        .error_for_status()
        .map_err(|e| PipelineError::Download(e.to_string()))?;

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| PipelineError::Workspace(format!("create download target: {}", e)))?;
    let mut total: u64 = 0;

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                abort_partial(dest).await;
                return Err(PipelineError::Cancelled);
            }
            chunk = resp.chunk() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => {
                total += bytes.len() as u64;
                if total > cfg.max_bytes {
                    abort_partial(dest).await;
                    return Err(PipelineError::SourceTooLarge {
                        limit_bytes: cfg.max_bytes,
                    });
                }
                file.write_all(&bytes)
                    .await
                    .map_err(|e| PipelineError::Workspace(format!("write download: {}", e)))?;
            }
            Ok(None) => break,
            Err(e) => {
                abort_partial(dest).await;
                return Err(PipelineError::Download(e.to_string()));
            }
        }
    }

    file.flush()
        .await
        .map_err(|e| PipelineError::Workspace(format!("flush download: {}", e)))?;

    info!(size_mb = total / (1024 * 1024), dest = %dest.display(), "download complete");
    Ok(total)
}

/// Remove a partially written download so an aborted run never leaves a
/// truncated file for later stages to trip over.
async fn abort_partial(dest: &Path) {
    let _ = tokio::fs::remove_file(dest).await;
}

fn truncate(s: &str, max: usize) -> &str {
    let mut end = s.len().min(max);
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
