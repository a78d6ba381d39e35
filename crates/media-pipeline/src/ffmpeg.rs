//! Transcoding tool resolution and invocation.
//!
//! Every media operation in this crate shells out to ffmpeg/ffprobe; this
//! module locates the binaries and wraps the process invocations so each
//! call is a pure `(binary, args) -> Result<Output>` function with no
//! shared state, safe to dispatch concurrently.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Locate ffmpeg and ffprobe.
///
/// Resolution order for each binary: explicit env override (accepted only
/// when the named file actually exists), then `PATH`, then a sibling of
/// the current executable (bundled-distribution layout). ffmpeg always
/// resolves to something (worst case the bare name, so the spawn error is
/// explicit); ffprobe may legitimately be absent, in which case probing
/// falls back to parsing ffmpeg diagnostics.
pub fn resolve_binaries() -> (String, Option<String>) {
    let ffmpeg = resolve_one(&["FFMPEG_BIN"], "ffmpeg").unwrap_or_else(|| {
        warn!("ffmpeg not found via env, PATH, or bundled location; invocations will fail");
        "ffmpeg".to_string()
    });

    let ffprobe = resolve_one(&["FFMPEG_FFPROBE_BIN", "FFPROBE_BIN"], "ffprobe");
    if ffprobe.is_none() {
        debug!("ffprobe not found; metadata probing will parse ffmpeg diagnostics");
    }

    (ffmpeg, ffprobe)
}

fn resolve_one(env_names: &[&str], binary: &str) -> Option<String> {
    for name in env_names {
        if let Ok(candidate) = env::var(name) {
            if !candidate.is_empty() && Path::new(&candidate).is_file() {
                return Some(candidate);
            }
        }
    }

    if let Some(found) = find_in_path(binary) {
        return Some(found.to_string_lossy().into_owned());
    }

    // Bundled layout: the binary shipped next to our own executable.
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join(binary);
            if sibling.is_file() {
                return Some(sibling.to_string_lossy().into_owned());
            }
        }
    }

    None
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

/// Run a command to completion, capturing stdout and stderr.
///
/// Child processes are killed if the future is dropped, so extraction
/// tasks cancelled mid-run do not leave transcoder processes behind.
pub async fn run_capture(bin: &str, args: &[String]) -> Result<std::process::Output> {
    debug!(bin = %bin, args = ?args, "spawning transcoder");
    Command::new(bin)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to execute {}", bin))
}

/// Run a command and require a zero exit status.
pub async fn run_ok(bin: &str, args: &[String]) -> Result<()> {
    let output = run_capture(bin, args).await?;
    if !output.status.success() {
        anyhow::bail!(
            "{} exited with {}: {}",
            bin,
            output.status,
            stderr_snippet(&output.stderr)
        );
    }
    Ok(())
}

/// First 300 bytes of stderr, for log and error messages.
pub fn stderr_snippet(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    let mut end = trimmed.len().min(300);
    while end > 0 && !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_in_path_misses_nonexistent_binary() {
        assert!(find_in_path("definitely-not-a-real-binary-name").is_none());
    }

    #[test]
    fn test_env_override_requires_existing_file() {
        std::env::set_var("FFMPEG_BIN", "/nonexistent/path/to/ffmpeg");
        let resolved = resolve_one(&["FFMPEG_BIN"], "ffmpeg");
        // The bogus override must not win; resolution falls through to
        // PATH (which may or may not have ffmpeg on the test host).
        assert_ne!(resolved.as_deref(), Some("/nonexistent/path/to/ffmpeg"));
        std::env::remove_var("FFMPEG_BIN");
    }

    #[test]
    fn test_stderr_snippet_truncates() {
        let long = "x".repeat(1000);
        assert_eq!(stderr_snippet(long.as_bytes()).len(), 300);
        assert_eq!(stderr_snippet(b"  short  "), "short");
    }
}
