use thiserror::Error;

/// Fatal pipeline failures.
///
/// Everything else (audio extraction, speech recognition, per-frame and
/// per-clip extraction, artifact uploads) degrades with a logged warning
/// and the run continues on fallbacks; these variants are the only ways a
/// run aborts without a result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("local file does not exist: {0}")]
    SourceNotFound(String),

    #[error("video file too large (max {} MB), compress and retry", .limit_bytes / (1024 * 1024))]
    SourceTooLarge { limit_bytes: u64 },

    #[error("video download failed: {0}")]
    Download(String),

    #[error("cannot determine video duration, check that the source is a valid video")]
    ProbeFailed,

    #[error("video too short to segment ({duration_secs:.1}s)")]
    NoUsableSegments { duration_secs: f64 },

    #[error("processing cancelled")]
    Cancelled,

    #[error("workspace error: {0}")]
    Workspace(String),
}
