use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use media_pipeline::PipelineError;
use serde::Serialize;
use std::fmt::{self, Display};

/// Error body returned to API callers: a status plus the pipeline's
/// human-readable message. Degraded pipeline conditions never surface
/// here; only the fatal taxonomy maps to responses.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for ApiError {}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::SourceNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::SourceTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PipelineError::Download(_) => StatusCode::BAD_REQUEST,
            PipelineError::ProbeFailed | PipelineError::NoUsableSegments { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PipelineError::Cancelled | PipelineError::Workspace(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_status_mapping() {
        let cases = [
            (
                PipelineError::SourceNotFound("/x.mp4".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                PipelineError::SourceTooLarge {
                    limit_bytes: 2 * 1024 * 1024 * 1024,
                },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                PipelineError::Download("connection refused".into()),
                StatusCode::BAD_REQUEST,
            ),
            (PipelineError::ProbeFailed, StatusCode::UNPROCESSABLE_ENTITY),
            (
                PipelineError::NoUsableSegments { duration_secs: 0.3 },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, expected) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status, expected);
        }
    }
}
