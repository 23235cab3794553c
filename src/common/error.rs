use axum::http::StatusCode;
use thiserror::Error;

use crate::common::response::ApiError;

/// External tool invocation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ListFormats,
    Metadata,
    Download,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ListFormats => "list_formats",
            Stage::Metadata => "metadata",
            Stage::Download => "download",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unknown resolution '{0}'")]
    InvalidResolution(String),

    #[error("{stage} failed: {message}")]
    ToolFailed { stage: Stage, message: String },

    #[error("{stage} timed out after {secs}s")]
    ToolTimeout { stage: Stage, secs: u64 },

    #[error("unparseable tool output: {0}")]
    Unparseable(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("job aborted: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidResolution(_) => "invalid_resolution",
            AppError::ToolFailed { .. } => "tool_failed",
            AppError::ToolTimeout { .. } => "tool_timeout",
            AppError::Unparseable(_) => "unparseable_output",
            AppError::Upload(_) => "upload_failed",
            AppError::Io(_) => "io",
            AppError::Internal(_) => "internal",
        }
    }

    /// Client-facing error. Anything but a bad resolution collapses to
    /// `fallback` with a 500; the `code` still tells the kinds apart.
    pub fn into_api(self, fallback: &str) -> ApiError {
        match self {
            AppError::InvalidResolution(_) => ApiError::new(
                "Invalid resolution.",
                self.code(),
                StatusCode::BAD_REQUEST,
            ),
            AppError::Upload(_) => ApiError::new(
                "Failed to upload.",
                self.code(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            _ => ApiError::new(fallback, self.code(), StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}
