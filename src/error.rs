//! API Errors
//!
//! TigerStyle: One error taxonomy for every endpoint.
//!
//! Every failure still produces a well-formed envelope (`success = false`)
//! with a status code chosen by the error kind. Nothing here is retried.

use crate::http::Envelope;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::path::PathBuf;

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced by the operation pipeline
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("缺少必要参数: {}", .0.join(", "))]
    MissingParams(Vec<String>),

    #[error("{field}: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} 超出范围 [{min}, {max}]: {value}")]
    Range {
        field: String,
        min: String,
        max: String,
        value: String,
    },

    #[error("{0}，请先执行前置步骤")]
    DependencyMissing(String),

    #[error("文件不存在: {}", .0.display())]
    NotFound(PathBuf),

    #[error("文件格式错误 {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("服务器内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for a bad-format error on a named field
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an out-of-range numeric field
    pub fn range(
        field: impl Into<String>,
        min: impl ToString,
        max: impl ToString,
        value: impl ToString,
    ) -> Self {
        Self::Range {
            field: field.into(),
            min: min.to_string(),
            max: max.to_string(),
            value: value.to_string(),
        }
    }

    /// Shorthand for a malformed stored file
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Server-side fault that is not the caller's doing
    pub fn internal(reason: impl ToString) -> Self {
        Self::Internal(reason.to_string())
    }

    /// HTTP status for this error kind
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParams(_) | Self::InvalidFormat { .. } | Self::Range { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::DependencyMissing(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Parse { .. } | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParams(_) => "missing_params",
            Self::InvalidFormat { .. } => "invalid_format",
            Self::Range { .. } => "range",
            Self::DependencyMissing(_) => "dependency_missing",
            Self::NotFound(_) => "not_found",
            Self::Parse { .. } => "parse",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "request rejected");
        }
        (status, Json(Envelope::failure(self.to_string()))).into_response()
    }
}

/// Result alias used across the pipeline
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Tests
// =============================================================================
