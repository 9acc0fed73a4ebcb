//! JSON error responses.
//!
//! Every error returned by the HTTP layer serializes as:
//! ```json
//! { "ok": false, "error": { "code": "<code>", "message": "<message>" } }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lfv_kernel::{SearchError, VfsError};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorResponse {
    pub ok: bool,
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorResponse {
                ok: false,
                error: ApiErrorBody {
                    code: code.into(),
                    message: message.into(),
                },
            },
        }
    }

    pub fn bad_request(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn internal(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    /// A required query or body parameter was absent.
    pub fn missing(param: &str) -> Self {
        Self::bad_request("missing_parameter", format!("missing parameter: {param}"))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = %self.body.error.code, message = %self.body.error.message, "request failed");
        } else {
            tracing::debug!(code = %self.body.error.code, message = %self.body.error.message, "request rejected");
        }
        (self.status, Json(self.body)).into_response()
    }
}

impl From<VfsError> for ApiError {
    fn from(err: VfsError) -> Self {
        let code = match &err {
            VfsError::InvalidPath(_) => "invalid_path",
            VfsError::OutOfBounds { .. } => "out_of_bounds",
            VfsError::NotFound(_) => "not_found",
            VfsError::NotADirectory(_) => "not_a_directory",
            VfsError::FileTooLarge { .. } => "file_too_large",
            VfsError::Io(_) => return Self::internal("io", err.to_string()),
        };
        Self::bad_request(code, err.to_string())
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        let message = err.to_string();
        match err {
            SearchError::Vfs(vfs) => vfs.into(),
            SearchError::InvalidQuery(_) => Self::bad_request("invalid_query", message),
            SearchError::ToolUnavailable { .. } => Self::internal("tool_unavailable", message),
            SearchError::ToolFailure { .. } => Self::internal("tool_failure", message),
            SearchError::Timeout { .. } => Self::internal("timeout", message),
            SearchError::Exhausted(_) => Self::internal("search_exhausted", message),
        }
    }
}
