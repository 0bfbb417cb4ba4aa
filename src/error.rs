//! Failures that end a `/run` request without a [`RunResult`] from the interpreter.
//!
//! An interpreter that exits non-zero is not an error here; it produces a
//! `RunResult` with `success: false`.

use crate::RunResult;

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum RunError {
    /// Body is not JSON, or has no string `code` field.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Body could not be read, e.g. it exceeds the size limit.
    #[error("{0}")]
    PayloadRejected(#[from] BytesRejection),

    #[error("too many concurrent executions")]
    Busy,

    #[error("execution timed out")]
    Timeout,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RunError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RunError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            RunError::PayloadRejected(rejection) => rejection.status(),
            RunError::Busy => StatusCode::TOO_MANY_REQUESTS,
            RunError::Timeout | RunError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The text placed in the response's `error` field.
    pub fn message(&self) -> String {
        match self {
            RunError::Internal(err) => format!("{:#}", err),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RunError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            error!(%status, %message, "run failed");
        } else {
            debug!(%status, %message, "run rejected");
        }

        (status, Json(RunResult::error(message))).into_response()
    }
}
