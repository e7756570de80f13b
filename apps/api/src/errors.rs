use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::hashing::Hash32;
use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Submission not found: {0}")]
    SubmissionNotFound(Hash32),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UnknownJob(job_id) => AppError::UnknownJob(job_id),
            LedgerError::SubmissionNotFound(id) => AppError::SubmissionNotFound(id),
            LedgerError::Store(e) => AppError::Store(e),
            other => AppError::Internal(anyhow::anyhow!(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnknownJob(job_id) => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_JOB",
                format!("Job {job_id} not found"),
            ),
            AppError::SubmissionNotFound(id) => (
                StatusCode::NOT_FOUND,
                "SUBMISSION_NOT_FOUND",
                format!("Submission {id} not found"),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
