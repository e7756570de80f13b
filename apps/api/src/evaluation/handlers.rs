//! Axum route handlers for submissions.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::evaluation::{
    submission_status, submit_evaluation, EvaluationRequest, SubmissionReceipt, SubmissionStatus,
};
use crate::models::submission::{CommitmentRecord, SubmissionFilter};
use crate::models::{parse_hash, parse_wallet};
use crate::state::AppState;

/// Query string or JSON body naming one submission.
#[derive(Debug, Deserialize)]
pub struct SubmissionIdParams {
    pub submission_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionListQuery {
    pub job_id: Option<String>,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DispositionResponse {
    pub success: bool,
    pub message: String,
    pub submission: CommitmentRecord,
}

/// POST /api/evaluations
pub async fn handle_submit_evaluation(
    State(state): State<AppState>,
    Json(request): Json<EvaluationRequest>,
) -> Result<Json<SubmissionReceipt>, AppError> {
    let request = request.validate()?;
    let receipt = submit_evaluation(state.ledger.as_ref(), &state.policy, request).await?;
    Ok(Json(receipt))
}

/// GET /api/status?submission_id=
pub async fn handle_status(
    State(state): State<AppState>,
    Query(query): Query<SubmissionIdParams>,
) -> Result<Json<SubmissionStatus>, AppError> {
    let submission_id = parse_hash("submission_id", &query.submission_id)?;
    let status =
        submission_status(state.store.as_ref(), state.ledger.as_ref(), &submission_id).await?;
    Ok(Json(status))
}

/// POST /api/accept
pub async fn handle_accept(
    State(state): State<AppState>,
    Json(body): Json<SubmissionIdParams>,
) -> Result<Json<DispositionResponse>, AppError> {
    let submission_id = parse_hash("submission_id", &body.submission_id)?;
    let submission = state.ledger.mark_accepted(&submission_id).await?;
    Ok(Json(DispositionResponse {
        success: true,
        message: "Submission accepted".to_string(),
        submission,
    }))
}

/// POST /api/reject
pub async fn handle_reject(
    State(state): State<AppState>,
    Json(body): Json<SubmissionIdParams>,
) -> Result<Json<DispositionResponse>, AppError> {
    let submission_id = parse_hash("submission_id", &body.submission_id)?;
    let submission = state.ledger.mark_rejected(&submission_id).await?;
    Ok(Json(DispositionResponse {
        success: true,
        message: "Submission rejected".to_string(),
        submission,
    }))
}

/// GET /api/submissions?job_id=&wallet_address=
pub async fn handle_list_submissions(
    State(state): State<AppState>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Json<Vec<CommitmentRecord>>, AppError> {
    let filter = SubmissionFilter {
        job_id: query.job_id.filter(|j| !j.trim().is_empty()),
        wallet_address: query
            .wallet_address
            .as_deref()
            .map(|w| parse_wallet("wallet_address", w))
            .transpose()?,
    };
    Ok(Json(state.store.list_submissions(&filter).await?))
}

/// GET /api/submissions/:submission_id
pub async fn handle_get_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> Result<Json<CommitmentRecord>, AppError> {
    let submission_id = parse_hash("submission_id", &submission_id)?;
    state
        .store
        .get_submission(&submission_id)
        .await?
        .map(Json)
        .ok_or(AppError::SubmissionNotFound(submission_id))
}
