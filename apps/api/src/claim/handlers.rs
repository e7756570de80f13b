use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::claim::verify_claim;
use crate::errors::AppError;
use crate::models::{parse_hash, parse_wallet, require_text};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub submission_id: String,
    pub signature: String,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/claim
///
/// Verifies the signature, then marks the submission claimed.
pub async fn handle_claim(
    State(state): State<AppState>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, AppError> {
    let submission_id = parse_hash("submission_id", &request.submission_id)?;
    require_text("signature", &request.signature)?;
    let claimed_wallet = request
        .wallet_address
        .as_deref()
        .map(|w| parse_wallet("wallet_address", w))
        .transpose()?;

    let valid = verify_claim(
        state.store.as_ref(),
        &submission_id,
        &request.signature,
        claimed_wallet,
    )
    .await?;

    if !valid {
        warn!("Rejected claim for submission {submission_id}");
        return Err(AppError::Forbidden("Invalid signature".to_string()));
    }

    state
        .store
        .mark_claimed(&submission_id)
        .await?
        .ok_or(AppError::SubmissionNotFound(submission_id))?;
    info!("Submission {submission_id} claimed");

    Ok(Json(ClaimResponse {
        success: true,
        message: "Position claimed successfully".to_string(),
    }))
}
