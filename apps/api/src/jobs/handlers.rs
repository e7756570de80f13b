use axum::{
    extract::{Path, State},
    Json,
};
use ethers::types::Address;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::hashing::address_hex;
use crate::jobs::CreateJobRequest;
use crate::models::job::{JobContractBinding, LedgerMode};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub job_id: String,
    pub contract_address: Address,
    pub ledger_mode: LedgerMode,
    pub success: bool,
}

/// POST /api/job
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<Json<CreateJobResponse>, AppError> {
    let descriptor = request.into_descriptor()?;
    let binding = state.ledger.commit_job(&descriptor).await?;

    info!(
        "Job {} bound to {} ({})",
        binding.job_id,
        address_hex(&binding.contract_address),
        binding.ledger_mode
    );

    Ok(Json(CreateJobResponse {
        job_id: binding.job_id,
        contract_address: binding.contract_address,
        ledger_mode: binding.ledger_mode,
        success: true,
    }))
}

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobContractBinding>>, AppError> {
    Ok(Json(state.store.list_jobs().await?))
}

/// GET /api/job/:job_id/summary
pub async fn handle_job_summary(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobContractBinding>, AppError> {
    state
        .store
        .get_job(&job_id)
        .await?
        .map(Json)
        .ok_or(AppError::UnknownJob(job_id))
}
