//! Evaluation flow: scorer output → digests → decision → ledger commitment.
//!
//! The scorer is an external collaborator; this module receives its output as
//! plain data (anonymized text, similarity score, model identifier).

pub mod handlers;

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::decision::{Decision, DecisionPolicy};
use crate::errors::AppError;
use crate::hashing::{self, Hash32};
use crate::ledger::{EvaluationCommit, LedgerClient};
use crate::models::submission::{Anchor, Disposition, EvaluationResult};
use crate::models::{parse_wallet, require_text};
use crate::store::CommitmentStore;

#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    pub job_id: String,
    pub wallet_address: String,
    /// Already anonymized by the scorer; hashed byte-for-byte.
    pub resume_text: String,
    pub similarity_score: f64,
    pub model_identifier: String,
    pub encrypted_contact: Option<String>,
}

/// An evaluation request that passed boundary validation.
#[derive(Debug, Clone)]
pub struct ValidatedEvaluation {
    pub job_id: String,
    pub wallet_address: Address,
    pub resume_text: String,
    pub similarity_score: f64,
    pub model_identifier: String,
    pub encrypted_contact: Option<String>,
}

impl EvaluationRequest {
    pub fn validate(self) -> Result<ValidatedEvaluation, AppError> {
        require_text("job_id", &self.job_id)?;
        require_text("resume_text", &self.resume_text)?;
        require_text("model_identifier", &self.model_identifier)?;
        let wallet_address = parse_wallet("wallet_address", &self.wallet_address)?;

        if !self.similarity_score.is_finite() || !(0.0..=1.0).contains(&self.similarity_score) {
            return Err(AppError::Validation(format!(
                "similarity_score must be within [0, 1], got {}",
                self.similarity_score
            )));
        }

        Ok(ValidatedEvaluation {
            job_id: self.job_id.trim().to_string(),
            wallet_address,
            resume_text: self.resume_text,
            similarity_score: self.similarity_score,
            model_identifier: self.model_identifier,
            encrypted_contact: self.encrypted_contact.filter(|c| !c.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub submission_id: Hash32,
    pub score: f64,
    pub decision: Decision,
    pub tx_hash: String,
    pub anchor: Anchor,
}

/// Classifies, hashes and commits one evaluation.
pub async fn submit_evaluation(
    ledger: &dyn LedgerClient,
    policy: &DecisionPolicy,
    request: ValidatedEvaluation,
) -> Result<SubmissionReceipt, AppError> {
    let decision = policy.classify(request.similarity_score);
    let evaluation = EvaluationResult {
        similarity_score: request.similarity_score,
        decision,
        resume_hash: hashing::digest_resume(&request.resume_text),
        model_identifier: request.model_identifier,
    };
    let submission_id = hashing::derive_submission_id(
        &request.wallet_address,
        &request.job_id,
        &evaluation.resume_hash,
    );

    let receipt = ledger
        .commit_evaluation(EvaluationCommit {
            submission_id,
            evaluation,
            wallet_address: request.wallet_address,
            job_id: request.job_id,
            encrypted_contact: request.encrypted_contact,
        })
        .await?;

    let requested_score = hashing::round_score(request.similarity_score);
    if receipt.decision != decision || receipt.similarity_score != requested_score {
        warn!(
            "Submission {submission_id} already committed with score {} ({}); ignoring resubmitted {decision}",
            receipt.similarity_score, receipt.decision
        );
    }
    info!(
        "Submission {submission_id} committed: decision={}, anchor={}",
        receipt.decision, receipt.anchor
    );

    Ok(SubmissionReceipt {
        submission_id,
        score: receipt.similarity_score,
        decision: receipt.decision,
        tx_hash: receipt.transaction_reference,
        anchor: receipt.anchor,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionStatus {
    pub submission_id: Hash32,
    pub decision: Decision,
    pub disposition: Disposition,
    pub claimed: bool,
    pub tx_hash: String,
    pub anchor: Anchor,
    pub verified: bool,
}

/// Loads a record and re-checks its digests against the ledger.
pub async fn submission_status(
    store: &dyn CommitmentStore,
    ledger: &dyn LedgerClient,
    submission_id: &Hash32,
) -> Result<SubmissionStatus, AppError> {
    let record = store
        .get_submission(submission_id)
        .await?
        .ok_or(AppError::SubmissionNotFound(*submission_id))?;

    let verified = ledger
        .verify_evaluation(
            &record.submission_id,
            &record.resume_hash,
            &record.model_hash,
            &record.score_hash,
            &record.job_id,
        )
        .await;

    Ok(SubmissionStatus {
        submission_id: record.submission_id,
        decision: record.decision,
        disposition: record.disposition,
        claimed: record.claimed,
        tx_hash: record.transaction_reference,
        anchor: record.anchor,
        verified,
    })
}
