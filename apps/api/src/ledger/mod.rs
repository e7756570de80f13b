//! Ledger Client: anchors job bindings and evaluation commitments.
//!
//! Two implementations sit behind `LedgerClient`:
//! - `LiveLedger` signs and submits transactions to an EVM network and waits for finality.
//! - `SimulatedLedger` derives structurally valid identifiers in-process.
//!
//! `connect` picks one at startup and the choice holds for the process lifetime.
//! Live-path failures after startup do not switch modes; they produce records
//! tagged with an explicit `Anchor` and a `warn!` event.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ethers::types::Address;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::decision::Decision;
use crate::hashing::{self, EvaluationDigests, Hash32};
use crate::models::job::{JobContractBinding, JobDescriptor, LedgerMode};
use crate::models::submission::{Anchor, CommitmentRecord, Disposition, EvaluationResult};
use crate::store::{CommitmentStore, StoreError};

pub mod contracts;
pub mod live;
pub mod simulated;

pub use live::LiveLedger;
pub use simulated::{Latency, SimulatedLedger};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Submission not found: {0}")]
    SubmissionNotFound(Hash32),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out after {0:?} waiting for finality")]
    Timeout(Duration),

    #[error("Transaction {0} reverted")]
    Reverted(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything needed to commit one evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationCommit {
    pub submission_id: Hash32,
    pub evaluation: EvaluationResult,
    pub wallet_address: Address,
    pub job_id: String,
    pub encrypted_contact: Option<String>,
}

/// What was actually committed under a submission id. On a repeat commit this
/// describes the first writer's record, not the caller's input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitReceipt {
    pub submission_id: Hash32,
    pub similarity_score: f64,
    pub decision: Decision,
    pub transaction_reference: String,
    pub anchor: Anchor,
}

impl From<&CommitmentRecord> for CommitReceipt {
    fn from(record: &CommitmentRecord) -> Self {
        Self {
            submission_id: record.submission_id,
            similarity_score: record.similarity_score,
            decision: record.decision,
            transaction_reference: record.transaction_reference.clone(),
            anchor: record.anchor,
        }
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    fn mode(&self) -> LedgerMode;

    async fn commit_job(&self, descriptor: &JobDescriptor)
        -> Result<JobContractBinding, LedgerError>;

    /// Persists a `pending` record before returning. Repeated calls for the same
    /// submission id return the first receipt.
    async fn commit_evaluation(&self, commit: EvaluationCommit)
        -> Result<CommitReceipt, LedgerError>;

    /// `false` when the contract or record cannot be found.
    async fn verify_evaluation(
        &self,
        submission_id: &Hash32,
        resume_hash: &Hash32,
        model_hash: &Hash32,
        score_hash: &Hash32,
        job_id: &str,
    ) -> bool;

    async fn mark_accepted(&self, submission_id: &Hash32)
        -> Result<CommitmentRecord, LedgerError>;

    async fn mark_rejected(&self, submission_id: &Hash32)
        -> Result<CommitmentRecord, LedgerError>;
}

/// Connection settings for the live network.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub private_key: Option<String>,
    pub factory_address: Address,
    pub chain_id: u64,
    pub probe_timeout: Duration,
    pub finality_timeout: Duration,
    pub max_submit_retries: u32,
    pub simulated_latency: Latency,
}

/// Chooses the ledger implementation once, at startup.
pub async fn connect(
    config: &LedgerConfig,
    store: Arc<dyn CommitmentStore>,
) -> Arc<dyn LedgerClient> {
    let simulated = |reason: &str| -> Arc<dyn LedgerClient> {
        warn!("Ledger running in simulated mode: {reason}");
        Arc::new(SimulatedLedger::new(store.clone(), config.simulated_latency))
    };

    let Some(key) = config
        .private_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
    else {
        return simulated("no signing key configured");
    };

    match LiveLedger::connect(config, key, store.clone()).await {
        Ok(live) => {
            info!(
                "Ledger running in live mode (signer {}, factory {})",
                hashing::address_hex(&live.signer_address()),
                hashing::address_hex(&config.factory_address)
            );
            Arc::new(live)
        }
        Err(e) => simulated(&e.to_string()),
    }
}

/// Builds the job binding both implementations persist.
pub(crate) fn job_binding(
    descriptor: &JobDescriptor,
    config_hash: Hash32,
    job_id: String,
    contract_address: Address,
    ledger_mode: LedgerMode,
) -> JobContractBinding {
    JobContractBinding {
        job_id,
        contract_address,
        job_config_hash: config_hash,
        descriptor: descriptor.clone(),
        ledger_mode,
        created_at: Utc::now(),
    }
}

/// Builds the record for a commitment. Hash fields come from the canonical hasher.
pub(crate) fn commitment_record(
    commit: &EvaluationCommit,
    digests: &EvaluationDigests,
    transaction_reference: String,
    anchor: Anchor,
) -> CommitmentRecord {
    CommitmentRecord {
        submission_id: commit.submission_id,
        job_id: commit.job_id.clone(),
        resume_hash: digests.resume_hash,
        model_hash: digests.model_hash,
        score_hash: digests.score_hash,
        encrypted_contact_hash: hashing::digest_contact(commit.encrypted_contact.as_deref()),
        encrypted_contact: commit.encrypted_contact.clone(),
        wallet_address: commit.wallet_address,
        similarity_score: hashing::round_score(commit.evaluation.similarity_score),
        decision: commit.evaluation.decision,
        disposition: Disposition::Pending,
        claimed: false,
        transaction_reference,
        anchor,
        created_at: Utc::now(),
    }
}

/// Write-once persist; a losing concurrent writer gets the winner's receipt.
pub(crate) async fn persist_commitment(
    store: &dyn CommitmentStore,
    record: CommitmentRecord,
) -> Result<CommitReceipt, LedgerError> {
    let outcome = store.put_submission(record).await?;
    if !outcome.was_inserted() {
        debug!(
            "Submission {} was committed concurrently; returning the stored record",
            outcome.record().submission_id
        );
    }
    Ok(CommitReceipt::from(outcome.record()))
}

pub(crate) async fn require_job(
    store: &dyn CommitmentStore,
    job_id: &str,
) -> Result<JobContractBinding, LedgerError> {
    store
        .get_job(job_id)
        .await?
        .ok_or_else(|| LedgerError::UnknownJob(job_id.to_string()))
}

pub(crate) async fn transition(
    store: &dyn CommitmentStore,
    submission_id: &Hash32,
    disposition: Disposition,
) -> Result<CommitmentRecord, LedgerError> {
    let record = store
        .set_disposition(submission_id, disposition)
        .await?
        .ok_or(LedgerError::SubmissionNotFound(*submission_id))?;
    info!("Submission {submission_id} marked {disposition}");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn config(private_key: Option<&str>, rpc_url: &str) -> LedgerConfig {
        LedgerConfig {
            rpc_url: rpc_url.to_string(),
            private_key: private_key.map(str::to_string),
            factory_address: Address::repeat_byte(0xfa),
            chain_id: 11155111,
            probe_timeout: Duration::from_millis(500),
            finality_timeout: Duration::from_secs(1),
            max_submit_retries: 1,
            simulated_latency: Latency::None,
        }
    }

    #[tokio::test]
    async fn test_missing_key_selects_simulated() {
        let store: Arc<dyn CommitmentStore> = Arc::new(MemoryStore::new());
        let ledger = connect(&config(None, "http://127.0.0.1:1"), store.clone()).await;
        assert_eq!(ledger.mode(), LedgerMode::Simulated);

        let blank = connect(&config(Some("  "), "http://127.0.0.1:1"), store).await;
        assert_eq!(blank.mode(), LedgerMode::Simulated);
    }

    #[tokio::test]
    async fn test_malformed_key_selects_simulated() {
        let store: Arc<dyn CommitmentStore> = Arc::new(MemoryStore::new());
        let ledger = connect(&config(Some("not-a-key"), "http://127.0.0.1:1"), store).await;
        assert_eq!(ledger.mode(), LedgerMode::Simulated);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back_end_to_end() {
        let store: Arc<dyn CommitmentStore> = Arc::new(MemoryStore::new());
        let key = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
        let ledger = connect(&config(Some(key), "http://127.0.0.1:1"), store.clone()).await;
        assert_eq!(ledger.mode(), LedgerMode::Simulated);

        let descriptor = JobDescriptor {
            title: "Data Engineer".to_string(),
            description: "Pipelines".to_string(),
            requirements: Some("SQL".to_string()),
            location: None,
            salary: None,
        };
        let binding = ledger.commit_job(&descriptor).await.unwrap();

        let evaluation = EvaluationResult {
            similarity_score: 0.81,
            decision: crate::decision::Decision::AutoPass,
            resume_hash: hashing::digest_resume("resume"),
            model_identifier: "all-MiniLM-L6-v2".to_string(),
        };
        let wallet = Address::repeat_byte(0x11);
        let submission_id =
            hashing::derive_submission_id(&wallet, &binding.job_id, &evaluation.resume_hash);
        let digests = EvaluationDigests::compute(&binding.job_id, &evaluation);
        ledger
            .commit_evaluation(EvaluationCommit {
                submission_id,
                evaluation,
                wallet_address: wallet,
                job_id: binding.job_id.clone(),
                encrypted_contact: None,
            })
            .await
            .unwrap();

        assert!(
            ledger
                .verify_evaluation(
                    &submission_id,
                    &digests.resume_hash,
                    &digests.model_hash,
                    &digests.score_hash,
                    &binding.job_id,
                )
                .await
        );
    }
}
