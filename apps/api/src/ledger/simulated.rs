use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{
    commitment_record, job_binding, persist_commitment, require_job, transition, CommitReceipt,
    EvaluationCommit, LedgerClient, LedgerError,
};
use crate::hashing::{self, EvaluationDigests, Hash32};
use crate::models::job::{JobContractBinding, JobDescriptor, LedgerMode};
use crate::models::submission::{Anchor, CommitmentRecord, Disposition};
use crate::store::CommitmentStore;

/// Artificial delay before simulated ledger writes. Only useful when a caller
/// needs realistic timing; correctness never depends on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Latency {
    #[default]
    None,
    Fixed(Duration),
}

impl Latency {
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Latency::None
        } else {
            Latency::Fixed(Duration::from_millis(ms))
        }
    }

    async fn wait(&self) {
        if let Latency::Fixed(d) = self {
            tokio::time::sleep(*d).await;
        }
    }
}

/// In-process ledger: deterministic identifiers, no cryptographic anchoring.
pub struct SimulatedLedger {
    store: Arc<dyn CommitmentStore>,
    latency: Latency,
}

impl SimulatedLedger {
    pub fn new(store: Arc<dyn CommitmentStore>, latency: Latency) -> Self {
        Self { store, latency }
    }
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Simulated
    }

    async fn commit_job(
        &self,
        descriptor: &JobDescriptor,
    ) -> Result<JobContractBinding, LedgerError> {
        let config_hash = hashing::job_config_hash(descriptor);
        let job_id = hashing::derive_job_id(&config_hash);
        let address = hashing::simulated_contract_address(&job_id);

        self.latency.wait().await;
        debug!(
            "Simulated contract {} for {job_id}",
            hashing::address_hex(&address)
        );

        let binding = job_binding(descriptor, config_hash, job_id, address, LedgerMode::Simulated);
        Ok(self.store.put_job(binding).await?)
    }

    async fn commit_evaluation(
        &self,
        commit: EvaluationCommit,
    ) -> Result<CommitReceipt, LedgerError> {
        require_job(self.store.as_ref(), &commit.job_id).await?;

        let digests = EvaluationDigests::compute(&commit.job_id, &commit.evaluation);
        let reference =
            hashing::simulated_transaction_reference(&commit.submission_id, &commit.wallet_address);

        self.latency.wait().await;

        let record = commitment_record(&commit, &digests, reference, Anchor::Simulated);
        persist_commitment(self.store.as_ref(), record).await
    }

    /// Nothing independent exists to contradict the local record.
    async fn verify_evaluation(
        &self,
        _submission_id: &Hash32,
        _resume_hash: &Hash32,
        _model_hash: &Hash32,
        _score_hash: &Hash32,
        _job_id: &str,
    ) -> bool {
        true
    }

    async fn mark_accepted(&self, submission_id: &Hash32) -> Result<CommitmentRecord, LedgerError> {
        transition(self.store.as_ref(), submission_id, Disposition::Accepted).await
    }

    async fn mark_rejected(&self, submission_id: &Hash32) -> Result<CommitmentRecord, LedgerError> {
        transition(self.store.as_ref(), submission_id, Disposition::Rejected).await
    }
}
