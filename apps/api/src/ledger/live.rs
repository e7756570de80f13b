use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::abi::Detokenize;
use ethers::contract::ContractCall;
use ethers::middleware::{NonceManagerMiddleware, SignerMiddleware};
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, H256, U64};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::contracts::{JobContract, JobFactory, EVALUATION_GAS, JOB_CREATION_GAS};
use super::{
    commitment_record, job_binding, persist_commitment, require_job, transition, CommitReceipt,
    EvaluationCommit, LedgerClient, LedgerConfig, LedgerError,
};
use crate::hashing::{self, EvaluationDigests, Hash32};
use crate::models::job::{JobContractBinding, JobDescriptor, LedgerMode};
use crate::models::submission::{Anchor, CommitmentRecord, Disposition};
use crate::store::CommitmentStore;

pub type SignerClient = NonceManagerMiddleware<SignerMiddleware<Provider<Http>, LocalWallet>>;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Outcome of a submitted transaction once the finality wait ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finality {
    Finalized(H256),
    AwaitingFinality(H256),
}

/// Ledger backed by a live EVM network through a signing, nonce-managed client.
pub struct LiveLedger<M = SignerClient> {
    client: Arc<M>,
    factory: JobFactory<M>,
    signer: Address,
    store: Arc<dyn CommitmentStore>,
    finality_timeout: Duration,
    max_submit_retries: u32,
    /// One commit per submission id at a time, so only one transaction is sent for it.
    in_flight: Mutex<HashMap<Hash32, Arc<Mutex<()>>>>,
}

impl LiveLedger<SignerClient> {
    /// Loads the signing key and probes the endpoint. Any failure here means
    /// the caller should run simulated for the lifetime of the process.
    pub async fn connect(
        config: &LedgerConfig,
        private_key: &str,
        store: Arc<dyn CommitmentStore>,
    ) -> Result<Self, LedgerError> {
        let wallet: LocalWallet = private_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| LedgerError::Unavailable(format!("invalid signing key: {e}")))?;

        let url = reqwest::Url::parse(&config.rpc_url)
            .map_err(|e| LedgerError::Unavailable(format!("invalid RPC URL: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .build()
            .map_err(|e| LedgerError::Unavailable(format!("HTTP client: {e}")))?;
        let provider = Provider::new(Http::new_with_client(url, http)).interval(POLL_INTERVAL);

        let chain_id = tokio::time::timeout(config.probe_timeout, provider.get_chainid())
            .await
            .map_err(|_| {
                LedgerError::Unavailable(format!(
                    "{} did not answer within {:?}",
                    config.rpc_url, config.probe_timeout
                ))
            })?
            .map_err(|e| LedgerError::Unavailable(format!("{}: {e}", config.rpc_url)))?
            .as_u64();

        if chain_id != config.chain_id {
            warn!(
                "Endpoint reports chain id {chain_id}, configured {}; signing for {chain_id}",
                config.chain_id
            );
        }

        let wallet = wallet.with_chain_id(chain_id);
        let signer = wallet.address();
        let client = Arc::new(NonceManagerMiddleware::new(
            SignerMiddleware::new(provider, wallet),
            signer,
        ));

        Ok(Self::with_client(client, signer, config, store))
    }
}

impl<M: Middleware + 'static> LiveLedger<M> {
    pub fn with_client(
        client: Arc<M>,
        signer: Address,
        config: &LedgerConfig,
        store: Arc<dyn CommitmentStore>,
    ) -> Self {
        Self {
            factory: JobFactory::new(config.factory_address, client.clone()),
            client,
            signer,
            store,
            finality_timeout: config.finality_timeout,
            max_submit_retries: config.max_submit_retries.max(1),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn signer_address(&self) -> Address {
        self.signer
    }

    /// Sends a transaction with bounded retries, then waits for finality.
    /// Submission errors are retried; once a hash exists the wait is never
    /// retried, and a timeout reports the transaction as still pending.
    async fn submit<D>(
        &self,
        label: &str,
        call: ContractCall<M, D>,
    ) -> Result<Finality, LedgerError>
    where
        D: Detokenize + Send + Sync,
    {
        let mut last_error = String::new();

        for attempt in 0..self.max_submit_retries {
            if attempt > 0 {
                let delay = retry_delay(attempt);
                warn!(
                    "{label} submission attempt {attempt} failed, retrying after {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let pending = match call.send().await {
                Ok(pending) => pending,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            let tx_hash = pending.tx_hash();
            info!("{label} submitted as {}", transaction_reference(tx_hash));

            return match tokio::time::timeout(self.finality_timeout, pending).await {
                Err(_) => Ok(Finality::AwaitingFinality(tx_hash)),
                Ok(Err(e)) => {
                    warn!("{label}: receipt poll failed ({e}); transaction may still land");
                    Ok(Finality::AwaitingFinality(tx_hash))
                }
                Ok(Ok(None)) => Err(LedgerError::Unavailable(format!(
                    "{} dropped before inclusion",
                    transaction_reference(tx_hash)
                ))),
                Ok(Ok(Some(receipt))) if receipt.status == Some(U64::from(1)) => {
                    Ok(Finality::Finalized(tx_hash))
                }
                Ok(Ok(Some(_))) => Err(LedgerError::Reverted(transaction_reference(tx_hash))),
            };
        }

        Err(LedgerError::Unavailable(format!(
            "{label} not submitted after {} attempts: {last_error}",
            self.max_submit_retries
        )))
    }

    /// Returns the factory's contract for the config hash, creating it if needed.
    async fn deploy_job(&self, job_id: &str, config_hash: &Hash32) -> Result<Address, LedgerError> {
        let existing = self
            .factory
            .get_job_by_config_hash(config_hash.0)
            .call()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        if !existing.is_zero() {
            info!(
                "Job {job_id} already deployed at {}",
                hashing::address_hex(&existing)
            );
            return Ok(existing);
        }

        let call = self
            .factory
            .create_job(config_hash.0, Bytes::default())
            .gas(JOB_CREATION_GAS);
        match self.submit("createJob", call).await? {
            Finality::Finalized(_) => {}
            Finality::AwaitingFinality(tx) => {
                debug!("createJob {} not final", transaction_reference(tx));
                return Err(LedgerError::Timeout(self.finality_timeout));
            }
        }

        let address = self
            .factory
            .get_job_by_config_hash(config_hash.0)
            .call()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        if address.is_zero() {
            return Err(LedgerError::Unavailable(format!(
                "factory has no contract for {job_id} after createJob"
            )));
        }
        Ok(address)
    }

    async fn lock_submission(&self, submission_id: Hash32) -> OwnedMutexGuard<()> {
        let slot = self
            .in_flight
            .lock()
            .await
            .entry(submission_id)
            .or_default()
            .clone();
        slot.lock_owned().await
    }

    /// Sends `commitEvaluation` unless a record already exists, and persists the outcome.
    async fn commit_locked(
        &self,
        binding: &JobContractBinding,
        commit: &EvaluationCommit,
    ) -> Result<CommitReceipt, LedgerError> {
        if let Some(existing) = self.store.get_submission(&commit.submission_id).await? {
            debug!("Submission {} already committed", commit.submission_id);
            return Ok(CommitReceipt::from(&existing));
        }

        let digests = EvaluationDigests::compute(&commit.job_id, &commit.evaluation);
        let contact_hash = hashing::digest_contact(commit.encrypted_contact.as_deref());
        let fallback_reference =
            hashing::simulated_transaction_reference(&commit.submission_id, &commit.wallet_address);

        let (reference, anchor) = if binding.ledger_mode == LedgerMode::Simulated {
            warn!(
                "Job {} has no live contract; recording {} unanchored",
                commit.job_id, commit.submission_id
            );
            (fallback_reference, Anchor::Unanchored)
        } else {
            let contract = JobContract::new(binding.contract_address, self.client.clone());
            let call = contract
                .commit_evaluation(
                    commit.submission_id.0,
                    digests.resume_hash.0,
                    digests.model_hash.0,
                    digests.score_hash.0,
                    contact_hash.0,
                )
                .gas(EVALUATION_GAS);

            match self.submit("commitEvaluation", call).await {
                Ok(Finality::Finalized(tx)) => (transaction_reference(tx), Anchor::Finalized),
                Ok(Finality::AwaitingFinality(tx)) => {
                    warn!(
                        "Commitment {} still pending after {:?}",
                        commit.submission_id, self.finality_timeout
                    );
                    (transaction_reference(tx), Anchor::AwaitingFinality)
                }
                Err(e) => {
                    warn!(
                        "Commitment {} not anchored ({e}); recording ledger-unconfirmed state",
                        commit.submission_id
                    );
                    (fallback_reference, Anchor::Unanchored)
                }
            }
        };

        let record = commitment_record(commit, &digests, reference, anchor);
        persist_commitment(self.store.as_ref(), record).await
    }
}

fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << (attempt.saturating_sub(1)).min(6)))
}

fn transaction_reference(tx_hash: H256) -> String {
    Hash32(tx_hash.0).to_string()
}

#[async_trait]
impl<M: Middleware + 'static> LedgerClient for LiveLedger<M> {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Live
    }

    async fn commit_job(
        &self,
        descriptor: &JobDescriptor,
    ) -> Result<JobContractBinding, LedgerError> {
        let config_hash = hashing::job_config_hash(descriptor);
        let job_id = hashing::derive_job_id(&config_hash);

        if let Some(existing) = self.store.get_job(&job_id).await? {
            return Ok(existing);
        }

        let (address, mode) = match self.deploy_job(&job_id, &config_hash).await {
            Ok(address) => (address, LedgerMode::Live),
            Err(e) => {
                warn!("Live job creation for {job_id} failed ({e}); binding simulated address");
                (hashing::simulated_contract_address(&job_id), LedgerMode::Simulated)
            }
        };

        let binding = job_binding(descriptor, config_hash, job_id, address, mode);
        Ok(self.store.put_job(binding).await?)
    }

    async fn commit_evaluation(
        &self,
        commit: EvaluationCommit,
    ) -> Result<CommitReceipt, LedgerError> {
        let binding = require_job(self.store.as_ref(), &commit.job_id).await?;

        let _slot = self.lock_submission(commit.submission_id).await;
        let result = self.commit_locked(&binding, &commit).await;
        // The record is stored before the slot is released, so a later caller finds it.
        self.in_flight.lock().await.remove(&commit.submission_id);
        result
    }

    async fn verify_evaluation(
        &self,
        submission_id: &Hash32,
        resume_hash: &Hash32,
        model_hash: &Hash32,
        score_hash: &Hash32,
        job_id: &str,
    ) -> bool {
        let binding = match self.store.get_job(job_id).await {
            Ok(Some(binding)) if binding.ledger_mode == LedgerMode::Live => binding,
            Ok(Some(_)) => {
                debug!("Job {job_id} has no live contract; {submission_id} unverifiable");
                return false;
            }
            Ok(None) => return false,
            Err(e) => {
                warn!("Job lookup for {job_id} failed during verification: {e}");
                return false;
            }
        };

        let contract = JobContract::new(binding.contract_address, self.client.clone());
        match contract.get_evaluation(submission_id.0).call().await {
            Ok((resume, model, score, _contact, _timestamp, exists)) => {
                exists && resume == resume_hash.0 && model == model_hash.0 && score == score_hash.0
            }
            Err(e) => {
                warn!("Reading commitment {submission_id} from ledger failed: {e}");
                false
            }
        }
    }

    async fn mark_accepted(&self, submission_id: &Hash32) -> Result<CommitmentRecord, LedgerError> {
        // TODO: back this with an authenticated contract call once the job
        // contract exposes an acceptance entry point.
        transition(self.store.as_ref(), submission_id, Disposition::Accepted).await
    }

    async fn mark_rejected(&self, submission_id: &Hash32) -> Result<CommitmentRecord, LedgerError> {
        transition(self.store.as_ref(), submission_id, Disposition::Rejected).await
    }
}
