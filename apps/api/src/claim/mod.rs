//! Claim Verifier: proves a submitter owns a committed evaluation.
//!
//! The submitter signs `claim:<submission_id>` with their wallet as an EIP-191
//! personal message. Verification recovers the signing account and compares
//! it with the wallet stored on the record. Bad signatures are a failed claim,
//! never a fault.

use std::str::FromStr;

use ethers::types::{Address, Signature};
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;
use crate::hashing::Hash32;
use crate::store::CommitmentStore;

pub mod handlers;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Signer recovery failed: {0}")]
    Recovery(String),
}

/// The exact message a submitter signs.
pub fn claim_message(submission_id: &Hash32) -> String {
    format!("claim:{submission_id}")
}

pub fn recover_signer(message: &str, signature: &str) -> Result<Address, ClaimError> {
    let signature = Signature::from_str(signature.trim())
        .map_err(|e| ClaimError::MalformedSignature(e.to_string()))?;
    signature
        .recover(message)
        .map_err(|e| ClaimError::Recovery(e.to_string()))
}

/// True iff `signature` over the claim message recovers to the record's owner.
/// When `claimed_wallet` is given it must name that owner too.
pub async fn verify_claim(
    store: &dyn CommitmentStore,
    submission_id: &Hash32,
    signature: &str,
    claimed_wallet: Option<Address>,
) -> Result<bool, AppError> {
    let record = store
        .get_submission(submission_id)
        .await?
        .ok_or(AppError::SubmissionNotFound(*submission_id))?;

    if claimed_wallet.is_some_and(|w| w != record.wallet_address) {
        debug!("Claim for {submission_id} names a wallet other than the owner");
        return Ok(false);
    }

    match recover_signer(&claim_message(submission_id), signature) {
        // Address equality is byte equality, so checksum casing never matters.
        Ok(signer) => Ok(signer == record.wallet_address),
        Err(e) => {
            debug!("Claim for {submission_id} rejected: {e}");
            Ok(false)
        }
    }
}
