use std::fmt;

use chrono::{DateTime, Utc};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::decision::Decision;
use crate::hashing::Hash32;

/// Output of the external scorer for one resume. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub similarity_score: f64,
    pub decision: Decision,
    pub resume_hash: Hash32,
    pub model_identifier: String,
}

/// Recruiter disposition. Independent of the claim flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Pending,
    Accepted,
    Rejected,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Pending => "pending",
            Disposition::Accepted => "accepted",
            Disposition::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Disposition::Pending),
            "accepted" => Some(Disposition::Accepted),
            "rejected" => Some(Disposition::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a commitment is backed by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Live transaction mined with a success status.
    Finalized,
    /// Live transaction submitted; the finality wait timed out.
    AwaitingFinality,
    /// Produced by the simulated ledger.
    Simulated,
    /// Live submission failed; the record is local only.
    Unanchored,
}

impl Anchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::Finalized => "finalized",
            Anchor::AwaitingFinality => "awaiting_finality",
            Anchor::Simulated => "simulated",
            Anchor::Unanchored => "unanchored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "finalized" => Some(Anchor::Finalized),
            "awaiting_finality" => Some(Anchor::AwaitingFinality),
            "simulated" => Some(Anchor::Simulated),
            "unanchored" => Some(Anchor::Unanchored),
            _ => None,
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The committed artifact for one submission.
/// Hash fields are write-once; only `disposition` and `claimed` change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    pub submission_id: Hash32,
    pub job_id: String,
    pub resume_hash: Hash32,
    pub model_hash: Hash32,
    pub score_hash: Hash32,
    pub encrypted_contact_hash: Hash32,
    pub encrypted_contact: Option<String>,
    pub wallet_address: Address,
    pub similarity_score: f64,
    pub decision: Decision,
    pub disposition: Disposition,
    pub claimed: bool,
    pub transaction_reference: String,
    pub anchor: Anchor,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmissionFilter {
    pub job_id: Option<String>,
    pub wallet_address: Option<Address>,
}

impl SubmissionFilter {
    pub fn matches(&self, record: &CommitmentRecord) -> bool {
        self.job_id.as_deref().map_or(true, |j| record.job_id == j)
            && self
                .wallet_address
                .map_or(true, |w| record.wallet_address == w)
    }
}
