//! Commitment Store: job bindings and submission records.
//!
//! Hash fields are write-once: `put_submission` is a compare-and-set keyed on
//! `submission_id`, and a losing writer gets the winner's record back.
//! `AppState` holds an `Arc<dyn CommitmentStore>`, chosen at startup.

use async_trait::async_trait;
use thiserror::Error;

use crate::hashing::Hash32;
use crate::models::job::JobContractBinding;
use crate::models::submission::{CommitmentRecord, Disposition, SubmissionFilter};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Corrupt row for {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Result of a write-once insert.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    Inserted(CommitmentRecord),
    /// A record already existed; it is returned unchanged.
    Existing(CommitmentRecord),
}

impl PutOutcome {
    pub fn record(&self) -> &CommitmentRecord {
        match self {
            PutOutcome::Inserted(r) | PutOutcome::Existing(r) => r,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, PutOutcome::Inserted(_))
    }
}

#[async_trait]
pub trait CommitmentStore: Send + Sync {
    /// Write-once. Returns whichever binding ends up stored for the job id.
    async fn put_job(&self, binding: JobContractBinding) -> Result<JobContractBinding, StoreError>;

    async fn get_job(&self, job_id: &str) -> Result<Option<JobContractBinding>, StoreError>;

    async fn list_jobs(&self) -> Result<Vec<JobContractBinding>, StoreError>;

    async fn put_submission(&self, record: CommitmentRecord) -> Result<PutOutcome, StoreError>;

    async fn get_submission(
        &self,
        submission_id: &Hash32,
    ) -> Result<Option<CommitmentRecord>, StoreError>;

    /// Ordered by `created_at`, then submission id.
    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<CommitmentRecord>, StoreError>;

    /// Last write wins on the disposition field. `None` if the id is unknown.
    async fn set_disposition(
        &self,
        submission_id: &Hash32,
        disposition: Disposition,
    ) -> Result<Option<CommitmentRecord>, StoreError>;

    /// Sets the claim flag. Never cleared.
    async fn mark_claimed(
        &self,
        submission_id: &Hash32,
    ) -> Result<Option<CommitmentRecord>, StoreError>;
}
