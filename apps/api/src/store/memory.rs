use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CommitmentStore, PutOutcome, StoreError};
use crate::hashing::Hash32;
use crate::models::job::JobContractBinding;
use crate::models::submission::{CommitmentRecord, Disposition, SubmissionFilter};

/// In-process store. Read-your-writes within one process; no durability.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<String, JobContractBinding>>,
    submissions: RwLock<HashMap<Hash32, CommitmentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommitmentStore for MemoryStore {
    async fn put_job(&self, binding: JobContractBinding) -> Result<JobContractBinding, StoreError> {
        let mut jobs = self.jobs.write().await;
        let stored = jobs.entry(binding.job_id.clone()).or_insert(binding);
        Ok(stored.clone())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<JobContractBinding>, StoreError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn list_jobs(&self) -> Result<Vec<JobContractBinding>, StoreError> {
        let mut jobs: Vec<_> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        Ok(jobs)
    }

    async fn put_submission(&self, record: CommitmentRecord) -> Result<PutOutcome, StoreError> {
        let mut submissions = self.submissions.write().await;
        match submissions.entry(record.submission_id) {
            Entry::Occupied(existing) => {
                debug!(
                    "Submission {} already stored; keeping original record",
                    record.submission_id
                );
                Ok(PutOutcome::Existing(existing.get().clone()))
            }
            Entry::Vacant(slot) => Ok(PutOutcome::Inserted(slot.insert(record).clone())),
        }
    }

    async fn get_submission(
        &self,
        submission_id: &Hash32,
    ) -> Result<Option<CommitmentRecord>, StoreError> {
        Ok(self.submissions.read().await.get(submission_id).cloned())
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<CommitmentRecord>, StoreError> {
        let mut records: Vec<_> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.submission_id.cmp(&b.submission_id))
        });
        Ok(records)
    }

    async fn set_disposition(
        &self,
        submission_id: &Hash32,
        disposition: Disposition,
    ) -> Result<Option<CommitmentRecord>, StoreError> {
        let mut submissions = self.submissions.write().await;
        Ok(submissions.get_mut(submission_id).map(|record| {
            record.disposition = disposition;
            record.clone()
        }))
    }

    async fn mark_claimed(
        &self,
        submission_id: &Hash32,
    ) -> Result<Option<CommitmentRecord>, StoreError> {
        let mut submissions = self.submissions.write().await;
        Ok(submissions.get_mut(submission_id).map(|record| {
            record.claimed = true;
            record.clone()
        }))
    }
}
