use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::Address;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

use super::{CommitmentStore, PutOutcome, StoreError};
use crate::decision::Decision;
use crate::hashing::{address_hex, Hash32};
use crate::models::job::{JobContractBinding, JobDescriptor, LedgerMode};
use crate::models::submission::{Anchor, CommitmentRecord, Disposition, SubmissionFilter};

/// PostgreSQL-backed store. Write-once semantics come from
/// `INSERT … ON CONFLICT DO NOTHING` on the primary keys.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Commitment store migrations applied");
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct JobRow {
    job_id: String,
    contract_address: String,
    job_config_hash: String,
    title: String,
    description: String,
    requirements: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    ledger_mode: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct CommitmentRow {
    submission_id: String,
    job_id: String,
    resume_hash: String,
    model_hash: String,
    score_hash: String,
    encrypted_contact_hash: String,
    encrypted_contact: Option<String>,
    wallet_address: String,
    similarity_score: f64,
    decision: String,
    disposition: String,
    claimed: bool,
    transaction_reference: String,
    anchor: String,
    created_at: DateTime<Utc>,
}

fn corrupt(key: &str, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_hash(key: &str, field: &str, value: &str) -> Result<Hash32, StoreError> {
    value
        .parse()
        .map_err(|e| corrupt(key, format!("{field}: {e}")))
}

fn parse_address(key: &str, field: &str, value: &str) -> Result<Address, StoreError> {
    Address::from_str(value).map_err(|e| corrupt(key, format!("{field}: {e}")))
}

impl TryFrom<JobRow> for JobContractBinding {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let key = row.job_id.as_str();
        Ok(JobContractBinding {
            contract_address: parse_address(key, "contract_address", &row.contract_address)?,
            job_config_hash: parse_hash(key, "job_config_hash", &row.job_config_hash)?,
            ledger_mode: LedgerMode::parse(&row.ledger_mode)
                .ok_or_else(|| corrupt(key, format!("ledger_mode: {}", row.ledger_mode)))?,
            descriptor: JobDescriptor {
                title: row.title,
                description: row.description,
                requirements: row.requirements,
                location: row.location,
                salary: row.salary,
            },
            created_at: row.created_at,
            job_id: row.job_id,
        })
    }
}

impl TryFrom<CommitmentRow> for CommitmentRecord {
    type Error = StoreError;

    fn try_from(row: CommitmentRow) -> Result<Self, Self::Error> {
        let key = row.submission_id.as_str();
        Ok(CommitmentRecord {
            submission_id: parse_hash(key, "submission_id", &row.submission_id)?,
            resume_hash: parse_hash(key, "resume_hash", &row.resume_hash)?,
            model_hash: parse_hash(key, "model_hash", &row.model_hash)?,
            score_hash: parse_hash(key, "score_hash", &row.score_hash)?,
            encrypted_contact_hash: parse_hash(
                key,
                "encrypted_contact_hash",
                &row.encrypted_contact_hash,
            )?,
            wallet_address: parse_address(key, "wallet_address", &row.wallet_address)?,
            decision: Decision::parse(&row.decision)
                .ok_or_else(|| corrupt(key, format!("decision: {}", row.decision)))?,
            disposition: Disposition::parse(&row.disposition)
                .ok_or_else(|| corrupt(key, format!("disposition: {}", row.disposition)))?,
            anchor: Anchor::parse(&row.anchor)
                .ok_or_else(|| corrupt(key, format!("anchor: {}", row.anchor)))?,
            job_id: row.job_id,
            encrypted_contact: row.encrypted_contact,
            similarity_score: row.similarity_score,
            claimed: row.claimed,
            transaction_reference: row.transaction_reference,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl CommitmentStore for PgStore {
    async fn put_job(&self, binding: JobContractBinding) -> Result<JobContractBinding, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO job_bindings
                (job_id, contract_address, job_config_hash, title, description,
                 requirements, location, salary, ledger_mode, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (job_id) DO NOTHING
            "#,
        )
        .bind(&binding.job_id)
        .bind(address_hex(&binding.contract_address))
        .bind(binding.job_config_hash.to_string())
        .bind(&binding.descriptor.title)
        .bind(&binding.descriptor.description)
        .bind(&binding.descriptor.requirements)
        .bind(&binding.descriptor.location)
        .bind(&binding.descriptor.salary)
        .bind(binding.ledger_mode.as_str())
        .bind(binding.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Job {} already bound; keeping original binding", binding.job_id);
        }

        self.get_job(&binding.job_id)
            .await?
            .ok_or_else(|| corrupt(&binding.job_id, "binding vanished after insert"))
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<JobContractBinding>, StoreError> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM job_bindings WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .map(JobContractBinding::try_from)
            .transpose()
    }

    async fn list_jobs(&self) -> Result<Vec<JobContractBinding>, StoreError> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM job_bindings ORDER BY created_at, job_id")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(JobContractBinding::try_from)
            .collect()
    }

    async fn put_submission(&self, record: CommitmentRecord) -> Result<PutOutcome, StoreError> {
        let inserted = sqlx::query_as::<_, CommitmentRow>(
            r#"
            INSERT INTO commitments
                (submission_id, job_id, resume_hash, model_hash, score_hash,
                 encrypted_contact_hash, encrypted_contact, wallet_address,
                 similarity_score, decision, disposition, claimed,
                 transaction_reference, anchor, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (submission_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(record.submission_id.to_string())
        .bind(&record.job_id)
        .bind(record.resume_hash.to_string())
        .bind(record.model_hash.to_string())
        .bind(record.score_hash.to_string())
        .bind(record.encrypted_contact_hash.to_string())
        .bind(&record.encrypted_contact)
        .bind(address_hex(&record.wallet_address))
        .bind(record.similarity_score)
        .bind(record.decision.as_str())
        .bind(record.disposition.as_str())
        .bind(record.claimed)
        .bind(&record.transaction_reference)
        .bind(record.anchor.as_str())
        .bind(record.created_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(PutOutcome::Inserted(row.try_into()?));
        }

        debug!(
            "Submission {} already stored; keeping original record",
            record.submission_id
        );
        self.get_submission(&record.submission_id)
            .await?
            .map(PutOutcome::Existing)
            .ok_or_else(|| corrupt(&record.submission_id.to_string(), "conflicting row vanished"))
    }

    async fn get_submission(
        &self,
        submission_id: &Hash32,
    ) -> Result<Option<CommitmentRecord>, StoreError> {
        sqlx::query_as::<_, CommitmentRow>("SELECT * FROM commitments WHERE submission_id = $1")
            .bind(submission_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(CommitmentRecord::try_from)
            .transpose()
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<CommitmentRecord>, StoreError> {
        sqlx::query_as::<_, CommitmentRow>(
            r#"
            SELECT * FROM commitments
            WHERE ($1::TEXT IS NULL OR job_id = $1)
              AND ($2::TEXT IS NULL OR wallet_address = $2)
            ORDER BY created_at, submission_id
            "#,
        )
        .bind(filter.job_id.as_deref())
        .bind(filter.wallet_address.as_ref().map(address_hex))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(CommitmentRecord::try_from)
        .collect()
    }

    async fn set_disposition(
        &self,
        submission_id: &Hash32,
        disposition: Disposition,
    ) -> Result<Option<CommitmentRecord>, StoreError> {
        sqlx::query_as::<_, CommitmentRow>(
            "UPDATE commitments SET disposition = $2 WHERE submission_id = $1 RETURNING *",
        )
        .bind(submission_id.to_string())
        .bind(disposition.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(CommitmentRecord::try_from)
        .transpose()
    }

    async fn mark_claimed(
        &self,
        submission_id: &Hash32,
    ) -> Result<Option<CommitmentRecord>, StoreError> {
        sqlx::query_as::<_, CommitmentRow>(
            "UPDATE commitments SET claimed = TRUE WHERE submission_id = $1 RETURNING *",
        )
        .bind(submission_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(CommitmentRecord::try_from)
        .transpose()
    }
}
