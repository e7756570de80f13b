use std::fmt;

use chrono::{DateTime, Utc};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::hashing::Hash32;

/// Which ledger path produced an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMode {
    Live,
    Simulated,
}

impl LedgerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerMode::Live => "live",
            LedgerMode::Simulated => "simulated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "live" => Some(LedgerMode::Live),
            "simulated" => Some(LedgerMode::Simulated),
            _ => None,
        }
    }
}

impl fmt::Display for LedgerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job posting. Only title, description and requirements identify the job;
/// location and salary ride along for the summary view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
}

/// Binds a job id to the contract authorized to receive its commitments.
/// Written once at job registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobContractBinding {
    pub job_id: String,
    pub contract_address: Address,
    pub job_config_hash: Hash32,
    pub descriptor: JobDescriptor,
    pub ledger_mode: LedgerMode,
    pub created_at: DateTime<Utc>,
}
