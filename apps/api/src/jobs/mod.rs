//! Job registration: validates a posting and binds it to a ledger contract.

pub mod handlers;

use serde::Deserialize;

use crate::errors::AppError;
use crate::models::job::JobDescriptor;
use crate::models::require_text;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
}

impl CreateJobRequest {
    pub fn into_descriptor(self) -> Result<JobDescriptor, AppError> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        Ok(JobDescriptor {
            title: self.title,
            description: self.description,
            requirements: self.requirements,
            location: self.location,
            salary: self.salary,
        })
    }
}
