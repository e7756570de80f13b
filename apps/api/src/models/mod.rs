pub mod job;
pub mod submission;

use std::str::FromStr;

use ethers::types::Address;

use crate::errors::AppError;
use crate::hashing::Hash32;

/// Parses a `0x`-prefixed account at the request boundary.
pub fn parse_wallet(field: &str, value: &str) -> Result<Address, AppError> {
    let digits = value
        .trim()
        .strip_prefix("0x")
        .or_else(|| value.trim().strip_prefix("0X"))
        .ok_or_else(|| AppError::Validation(format!("{field} must start with 0x")))?;
    Address::from_str(digits).map_err(|e| AppError::Validation(format!("{field}: {e}")))
}

pub fn parse_hash(field: &str, value: &str) -> Result<Hash32, AppError> {
    value
        .trim()
        .parse()
        .map_err(|e| AppError::Validation(format!("{field}: {e}")))
}

pub fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
