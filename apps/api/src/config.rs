use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use ethers::types::Address;

use crate::decision::{DEFAULT_AUTO_FAIL_THRESHOLD, DEFAULT_AUTO_PASS_THRESHOLD};
use crate::ledger::{Latency, LedgerConfig};

const DEFAULT_RPC_URL: &str = "https://rpc.sepolia.org";
const DEFAULT_FACTORY_ADDRESS: &str = "0x04E2AF7018Eada81e583425A4eB6Da6b1f116c7d";
const SEPOLIA_CHAIN_ID: u64 = 11155111;

/// Application configuration loaded from environment variables.
/// Everything has a default: without a database the store is in-memory,
/// and without a signing key the ledger is simulated.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub database_url: Option<String>,
    pub ledger: LedgerConfig,
    pub auto_pass_threshold: f64,
    pub auto_fail_threshold: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let factory = env_or("FACTORY_CONTRACT_ADDRESS", DEFAULT_FACTORY_ADDRESS);
        let ledger = LedgerConfig {
            rpc_url: env_or("LEDGER_RPC_URL", DEFAULT_RPC_URL),
            private_key: optional_env("LEDGER_PRIVATE_KEY"),
            factory_address: Address::from_str(&factory).map_err(|e| {
                anyhow::anyhow!("FACTORY_CONTRACT_ADDRESS '{factory}' is not an address: {e}")
            })?,
            chain_id: parse_env("LEDGER_CHAIN_ID", SEPOLIA_CHAIN_ID)?,
            probe_timeout: Duration::from_secs(parse_env("LEDGER_PROBE_TIMEOUT_SECS", 10)?),
            finality_timeout: Duration::from_secs(parse_env("LEDGER_FINALITY_TIMEOUT_SECS", 120)?),
            max_submit_retries: parse_env("LEDGER_MAX_SUBMIT_RETRIES", 3)?,
            simulated_latency: Latency::from_millis(parse_env("SIMULATED_LATENCY_MS", 0)?),
        };

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            database_url: optional_env("DATABASE_URL"),
            ledger,
            auto_pass_threshold: parse_env("AUTO_PASS_THRESHOLD", DEFAULT_AUTO_PASS_THRESHOLD)?,
            auto_fail_threshold: parse_env("AUTO_FAIL_THRESHOLD", DEFAULT_AUTO_FAIL_THRESHOLD)?,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}
