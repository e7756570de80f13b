use std::sync::Arc;

use crate::decision::DecisionPolicy;
use crate::ledger::LedgerClient;
use crate::store::CommitmentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owned by `main`; every component reaches the store through this handle.
    pub store: Arc<dyn CommitmentStore>,
    /// Live or simulated, fixed at startup.
    pub ledger: Arc<dyn LedgerClient>,
    pub policy: DecisionPolicy,
}
