mod claim;
mod config;
mod db;
mod decision;
mod errors;
mod evaluation;
mod hashing;
mod jobs;
mod ledger;
mod models;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::decision::DecisionPolicy;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{CommitmentStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting BlindHire API v{}", env!("CARGO_PKG_VERSION"));

    let policy = DecisionPolicy::new(config.auto_pass_threshold, config.auto_fail_threshold)
        .map_err(|e| anyhow::anyhow!("Invalid decision thresholds: {e}"))?;

    // Commitment store: PostgreSQL when configured, in-memory otherwise
    let store: Arc<dyn CommitmentStore> = match &config.database_url {
        Some(url) => {
            let pg = PgStore::new(create_pool(url).await?);
            pg.migrate().await?;
            info!("Commitment store: PostgreSQL");
            Arc::new(pg)
        }
        None => {
            info!("DATABASE_URL not set; commitments are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    // Ledger mode is decided once here and never changes afterwards
    let ledger = ledger::connect(&config.ledger, store.clone()).await;
    info!("Ledger mode: {}", ledger.mode());

    let state = AppState {
        store,
        ledger,
        policy,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the recruiter frontend domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
