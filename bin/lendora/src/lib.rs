mod observability;

pub mod utility;

pub use lendora_primitives::error::ApiError;

use crate::utility::background_tasks::spawn_background_tasks;
use crate::utility::db_pool::{create_db_pool, run_migrations};
use crate::utility::logging::setup_logging;
use crate::utility::server::serve;
use crate::utility::tasks::{build_router, load_env, migrations_enabled};
use eyre::Report;
use lendora_core::AppState;
use lendora_primitives::models::app_state::AppConfig;
use tracing::info;

pub async fn run() -> Result<(), Report> {
    // 1. load environment variables
    load_env();

    // 2. initialize logging first (so we can log everything else)
    setup_logging();

    info!("Starting Lendora ledger service...");

    // 3. load configuration
    let config = AppConfig::from_env()?;

    // 4. create database connection pool
    let pool = create_db_pool()?;

    // 5. bring the schema up to date
    if migrations_enabled() {
        run_migrations(&pool)?;
    }

    // 6. build application state
    let state = AppState::new(pool, config)?;

    // 7. start reconciliation sweep and daily jobs
    spawn_background_tasks(state.clone());

    // 8. initialize metrics
    let (metric_layer, metric_handle) = observability::metrics::setup_metrics();

    // 9. build axum router
    let app = build_router(state, metric_layer, metric_handle)?;

    // 10. start HTTP server
    serve(app).await?;

    info!("Lendora shut down gracefully");
    Ok(())
}
