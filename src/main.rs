use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voter_ledger::api::{self, AppState};
use voter_ledger::config::AppConfig;
use voter_ledger::database::Database;
use voter_ledger::ledger::{ChainService, SqliteLedgerStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so the log filter can come from it
    let config = AppConfig::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting voter ledger service");

    let database = Database::new(&config.database_url).await?;
    info!("Database connected");

    database.run_migrations().await?;
    info!("Database migrations completed");

    let store = Arc::new(SqliteLedgerStore::new(database.pool().clone()));
    let chain = ChainService::with_max_attempts(store, config.max_append_attempts);
    chain.ensure_genesis().await?;

    let status = chain.status().await?;
    info!(
        "Ledger ready: {} block(s), valid = {}",
        status.length, status.valid
    );

    let app = api::router(AppState::new(chain));

    let addr = config.bind_address();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
