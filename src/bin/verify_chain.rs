use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use voter_ledger::database::Database;
use voter_ledger::ledger::{ChainService, SqliteLedgerStore};

/// Verify the integrity of a voter ledger database
#[derive(Parser, Debug)]
#[command(name = "verify-chain", version, about)]
struct Args {
    /// SQLite URL of the ledger database
    #[arg(short, long, env = "LEDGER_DATABASE_URL")]
    database_url: String,

    /// Print the verification result as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Verifying ledger: {}", args.database_url);

    let database = Database::open_read_only(&args.database_url).await?;
    let chain = ChainService::new(Arc::new(SqliteLedgerStore::new(database.pool().clone())));
    let result = chain.verify_detailed().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.valid {
        println!("✓ Ledger valid: {} block(s)", result.length);
    } else {
        println!(
            "✗ Ledger broken at block {}: {}",
            result.first_invalid.unwrap_or_default(),
            result.reason.as_deref().unwrap_or("unknown")
        );
    }

    if !result.valid {
        error!("Ledger verification failed");
        std::process::exit(1);
    }

    Ok(())
}
