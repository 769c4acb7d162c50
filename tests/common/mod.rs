#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;
use voter_ledger::database::Database;
use voter_ledger::ledger::{ChainService, SqliteLedgerStore};

/// Setup an in-memory SQLite database for testing
pub async fn setup_test_db() -> Database {
    Database::new_in_memory()
        .await
        .expect("Failed to create test database")
}

/// On-disk database with a connection pool, for tests that need real
/// concurrent writers. Keep the returned `TempDir` alive for the test.
pub async fn setup_file_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("ledger.db").display());
    let db = Database::new(&url).await.expect("Failed to open database");
    db.run_migrations().await.expect("Failed to run migrations");
    (dir, db)
}

pub fn chain_for(db: &Database) -> ChainService<SqliteLedgerStore> {
    ChainService::new(Arc::new(SqliteLedgerStore::new(db.pool().clone())))
}

/// Genesis plus one block per payload.
pub async fn build_chain(db: &Database, payloads: &[&str]) -> ChainService<SqliteLedgerStore> {
    let chain = chain_for(db);
    chain.ensure_genesis().await.expect("genesis");
    for payload in payloads {
        chain.append(payload).await.expect("append");
    }
    chain
}
