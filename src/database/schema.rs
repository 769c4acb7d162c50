// SQL schema for the ledger database, applied in order by `Database::run_migrations`.

pub const LEDGER_SCHEMA: &str = include_str!("../../migrations/001_ledger.sql");
pub const VOTERS_SCHEMA: &str = include_str!("../../migrations/002_voters.sql");

pub const MIGRATIONS: &[(&str, &str)] = &[
    ("001_ledger", LEDGER_SCHEMA),
    ("002_voters", VOTERS_SCHEMA),
];
