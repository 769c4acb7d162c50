use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::ledger::DEFAULT_MAX_APPEND_ATTEMPTS;

/// Optional config file, looked up in the working directory (any extension `config` supports).
pub const CONFIG_FILE: &str = "voter-ledger";

/// Environment variables override the file, e.g. `LEDGER_DATABASE_URL`.
pub const ENV_PREFIX: &str = "LEDGER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Attempts per append before giving up with `AppendConflict`.
    pub max_append_attempts: u32,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from(file: &str) -> Result<Self> {
        let config = Config::builder()
            .set_default("database_url", "sqlite://voter-ledger.db")?
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 3000_i64)?
            .set_default("max_append_attempts", DEFAULT_MAX_APPEND_ATTEMPTS as i64)?
            .set_default("log_filter", "voter_ledger=debug,tower_http=debug")?
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(LedgerError::ConfigError(
                "database_url must not be empty".to_string(),
            ));
        }

        if self.max_append_attempts == 0 {
            return Err(LedgerError::ConfigError(
                "max_append_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
