use anyhow::{Context, Result, anyhow};
use storage::services::versioning::RestorePolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub restore_policy: RestorePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            restore_policy: std::env::var("RESTORE_POLICY")
                .unwrap_or_else(|_| "recreate".to_string())
                .parse()
                .map_err(|e: String| anyhow!(e))?,
        })
    }
}
