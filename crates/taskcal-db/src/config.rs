//! Connection settings for the task database.

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::postgres::PgConnectOptions;

/// Database the server connects to when issuing `CREATE DATABASE`.
const MAINTENANCE_DB: &str = "postgres";

/// Where the task database lives.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// Used when neither the config file nor the environment names a URL.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/taskcal";

    /// Environment variable that overrides the config file URL.
    pub const ENV_VAR: &str = "TASKCAL_DATABASE_URL";

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Parse the URL. Host, port, credentials and query parameters such as
    /// `sslmode` all come from here.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        PgConnectOptions::from_str(&self.database_url)
            .with_context(|| format!("invalid database URL {:?}", self.database_url))
    }

    /// Name of the task database.
    pub fn database_name(&self) -> Result<String> {
        let options = self.connect_options()?;
        options
            .get_database()
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .with_context(|| format!("database URL {:?} names no database", self.database_url))
    }

    /// Same server and credentials, pointed at the `postgres` database.
    pub fn maintenance_options(&self) -> Result<PgConnectOptions> {
        Ok(self.connect_options()?.database(MAINTENANCE_DB))
    }
}
