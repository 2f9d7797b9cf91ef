//! Connection settings and pool construction for the HR database.

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use serde::Deserialize;
use thiserror::Error;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

const DEFAULT_URL_KEY: &str = "DATABASE_URL";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (set {0})")]
    MissingUrl(String),
    #[error("failed to connect to database: {0}")]
    Connect(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven settings for the connection pool.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_url_key")]
    env_key: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default = "default_max_connections")]
    max_connections: u32,
}

fn default_url_key() -> String {
    DEFAULT_URL_KEY.to_string()
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self::new(DEFAULT_URL_KEY)
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
            url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Settings reading `DATABASE_URL` and the optional `DATABASE_MAX_CONNECTIONS`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(max) = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
        {
            settings.max_connections = max.max(1);
        }
        settings
    }

    /// Settings pinned to an explicit url instead of the environment.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn database_url(&self) -> DbResult<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl(self.env_key.clone()))
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(settings.max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let pool = Database::connect(options).await?;
    tracing::debug!(max_connections = settings.max_connections, "database pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_url_wins_over_environment() {
        let settings = DatabaseSettings::with_url("sqlite::memory:");
        assert_eq!(settings.database_url().unwrap(), "sqlite::memory:");
    }

    #[test]
    fn missing_variable_is_reported_by_name() {
        let settings = DatabaseSettings::new("HR_TEST_UNSET_DATABASE_URL");
        let err = settings.database_url().unwrap_err();
        assert!(err.to_string().contains("HR_TEST_UNSET_DATABASE_URL"));
    }

    #[tokio::test]
    async fn connects_to_in_memory_sqlite() {
        let pool = connect(&DatabaseSettings::with_url("sqlite::memory:"))
            .await
            .unwrap();
        pool.ping().await.unwrap();
    }
}
