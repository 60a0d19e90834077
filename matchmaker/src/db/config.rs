//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Database configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatabaseConfigError {
    #[error("DATABASE_URL must be set")]
    MissingUrl,

    #[error("{name} must be a valid number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 5)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    ///
    /// # Errors
    ///
    /// Fails if `DATABASE_URL` is not set or a pool setting is not a number
    pub fn from_env() -> Result<Self, DatabaseConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| DatabaseConfigError::MissingUrl)?;
        Self::with_url(url).overridden_from_env()
    }

    /// Development pool settings pointed at `database_url`
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::development()
        }
    }

    /// Apply the `DB_*` pool variables that are set
    pub fn overridden_from_env(self) -> Result<Self, DatabaseConfigError> {
        Ok(Self {
            max_connections: env_or("DB_MAX_CONNECTIONS", self.max_connections)?,
            min_connections: env_or("DB_MIN_CONNECTIONS", self.min_connections)?,
            connection_timeout_secs: env_or("DB_CONNECTION_TIMEOUT", self.connection_timeout_secs)?,
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", self.idle_timeout_secs)?,
            max_lifetime_secs: env_or("DB_MAX_LIFETIME", self.max_lifetime_secs)?,
            database_url: self.database_url,
        })
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/matchmaker` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/matchmaker".to_string(),
            max_connections: 20,
            min_connections: 5,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, DatabaseConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| DatabaseConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}
