//! Storage backends.
//!
//! The engine reaches storage only through [`TournamentRepository`].
//! [`Database`] owns the PostgreSQL pool behind [`PgTournamentRepository`];
//! [`InMemoryRepository`] keeps everything in process memory.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::tournament::TournamentResult;
use timeouts::with_query_timeout;

pub mod config;
pub mod memory;
pub mod repository;
pub mod timeouts;

pub use config::{DatabaseConfig, DatabaseConfigError};
pub use memory::InMemoryRepository;
pub use repository::{PgTournamentRepository, TournamentRepository};

/// PostgreSQL pool shared by every repository handed out
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a pool sized and timed by `config`.
    ///
    /// ```no_run
    /// use matchmaker::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let db = Database::new(&DatabaseConfig::from_env()?).await?;
    ///     db.health_check().await?;
    ///     db.migrate().await?;
    ///     let _repository = db.repository();
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::debug!(
            "Opened PostgreSQL pool ({}-{} connections)",
            config.min_connections,
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create or upgrade the tournament schema
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn repository(&self) -> PgTournamentRepository {
        PgTournamentRepository::new(self.pool.clone())
    }

    /// Round-trip a trivial query, bounded like every repository read
    pub async fn health_check(&self) -> TournamentResult<()> {
        with_query_timeout(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok::<_, crate::tournament::TournamentError>(())
        })
        .await
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
    async fn test_open_check_and_migrate() {
        let config = DatabaseConfig::from_env().unwrap_or_else(|_| DatabaseConfig::development());

        let db = Database::new(&config)
            .await
            .expect("Failed to connect to database");
        db.health_check().await.expect("Health check failed");
        db.migrate().await.expect("Migrations failed");
        db.close().await;
    }
}
