use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::errors::{DbError, DbResult};

pub mod dependency_checker;
pub use dependency_checker::DependencyChecker;

/// Connection settings for the relational store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: String,
    pub max_connections: u32,
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "gestimmo.db".to_string(),
            max_connections: 5,
            create_if_missing: true,
        }
    }
}

impl StoreConfig {
    /// Load the configuration from the environment (a `.env` file is honored
    /// when present). `GESTIMMO_DB_PATH` is required; `GESTIMMO_DB_MAX_CONNECTIONS`
    /// is optional.
    pub fn from_env() -> DbResult<Self> {
        dotenv::dotenv().ok();

        let db_path = std::env::var("GESTIMMO_DB_PATH")
            .map_err(|_| DbError::ConnectionPool("GESTIMMO_DB_PATH is not set".to_string()))?;

        let max_connections = match std::env::var("GESTIMMO_DB_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse::<u32>().map_err(|_| {
                DbError::ConnectionPool(format!(
                    "GESTIMMO_DB_MAX_CONNECTIONS is not a valid number: {}",
                    raw
                ))
            })?,
            Err(_) => Self::default().max_connections,
        };

        Ok(Self {
            db_path,
            max_connections,
            create_if_missing: true,
        })
    }
}

/// Handle on the relational store. Constructed explicitly by the host and
/// passed to whatever needs to query; there is no ambient shared instance.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database file and build the connection pool.
    pub async fn connect(config: &StoreConfig) -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.db_path)
            .create_if_missing(config.create_if_missing)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        log::info!("connected to store at {}", config.db_path);
        Ok(Self { pool })
    }

    /// An in-memory store, used by tests. A single connection keeps every
    /// query on the same memory database.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply any pending schema migrations.
    pub async fn migrate(&self) -> DbResult<()> {
        crate::db_migration::run_migrations(&self.pool).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
