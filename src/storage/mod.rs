//! Relational storage on SQLite
//!
//! ## Tables
//!
//! - `users`: credentials (unique username, bcrypt hash)
//! - `machines`: catalog; parameters stored as a JSON array
//! - `inspections`: one row per submitted form; measurements as a JSON blob
//! - `reactions`: optional comment on a failed inspection (one per inspection)
//!
//! Every operation is a single statement (or a read followed by nothing);
//! no transaction spans two logical operations.

pub mod credentials;
pub mod inspections;
pub mod machines;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::{defaults, DatabaseConfig};
use crate::types::{sample_machine_parameters, ParameterError};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("Foreign key violated: {0}")]
    ForeignKeyViolation(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<ParameterError> for StorageError {
    fn from(err: ParameterError) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Map constraint failures to their own variants so callers can react.
pub(crate) fn classify_write_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return StorageError::UniqueViolation(db_err.message().to_string());
        }
        if db_err.is_foreign_key_violation() {
            return StorageError::ForeignKeyViolation(db_err.message().to_string());
        }
    }
    StorageError::Database(err)
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS machines (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        params TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS inspections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        machine_id INTEGER NOT NULL,
        shift TEXT NOT NULL,
        date TEXT NOT NULL,
        measurements TEXT NOT NULL,
        status TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id),
        FOREIGN KEY (machine_id) REFERENCES machines(id)
    )",
    "CREATE TABLE IF NOT EXISTS reactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        inspection_id INTEGER NOT NULL UNIQUE,
        reaction TEXT NOT NULL,
        FOREIGN KEY (inspection_id) REFERENCES inspections(id)
    )",
];

/// Handle to the QA database. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(defaults::DATABASE_ACQUIRE_TIMEOUT_SECS))
            .connect_with(options)
            .await?;

        info!(url = %config.url, "Connected to SQLite");
        Ok(Self { pool })
    }

    /// Private in-memory database, used by tests.
    ///
    /// Pinned to one connection that is never recycled: every new SQLite
    /// memory connection would see an empty database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if absent.
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema ready");
        Ok(())
    }

    /// Insert the sample machine when the catalog is empty.
    ///
    /// Returns `true` when a machine was inserted.
    pub async fn seed_sample_machine(&self) -> Result<bool, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM machines")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(false);
        }

        let parameters = sample_machine_parameters()?;
        let id = machines::insert_machine(self, defaults::SAMPLE_MACHINE_NAME, &parameters).await?;
        info!(machine_id = id, name = defaults::SAMPLE_MACHINE_NAME, "Seeded sample machine");
        Ok(true)
    }

    /// Schema plus optional seed, the usual startup sequence.
    pub async fn initialize(&self, seed: bool) -> Result<(), StorageError> {
        self.init_schema().await?;
        if seed {
            self.seed_sample_machine().await?;
        }
        Ok(())
    }

    /// Round-trip a trivial query; used by the health endpoint.
    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
