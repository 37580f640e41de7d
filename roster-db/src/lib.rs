//! Database layer for Roster
//!
//! Stores teams, users, pull requests and reviewer slots in SQLite and
//! exposes them to the engine through [`roster_core::Directory`].

mod directory;
pub mod error;
pub mod repos;

use std::path::PathBuf;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;

pub use error::{Error, Result};
pub use repos::{PullRequestsRepo, TeamsRepo, UsersRepo};

const SCHEMA: &str = include_str!("../migrations/001_initial_schema.sql");

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Create a new database config with the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 5,
        }
    }

    /// Set the maximum number of connections
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database with the given configuration
    pub async fn connect(config: DatabaseConfig) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", config.path.display()))?
                .create_if_missing(true)
                .foreign_keys(true)
                .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %config.path.display(), "Connected to database");
        Ok(Self { pool })
    }

    /// Private in-memory database, mostly for tests
    ///
    /// The pool holds a single connection that never expires, since every
    /// SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .foreign_keys(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create the schema if it is missing
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::debug!("Database schema ready");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn teams(&self) -> TeamsRepo<'_> {
        TeamsRepo::new(&self.pool)
    }

    pub fn users(&self) -> UsersRepo<'_> {
        UsersRepo::new(&self.pool)
    }

    pub fn pull_requests(&self) -> PullRequestsRepo<'_> {
        PullRequestsRepo::new(&self.pool)
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
pub(crate) async fn test_db() -> Database {
    let db = Database::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    db
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_connection() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("roster.db");

        let db = Database::connect(DatabaseConfig::new(&db_path).with_max_connections(2))
            .await
            .unwrap();
        db.migrate().await.unwrap();

        assert!(db_path.exists());
        db.close().await;
    }

    #[tokio::test]
    async fn test_migrate_is_repeatable() {
        let db = test_db().await;
        db.migrate().await.unwrap();

        for table in ["teams", "users", "pull_requests", "pr_reviewers"] {
            let count: (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(db.pool())
            .await
            .unwrap();
            assert_eq!(count.0, 1, "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_data_survives_reconnect() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("roster.db");

        let db = Database::connect(DatabaseConfig::new(&db_path)).await.unwrap();
        db.migrate().await.unwrap();
        db.teams().create("backend").await.unwrap();
        db.close().await;

        let db = Database::connect(DatabaseConfig::new(&db_path)).await.unwrap();
        db.migrate().await.unwrap();
        assert!(db.teams().exists("backend").await.unwrap());
    }
}
