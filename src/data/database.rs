//! SQLite connection pool and transaction plumbing
//!
//! Store functions in [`super::users`], [`super::friends`] and
//! [`super::posts`] take `&mut SqliteConnection`, so the same function runs
//! on a pooled connection or inside a transaction (`&mut *tx`).

use std::path::Path;
use std::str::FromStr;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, Transaction};

use crate::error::AppError;

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        Self::connect_with_pool_size(path, 10).await
    }

    /// Connect with an explicit upper bound on pooled connections
    pub async fn connect_with_pool_size(
        path: &Path,
        max_connections: u32,
    ) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Borrow a pooled connection for a single statement sequence
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, AppError> {
        Ok(self.pool.acquire().await?)
    }

    /// Begin a transaction
    ///
    /// Callers finish it with [`finish_transaction`].
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.pool.begin().await?)
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Commit on success, roll back on failure.
///
/// A rollback failure is logged and the original error is returned; a commit
/// failure after a successful body is returned as the result.
pub async fn finish_transaction<T>(
    tx: Transaction<'static, Sqlite>,
    result: Result<T, AppError>,
    operation: &'static str,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|error| {
                tracing::error!(%error, operation, "Failed to commit transaction");
                AppError::Database(error)
            })?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::error!(
                    error = %rollback_error,
                    operation,
                    "Failed to roll back transaction"
                );
            }
            Err(error)
        }
    }
}

/// True when `error` is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.is_unique_violation(),
        _ => false,
    }
}

/// True when `error` is a CHECK constraint violation
pub(crate) fn is_check_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.is_check_violation(),
        _ => false,
    }
}
