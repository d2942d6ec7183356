//! Database error types.

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// Migration directory not found in the current environment.
    #[error("migration directory not found; tried {tried}. Last error: {last_error}. Run from repo root or services/engine.")]
    MigrationDirNotFound { tried: String, last_error: String },

    /// The user is already subscribed to this criterion.
    #[error("user {user_id} is already subscribed to criterion {criterion_id}")]
    AlreadyExists { user_id: i64, criterion_id: i64 },

    /// Nothing matched the lookup or delete.
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DbError {
    /// Returns true for outcomes a caller should show to the user rather
    /// than treat as a failure.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. } | Self::NotFound(_))
    }
}
