//! Repository Module
//!
//! Free functions over SQLite, one module per table group. Functions that
//! must run inside a caller's transaction take `&mut SqliteConnection`;
//! single-statement reads take any `SqliteExecutor` so they work against
//! the pool or a transaction.

pub mod catalog;
pub mod inventory;
pub mod inventory_log;
pub mod order;
pub mod pos_order;
pub mod pos_sequence;
pub mod reconciliation;
pub mod sales;

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// SQLite primary result codes for lock contention (extended codes share the low byte)
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Write lock or snapshot conflict, safe to retry the whole unit of work
    #[error("Database busy: {0}")]
    Busy(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::PoolTimedOut => RepoError::Busy(err.to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return RepoError::Duplicate(db_err.message().to_string());
                }
                if db_err.is_check_violation() || db_err.is_foreign_key_violation() {
                    return RepoError::Validation(db_err.message().to_string());
                }
                let code = db_err
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff);
                if matches!(code, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED)) {
                    RepoError::Busy(db_err.message().to_string())
                } else {
                    RepoError::Database(db_err.message().to_string())
                }
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
            RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::AlreadyExists, msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Busy(msg) => AppError::with_message(ErrorCode::ConcurrentModification, msg),
            RepoError::Database(msg) => {
                tracing::error!(error = %msg, "Repository database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Storage form of an optional variant key (`''` = no variant)
pub(crate) fn variant_column(variant_key: Option<&str>) -> &str {
    variant_key.unwrap_or("")
}

/// Number of pages for `total` rows at `limit` per page (at least 1)
pub(crate) fn page_count(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        1
    } else {
        (total + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(101, 100), 2);
    }

    #[test]
    fn test_variant_column() {
        assert_eq!(variant_column(None), "");
        assert_eq!(variant_column(Some("large")), "large");
    }

    #[test]
    fn test_busy_maps_to_concurrent_modification() {
        let err: AppError = RepoError::Busy("database is locked".into()).into();
        assert_eq!(err.code, ErrorCode::ConcurrentModification);
    }
}
