//! Shared helper functions for PostgreSQL error conversion.

use daftar_core::error::StorageError;

/// Classify a sqlx error into the storage error taxonomy.
///
/// Connectivity failures become `Unavailable` so callers can tell an
/// unreachable store apart from a bad query.
pub fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StorageError::Unavailable(err.to_string())
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => StorageError::Unavailable(err.to_string()),
        sqlx::Error::RowNotFound => StorageError::NotFound(err.to_string()),
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StorageError::ConstraintViolation(db.constraint().unwrap_or("unique").to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StorageError::SerializationError(err.to_string())
        }
        _ => StorageError::QueryError(err.to_string()),
    }
}
