//! Error types for the catalog domain layer.
//!
//! This module defines a two-level hierarchy:
//!
//! - [`StorageError`] - Database/repository errors
//! - [`DomainError`] - Business rule violations, wrapping storage failures
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries. Each [`DomainError`]
//! maps to a stable wire code via [`DomainError::code`].

use thiserror::Error;

use crate::models::EntityKind;

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and row decoding.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store could not be reached (pool timeout, refused connection).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Database constraint was violated (unique, foreign key, etc.).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Row decoding failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Domain Errors
// =============================================================================

/// Business logic and domain rule violations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input failed validation (bad limit, empty required field, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Update/delete/lookup targeted a missing row.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Entity kind that was looked up.
        kind: &'static str,
        /// Identifier used for the lookup (id or name).
        key: String,
    },

    /// Write conflicts with existing data (duplicate name).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DomainError {
    /// Not-found error for an entity looked up by id.
    pub fn entity_not_found(kind: EntityKind, id: i64) -> Self {
        Self::NotFound {
            kind: kind.label(),
            key: id.to_string(),
        }
    }

    /// Stable machine-readable code exposed to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(StorageError::Unavailable(_)) => "STORE_UNAVAILABLE",
            Self::Storage(StorageError::NotFound(_)) => "NOT_FOUND",
            Self::Storage(StorageError::ConstraintViolation(_)) => "CONFLICT",
            Self::Storage(_) => "INTERNAL",
        }
    }

    /// Whether the failure came from an unreachable store.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Unavailable(_)))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: la conversion Storage -> Domain préserve le message
    #[test]
    fn test_error_conversion_chain() {
        let storage_err = StorageError::QueryError("db failed".into());
        let domain_err: DomainError = storage_err.into();

        assert!(domain_err.to_string().contains("db failed"));
        assert_eq!(domain_err.code(), "INTERNAL");
    }

    #[test]
    fn test_wire_codes() {
        assert_eq!(DomainError::Validation("x".into()).code(), "VALIDATION");
        assert_eq!(
            DomainError::entity_not_found(EntityKind::Tag, 7).code(),
            "NOT_FOUND"
        );
        let unavailable: DomainError = StorageError::Unavailable("pool timed out".into()).into();
        assert_eq!(unavailable.code(), "STORE_UNAVAILABLE");
        assert!(unavailable.is_unavailable());
        let dup: DomainError = StorageError::ConstraintViolation("name".into()).into();
        assert_eq!(dup.code(), "CONFLICT");
    }

    // Le message not-found doit contenir le type et l'identifiant
    #[test]
    fn test_not_found_message() {
        let msg = DomainError::entity_not_found(EntityKind::Category, 42).to_string();
        assert!(msg.contains("Category") && msg.contains("42"));
    }
}
