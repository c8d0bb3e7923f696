//! Store Errors
//!
//! Error types for ledger storage operations.

use uuid::Uuid;

/// Errors raised by a ledger storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Row expected by an update is missing
    #[error("Monthly transaction not found: {0}")]
    MonthlyNotFound(Uuid),

    #[error("Transaction item not found: {0}")]
    ItemNotFound(Uuid),

    /// Uniqueness rule rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A stored row could not be turned back into domain types
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Scope used after commit or rollback
    #[error("Transaction scope already closed")]
    ScopeClosed,
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation(
                db.constraint().unwrap_or("unknown constraint").to_string(),
            ),
            _ => StoreError::Database(error),
        }
    }
}

impl StoreError {
    /// Check if this error is a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::MonthlyNotFound(_) | StoreError::ItemNotFound(_))
    }

    /// Caller supplied data the store rejected (cursor, duplicate write)
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::InvalidCursor(_))
    }
}
