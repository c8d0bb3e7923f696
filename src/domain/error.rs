//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;
use uuid::Uuid;

use super::{MoneyError, TransactionType};

/// Stable classification of an error, independent of its message.
///
/// Outer layers (HTTP, event consumer) match on this instead of inspecting
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or rule-breaking input
    Validation,
    /// Item or ledger absent
    NotFound,
    /// Aggregate invariant or data-integrity violation
    InvariantViolation,
    /// Storage or invoice provider failure
    Collaborator,
    /// Anything else
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvariantViolation => "invariant_violation",
            ErrorKind::Collaborator => "collaborator",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Business rule violations and aggregate invariant failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    #[error("Invalid description: {0}")]
    InvalidDescription(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid transaction type: {0}")]
    InvalidTransactionType(String),

    #[error("Invalid reference month: {0} (expected YYYY-MM)")]
    InvalidReferenceMonth(String),

    #[error("No strategy registered for transaction type {0}")]
    UnsupportedTransactionType(TransactionType),

    #[error("Credit card items must be expenses")]
    CreditCardMustBeExpense,

    #[error("Currency mismatch: ledger uses {expected}, item uses {found}")]
    CurrencyMismatch { expected: String, found: String },

    #[error("Transaction item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Monthly transaction not found: {0}")]
    MonthlyNotFound(Uuid),

    #[error("Item {item_id} does not belong to monthly transaction {monthly_id}")]
    ItemDoesNotBelongToAggregate { item_id: Uuid, monthly_id: Uuid },

    #[error("Monthly transaction {monthly_id} already has an active credit card item")]
    DuplicateCreditCardItem { monthly_id: Uuid },

    #[error("Totals overflow: {0}")]
    TotalsOverflow(#[from] MoneyError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTitle(_)
            | Self::InvalidDescription(_)
            | Self::InvalidAmount(_)
            | Self::InvalidDirection(_)
            | Self::InvalidTransactionType(_)
            | Self::InvalidReferenceMonth(_)
            | Self::UnsupportedTransactionType(_)
            | Self::CreditCardMustBeExpense
            | Self::CurrencyMismatch { .. } => ErrorKind::Validation,
            Self::ItemNotFound(_) | Self::MonthlyNotFound(_) => ErrorKind::NotFound,
            Self::ItemDoesNotBelongToAggregate { .. }
            | Self::DuplicateCreditCardItem { .. }
            | Self::TotalsOverflow(_) => ErrorKind::InvariantViolation,
        }
    }

    /// Check if this is a client error (caller's input is at fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_kind() {
        let err = DomainError::InvalidTitle("title is required".to_string());
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.is_client_error());
        assert!(err.to_string().contains("title is required"));
    }

    #[test]
    fn test_ownership_is_invariant_violation() {
        let err = DomainError::ItemDoesNotBelongToAggregate {
            item_id: Uuid::new_v4(),
            monthly_id: Uuid::new_v4(),
        };
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_not_found_kind() {
        let id = Uuid::new_v4();
        let err = DomainError::ItemNotFound(id);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
