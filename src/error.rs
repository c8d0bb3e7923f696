//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::{DomainError, ErrorKind};
use crate::events::EventError;
use crate::invoicing::InvoiceError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Collaborator errors
    #[error("Storage failure during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Invoice provider failure during {operation}: {source}")]
    Invoice {
        operation: &'static str,
        #[source]
        source: InvoiceError,
    },

    #[error(transparent)]
    Event(#[from] EventError),

    // Server errors (5xx)
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Wrap a storage failure with the operation it interrupted
    pub fn storage(operation: &'static str, source: StoreError) -> Self {
        AppError::Storage { operation, source }
    }

    /// Wrap an invoice provider failure with the operation it interrupted
    pub fn invoice(operation: &'static str, source: InvoiceError) -> Self {
        AppError::Invoice { operation, source }
    }

    /// Stable classification used by the HTTP layer and the event consumer
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidRequest(_) | AppError::MissingHeader(_) => ErrorKind::Validation,
            AppError::Domain(e) => e.kind(),
            AppError::Storage { source, .. } => match source {
                StoreError::MonthlyNotFound(_) | StoreError::ItemNotFound(_) => ErrorKind::NotFound,
                StoreError::InvalidCursor(_) => ErrorKind::Validation,
                StoreError::UniqueViolation(_) => ErrorKind::InvariantViolation,
                _ => ErrorKind::Collaborator,
            },
            AppError::Invoice { .. } => ErrorKind::Collaborator,
            AppError::Event(e) => e.kind(),
            AppError::Internal(_) | AppError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable code sent to clients
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::MissingHeader(_) => "missing_header",
            AppError::Domain(e) => match e {
                DomainError::InvalidTitle(_) => "invalid_title",
                DomainError::InvalidDescription(_) => "invalid_description",
                DomainError::InvalidAmount(_) => "invalid_amount",
                DomainError::InvalidDirection(_) => "invalid_direction",
                DomainError::InvalidTransactionType(_) => "invalid_transaction_type",
                DomainError::InvalidReferenceMonth(_) => "invalid_reference_month",
                DomainError::UnsupportedTransactionType(_) => "unsupported_transaction_type",
                DomainError::CreditCardMustBeExpense => "credit_card_must_be_expense",
                DomainError::CurrencyMismatch { .. } => "currency_mismatch",
                DomainError::ItemNotFound(_) => "item_not_found",
                DomainError::MonthlyNotFound(_) => "monthly_not_found",
                DomainError::ItemDoesNotBelongToAggregate { .. } => "item_not_in_monthly",
                DomainError::DuplicateCreditCardItem { .. } => "duplicate_credit_card_item",
                DomainError::TotalsOverflow(_) => "totals_overflow",
            },
            AppError::Storage { source, .. } => match source {
                StoreError::MonthlyNotFound(_) => "monthly_not_found",
                StoreError::ItemNotFound(_) => "item_not_found",
                StoreError::InvalidCursor(_) => "invalid_cursor",
                StoreError::UniqueViolation(_) => "conflict",
                _ => "storage_error",
            },
            AppError::Invoice { .. } => "invoice_provider_error",
            AppError::Event(e) => e.error_code(),
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
        }
    }

    fn status(&self) -> StatusCode {
        match (self.kind(), self) {
            (_, AppError::Invoice { .. }) => StatusCode::BAD_GATEWAY,
            (ErrorKind::Validation, _) => StatusCode::BAD_REQUEST,
            (ErrorKind::NotFound, _) => StatusCode::NOT_FOUND,
            (ErrorKind::InvariantViolation, _) => StatusCode::CONFLICT,
            (ErrorKind::Collaborator, AppError::Event(_)) => StatusCode::SERVICE_UNAVAILABLE,
            (ErrorKind::Collaborator, _) | (ErrorKind::Internal, _) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert a storage result, naming the operation on failure
pub trait StoreResultExt<T> {
    fn during(self, operation: &'static str) -> AppResult<T>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn during(self, operation: &'static str) -> AppResult<T> {
        self.map_err(|source| AppError::storage(operation, source))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error, details) = if status.is_server_error() {
            // Collaborator details stay in the logs
            tracing::error!(error = %self, kind = self.kind().as_str(), "Request failed");
            let summary = match &self {
                AppError::Storage { operation, .. } | AppError::Invoice { operation, .. } => {
                    format!("Failed to {}", operation)
                }
                _ => "Internal error".to_string(),
            };
            (summary, None)
        } else {
            let details = match &self {
                AppError::MissingHeader(header) => Some(header.clone()),
                AppError::Domain(e) => Some(e.kind().as_str().to_string()),
                _ => None,
            };
            (self.to_string(), details)
        };

        let body = ErrorResponse {
            error,
            error_code: self.error_code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use uuid::Uuid;

    #[test]
    fn test_domain_errors_keep_their_kind() {
        let error = AppError::from(DomainError::ItemNotFound(Uuid::new_v4()));
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.error_code(), "item_not_found");

        let error = AppError::from(DomainError::DuplicateCreditCardItem {
            monthly_id: Uuid::new_v4(),
        });
        assert_eq!(error.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_storage_error_chains_source() {
        let error = Err::<(), _>(StoreError::Corrupt("bad direction".to_string()))
            .during("load monthly transaction")
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Collaborator);
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.to_string().contains("load monthly transaction"));
        let source = error.source().unwrap();
        assert!(source.to_string().contains("bad direction"));
    }

    #[test]
    fn test_invoice_error_is_bad_gateway() {
        let error = AppError::invoice(
            "fetch closed invoice total",
            InvoiceError::Unavailable("timeout".to_string()),
        );
        assert_eq!(error.kind(), ErrorKind::Collaborator);
        assert_eq!(error.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_cursor_is_client_error() {
        let error = AppError::storage("list monthly transactions", StoreError::InvalidCursor("x".into()));
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }
}
