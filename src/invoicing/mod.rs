//! Invoicing module
//!
//! Query port into the invoicing subsystem. The ledger never computes invoice
//! totals itself; it asks for the authoritative closed-invoice total of a
//! month and reconciles against it.

mod fixed;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Currency, Money, ReferenceMonth};

pub use fixed::StaticInvoiceTotals;
pub use postgres::PgInvoiceTotalProvider;

/// Errors raised while asking for invoice totals
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Provider answered with a total the ledger cannot use
    #[error("Invalid invoice total: {0}")]
    InvalidTotal(String),

    #[error("Invoice provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait InvoiceTotalProvider: Send + Sync {
    /// Sum of the user's closed (or already paid) invoices for the month, zero
    /// when none exist
    async fn closed_invoice_total(
        &self,
        user_id: Uuid,
        reference_month: ReferenceMonth,
        currency: Currency,
    ) -> Result<Money, InvoiceError>;
}
