//! Monthly Ledger Library
//!
//! Re-exports modules for integration testing and external use.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod handlers;
pub mod invoicing;
pub mod store;
pub mod strategy;

pub use aggregate::{MonthlyTransaction, ReconcileOutcome};
pub use config::Config;
pub use domain::{DomainError, Money, OperationContext, ReferenceMonth, TransactionItem};
pub use error::{AppError, AppResult};
