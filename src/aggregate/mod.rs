//! Aggregate module
//!
//! Aggregate roots that own the ledger invariants.

pub mod monthly;

pub use monthly::{MonthlyTransaction, ReconcileOutcome, Totals};
