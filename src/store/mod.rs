//! Store module
//!
//! Ledger persistence: the repository port, the unit of work that scopes it
//! to one transaction, and the PostgreSQL and in-memory backends.

mod cursor;
mod error;
pub mod memory;
mod persister;
pub mod postgres;
mod repository;
mod unit_of_work;

pub use cursor::MonthlyCursor;
pub use error::StoreError;
pub use memory::InMemoryLedger;
pub use persister::{CreditCardItemPersister, ItemSnapshot, PersistAction};
pub use postgres::PgLedgerStore;
pub use repository::{LedgerRepository, MonthlySummary};
pub use unit_of_work::{ScopeFuture, StoreFuture, TransactionBackend, TransactionScope, UnitOfWork};
