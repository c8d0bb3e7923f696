//! Command Handlers module
//!
//! Use cases that orchestrate the ledger aggregate, the strategies and the
//! invoice provider. Each command runs inside exactly one unit of work.

mod commands;
mod deps;
mod item_handler;
mod parse;
mod query_handler;
mod register_handler;
mod sync_handler;


pub use commands::*;
pub use deps::HandlerDeps;
pub use item_handler::{DeleteTransactionItemHandler, UpdateTransactionItemHandler};
pub use query_handler::{GetMonthlyHandler, ListMonthlyHandler, PageLimits};
pub use register_handler::RegisterTransactionHandler;
pub use sync_handler::SyncMonthlyFromInvoicesHandler;
