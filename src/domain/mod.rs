//! Domain module
//!
//! Core domain types and business logic.

pub mod context;
pub mod error;
pub mod events;
pub mod item;
pub mod money;
pub mod month;

pub use context::{OperationContext, OperationSource};
pub use error::{DomainError, ErrorKind};
pub use events::{PurchaseEvent, PurchasePayload};
pub use item::{Direction, ItemChanges, ItemState, NewItem, TransactionItem, TransactionType};
pub use money::{Currency, Money, MoneyError};
pub use month::ReferenceMonth;
