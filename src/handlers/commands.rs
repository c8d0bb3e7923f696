//! Command definitions
//!
//! Commands represent intentions to change the ledger. Client-supplied values
//! stay as raw strings here and are parsed by the handler before any storage
//! work starts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{MonthlyTransaction, ReconcileOutcome};
use crate::domain::ReferenceMonth;
use crate::store::MonthlySummary;

// =========================================================================
// RegisterTransactionCommand
// =========================================================================

/// Command to register a movement in a user's monthly ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterTransactionCommand {
    pub user_id: Uuid,
    pub category_id: String,
    /// `YYYY-MM`
    pub reference_month: String,
    /// PIX, BOLETO, TRANSFER or CREDIT_CARD
    pub kind: String,
    /// Required except for CREDIT_CARD, whose title is fixed
    pub title: Option<String>,
    pub description: Option<String>,
    /// Decimal string. Ignored for CREDIT_CARD: the invoice total wins.
    pub amount: Option<String>,
    /// INCOME or EXPENSE. Optional for CREDIT_CARD, which must be EXPENSE.
    pub direction: Option<String>,
    /// Unset means unpaid for new items. For CREDIT_CARD an unset flag keeps
    /// whatever the existing item carries.
    pub paid: Option<bool>,
}

impl RegisterTransactionCommand {
    pub fn new(user_id: Uuid, category_id: String, reference_month: String, kind: String) -> Self {
        Self {
            user_id,
            category_id,
            reference_month,
            kind,
            title: None,
            description: None,
            amount: None,
            direction: None,
            paid: None,
        }
    }

    pub fn with_entry(mut self, title: String, amount: String, direction: String) -> Self {
        self.title = Some(title);
        self.amount = Some(amount);
        self.direction = Some(direction);
        self
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_direction(mut self, direction: String) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_paid(mut self, paid: bool) -> Self {
        self.paid = Some(paid);
        self
    }
}

/// Result of a registration
#[derive(Debug, Clone)]
pub struct RegisterTransactionResult {
    pub monthly: MonthlyTransaction,
    /// Item created or reconciled; `None` when a zero invoice total left
    /// nothing to record
    pub item_id: Option<Uuid>,
}

// =========================================================================
// UpdateTransactionItemCommand / DeleteTransactionItemCommand
// =========================================================================

/// Partial update of an item. Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTransactionItemCommand {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub category_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<String>,
    pub direction: Option<String>,
    pub paid: Option<bool>,
}

impl UpdateTransactionItemCommand {
    pub fn new(user_id: Uuid, item_id: Uuid) -> Self {
        Self {
            user_id,
            item_id,
            ..Default::default()
        }
    }

    pub fn with_amount(mut self, amount: String) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_direction(mut self, direction: String) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_paid(mut self, paid: bool) -> Self {
        self.paid = Some(paid);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeleteTransactionItemCommand {
    pub user_id: Uuid,
    pub item_id: Uuid,
}

impl DeleteTransactionItemCommand {
    pub fn new(user_id: Uuid, item_id: Uuid) -> Self {
        Self { user_id, item_id }
    }
}

/// Result of an item update or delete
#[derive(Debug, Clone)]
pub struct ItemMutationResult {
    pub monthly: MonthlyTransaction,
    pub item_id: Uuid,
}

// =========================================================================
// SyncMonthlyCommand
// =========================================================================

/// Reconcile one month against the closed invoices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMonthlyCommand {
    pub user_id: Uuid,
    pub reference_month: ReferenceMonth,
    pub category_id: Uuid,
    /// `None` keeps the paid flag of the existing credit-card item
    pub paid: Option<bool>,
}

impl SyncMonthlyCommand {
    pub fn new(user_id: Uuid, reference_month: ReferenceMonth, category_id: Uuid) -> Self {
        Self {
            user_id,
            reference_month,
            category_id,
            paid: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncMonthlyResult {
    /// `None` when the month has no ledger and nothing closed to record
    pub monthly: Option<MonthlyTransaction>,
    pub outcome: ReconcileOutcome,
}

// =========================================================================
// Queries
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetMonthlyQuery {
    pub user_id: Uuid,
    pub monthly_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMonthlyQuery {
    pub user_id: Uuid,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl ListMonthlyQuery {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            limit: None,
            cursor: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: String) -> Self {
        self.cursor = Some(cursor);
        self
    }
}

/// One page of ledgers, newest month first
#[derive(Debug, Clone)]
pub struct MonthlyPage {
    pub entries: Vec<MonthlySummary>,
    pub has_next: bool,
    pub next_cursor: Option<String>,
}
