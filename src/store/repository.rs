//! Ledger Repository
//!
//! Storage-facing port used by the use cases. Every method runs inside the
//! transaction of the scope that handed the repository out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::MonthlyTransaction;
use crate::domain::{Currency, Money, ReferenceMonth, TransactionItem};

use super::{MonthlyCursor, StoreError};

/// Ledger header without its items, as returned by listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reference_month: ReferenceMonth,
    pub currency: Currency,
    pub total_income: Money,
    pub total_expense: Money,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MonthlySummary {
    pub fn cursor(&self) -> MonthlyCursor {
        MonthlyCursor::new(self.reference_month, self.id)
    }
}

impl From<&MonthlyTransaction> for MonthlySummary {
    fn from(monthly: &MonthlyTransaction) -> Self {
        Self {
            id: monthly.id(),
            user_id: monthly.user_id(),
            reference_month: monthly.reference_month(),
            currency: monthly.currency(),
            total_income: monthly.total_income(),
            total_expense: monthly.total_expense(),
            total_amount: monthly.total_amount(),
            created_at: monthly.created_at(),
            updated_at: monthly.updated_at(),
        }
    }
}

#[async_trait]
pub trait LedgerRepository: Send {
    /// Load the ledger of (user, month), creating an empty one on first use.
    /// The ledger stays locked for the rest of the transaction.
    async fn find_or_create_monthly(
        &mut self,
        user_id: Uuid,
        reference_month: ReferenceMonth,
        currency: Currency,
    ) -> Result<MonthlyTransaction, StoreError>;

    /// Load a ledger with all its items (deleted ones included)
    async fn find_monthly_by_id(
        &mut self,
        user_id: Uuid,
        monthly_id: Uuid,
    ) -> Result<Option<MonthlyTransaction>, StoreError>;

    async fn find_monthly_by_month(
        &mut self,
        user_id: Uuid,
        reference_month: ReferenceMonth,
    ) -> Result<Option<MonthlyTransaction>, StoreError>;

    /// Persist the ledger header (totals and updated time)
    async fn update_monthly(&mut self, monthly: &MonthlyTransaction) -> Result<(), StoreError>;

    async fn insert_item(&mut self, item: &TransactionItem) -> Result<(), StoreError>;

    async fn update_item(&mut self, item: &TransactionItem) -> Result<(), StoreError>;

    /// Find an item whose ledger belongs to `user_id`
    async fn find_item_by_id(
        &mut self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<TransactionItem>, StoreError>;

    /// Up to `limit` ledgers of the user in listing order, strictly after `after`
    async fn list_monthly(
        &mut self,
        user_id: Uuid,
        limit: usize,
        after: Option<MonthlyCursor>,
    ) -> Result<Vec<MonthlySummary>, StoreError>;
}
