//! In-memory ledger store
//!
//! Same contract as the PostgreSQL backend. A transaction takes the store
//! lock for its whole duration and mutates a working copy that replaces the
//! shared state only on commit, so rollback is simply dropping the copy.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::aggregate::MonthlyTransaction;
use crate::domain::{Currency, ReferenceMonth, TransactionItem, TransactionType};

use super::{
    LedgerRepository, MonthlyCursor, MonthlySummary, StoreError, StoreFuture, TransactionBackend,
    TransactionScope,
};

const MONTHLY_UNIQUE: &str = "monthly_transactions_user_id_reference_month_key";
const ITEM_PKEY: &str = "transaction_items_pkey";
const ONE_ACTIVE_CREDIT_CARD: &str = "transaction_items_one_active_credit_card";

#[derive(Debug, Clone)]
struct StoredMonthly {
    header: MonthlySummary,
    item_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    monthlies: HashMap<Uuid, StoredMonthly>,
    items: HashMap<Uuid, TransactionItem>,
}

impl LedgerState {
    fn monthly_id_for(&self, user_id: Uuid, reference_month: ReferenceMonth) -> Option<Uuid> {
        self.monthlies
            .values()
            .find(|m| m.header.user_id == user_id && m.header.reference_month == reference_month)
            .map(|m| m.header.id)
    }

    fn load(&self, monthly_id: Uuid) -> Result<Option<MonthlyTransaction>, StoreError> {
        let Some(stored) = self.monthlies.get(&monthly_id) else {
            return Ok(None);
        };

        let items = stored
            .item_ids
            .iter()
            .map(|id| self.items.get(id).cloned().ok_or(StoreError::ItemNotFound(*id)))
            .collect::<Result<Vec<_>, _>>()?;

        let header = &stored.header;
        MonthlyTransaction::restore(
            header.id,
            header.user_id,
            header.reference_month,
            header.currency,
            items,
            header.created_at,
            header.updated_at,
        )
        .map(Some)
        .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// Another active credit-card item in the same ledger
    fn conflicting_credit_card(&self, item: &TransactionItem) -> bool {
        if item.kind() != TransactionType::CreditCard || !item.is_active() {
            return false;
        }
        self.items.values().any(|other| {
            other.id() != item.id()
                && other.monthly_id() == item.monthly_id()
                && other.kind() == TransactionType::CreditCard
                && other.is_active()
        })
    }
}

/// Shared in-memory store; clones share the same state
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed number of ledgers
    pub async fn monthly_count(&self) -> usize {
        self.state.lock().await.monthlies.len()
    }

    /// Committed ledger with its items
    pub async fn monthly(&self, monthly_id: Uuid) -> Result<Option<MonthlyTransaction>, StoreError> {
        self.state.lock().await.load(monthly_id)
    }

    /// Committed ledger header, totals as stored
    pub async fn stored_summary(&self, monthly_id: Uuid) -> Option<MonthlySummary> {
        self.state
            .lock()
            .await
            .monthlies
            .get(&monthly_id)
            .map(|m| m.header.clone())
    }

    /// Committed items of a ledger in insertion order
    pub async fn stored_items(&self, monthly_id: Uuid) -> Vec<TransactionItem> {
        let state = self.state.lock().await;
        state
            .monthlies
            .get(&monthly_id)
            .map(|m| {
                m.item_ids
                    .iter()
                    .filter_map(|id| state.items.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl TransactionBackend for InMemoryLedger {
    async fn begin(&self) -> Result<Box<dyn TransactionScope>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryScope { guard, working }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Open in-memory transaction
pub struct InMemoryScope {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
}

impl TransactionScope for InMemoryScope {
    fn repository(&mut self) -> &mut dyn LedgerRepository {
        self
    }

    fn commit(self: Box<Self>) -> StoreFuture {
        let InMemoryScope { mut guard, working } = *self;
        Box::pin(async move {
            *guard = working;
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> StoreFuture {
        drop(self);
        Box::pin(async { Ok(()) })
    }
}

#[async_trait]
impl LedgerRepository for InMemoryScope {
    async fn find_or_create_monthly(
        &mut self,
        user_id: Uuid,
        reference_month: ReferenceMonth,
        currency: Currency,
    ) -> Result<MonthlyTransaction, StoreError> {
        if let Some(monthly_id) = self.working.monthly_id_for(user_id, reference_month) {
            return self
                .working
                .load(monthly_id)?
                .ok_or(StoreError::MonthlyNotFound(monthly_id));
        }

        let monthly = MonthlyTransaction::new(Uuid::new_v4(), user_id, reference_month, currency);
        self.working.monthlies.insert(
            monthly.id(),
            StoredMonthly {
                header: MonthlySummary::from(&monthly),
                item_ids: Vec::new(),
            },
        );

        tracing::debug!(
            monthly_id = %monthly.id(),
            %user_id,
            %reference_month,
            "Monthly transaction created"
        );

        Ok(monthly)
    }

    async fn find_monthly_by_id(
        &mut self,
        user_id: Uuid,
        monthly_id: Uuid,
    ) -> Result<Option<MonthlyTransaction>, StoreError> {
        match self.working.monthlies.get(&monthly_id) {
            Some(stored) if stored.header.user_id == user_id => self.working.load(monthly_id),
            _ => Ok(None),
        }
    }

    async fn find_monthly_by_month(
        &mut self,
        user_id: Uuid,
        reference_month: ReferenceMonth,
    ) -> Result<Option<MonthlyTransaction>, StoreError> {
        match self.working.monthly_id_for(user_id, reference_month) {
            Some(monthly_id) => self.working.load(monthly_id),
            None => Ok(None),
        }
    }

    async fn update_monthly(&mut self, monthly: &MonthlyTransaction) -> Result<(), StoreError> {
        let stored = self
            .working
            .monthlies
            .get_mut(&monthly.id())
            .ok_or(StoreError::MonthlyNotFound(monthly.id()))?;

        if stored.header.reference_month != monthly.reference_month()
            || stored.header.user_id != monthly.user_id()
        {
            return Err(StoreError::UniqueViolation(MONTHLY_UNIQUE.to_string()));
        }

        stored.header = MonthlySummary {
            updated_at: Utc::now(),
            ..MonthlySummary::from(monthly)
        };
        Ok(())
    }

    async fn insert_item(&mut self, item: &TransactionItem) -> Result<(), StoreError> {
        if self.working.items.contains_key(&item.id()) {
            return Err(StoreError::UniqueViolation(ITEM_PKEY.to_string()));
        }
        if self.working.conflicting_credit_card(item) {
            return Err(StoreError::UniqueViolation(ONE_ACTIVE_CREDIT_CARD.to_string()));
        }

        let stored = self
            .working
            .monthlies
            .get_mut(&item.monthly_id())
            .ok_or(StoreError::MonthlyNotFound(item.monthly_id()))?;
        stored.item_ids.push(item.id());
        self.working.items.insert(item.id(), item.clone());
        Ok(())
    }

    async fn update_item(&mut self, item: &TransactionItem) -> Result<(), StoreError> {
        if !self.working.items.contains_key(&item.id()) {
            return Err(StoreError::ItemNotFound(item.id()));
        }
        if self.working.conflicting_credit_card(item) {
            return Err(StoreError::UniqueViolation(ONE_ACTIVE_CREDIT_CARD.to_string()));
        }

        self.working.items.insert(item.id(), item.clone());
        Ok(())
    }

    async fn find_item_by_id(
        &mut self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<TransactionItem>, StoreError> {
        let Some(item) = self.working.items.get(&item_id) else {
            return Ok(None);
        };
        let owned_by_user = self
            .working
            .monthlies
            .get(&item.monthly_id())
            .map(|m| m.header.user_id == user_id)
            .unwrap_or(false);

        Ok(owned_by_user.then(|| item.clone()))
    }

    async fn list_monthly(
        &mut self,
        user_id: Uuid,
        limit: usize,
        after: Option<MonthlyCursor>,
    ) -> Result<Vec<MonthlySummary>, StoreError> {
        let mut rows: Vec<MonthlySummary> = self
            .working
            .monthlies
            .values()
            .filter(|m| m.header.user_id == user_id)
            .filter(|m| match &after {
                Some(cursor) => m.header.cursor().is_after(cursor),
                None => true,
            })
            .map(|m| m.header.clone())
            .collect();

        rows.sort_by(|a, b| a.cursor().listing_order(&b.cursor()));
        rows.truncate(limit);
        Ok(rows)
    }
}
