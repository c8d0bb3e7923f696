//! Credit-card item persister
//!
//! Turns an in-memory reconciliation into storage writes. The caller takes an
//! [`ItemSnapshot`] before mutating the ledger; afterwards every credit-card
//! item absent from the snapshot is inserted and every one present is updated
//! (soft-deleted items included).

use std::collections::HashSet;
use uuid::Uuid;

use crate::aggregate::MonthlyTransaction;
use crate::domain::TransactionType;

use super::{LedgerRepository, StoreError};

/// Ids of the items attached to a ledger at some point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemSnapshot {
    ids: HashSet<Uuid>,
}

impl ItemSnapshot {
    pub fn capture(monthly: &MonthlyTransaction) -> Self {
        Self {
            ids: monthly.items().iter().map(|item| item.id()).collect(),
        }
    }

    pub fn contains(&self, item_id: Uuid) -> bool {
        self.ids.contains(&item_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistAction {
    Insert(Uuid),
    Update(Uuid),
}

impl PersistAction {
    pub fn item_id(&self) -> Uuid {
        match self {
            PersistAction::Insert(id) | PersistAction::Update(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CreditCardItemPersister;

impl CreditCardItemPersister {
    /// Decide the write for every credit-card item. Updates come first so a
    /// replaced item is tombstoned before its successor is inserted.
    pub fn plan(snapshot: &ItemSnapshot, monthly: &MonthlyTransaction) -> Vec<PersistAction> {
        let (updates, inserts): (Vec<_>, Vec<_>) = monthly
            .items()
            .iter()
            .filter(|item| item.kind() == TransactionType::CreditCard)
            .map(|item| {
                if snapshot.contains(item.id()) {
                    PersistAction::Update(item.id())
                } else {
                    PersistAction::Insert(item.id())
                }
            })
            .partition(|action| matches!(action, PersistAction::Update(_)));

        updates.into_iter().chain(inserts).collect()
    }

    /// Execute the plan inside the caller's transaction
    pub async fn persist(
        repo: &mut dyn LedgerRepository,
        snapshot: &ItemSnapshot,
        monthly: &MonthlyTransaction,
    ) -> Result<Vec<PersistAction>, StoreError> {
        let plan = Self::plan(snapshot, monthly);

        for action in &plan {
            let item = monthly
                .item(action.item_id())
                .ok_or(StoreError::ItemNotFound(action.item_id()))?;
            match action {
                PersistAction::Insert(_) => repo.insert_item(item).await?,
                PersistAction::Update(_) => repo.update_item(item).await?,
            }
        }

        tracing::debug!(
            monthly_id = %monthly.id(),
            actions = plan.len(),
            "Credit-card items persisted"
        );

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Currency, Direction, Money, NewItem, ReferenceMonth, TransactionItem};
    use crate::strategy::StrategyRegistry;

    fn ledger() -> MonthlyTransaction {
        let month: ReferenceMonth = "2025-01".parse().unwrap();
        MonthlyTransaction::new(Uuid::new_v4(), Uuid::new_v4(), month, Currency::Brl)
    }

    fn brl(minor: i64) -> Money {
        Money::new(minor, Currency::Brl)
    }

    fn pix(monthly: &MonthlyTransaction) -> TransactionItem {
        TransactionItem::create(
            Uuid::new_v4(),
            NewItem {
                monthly_id: monthly.id(),
                category_id: Uuid::new_v4(),
                title: "Groceries".to_string(),
                description: None,
                amount: brl(8_000),
                direction: Direction::Expense,
                kind: TransactionType::Pix,
                paid: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_new_credit_card_item_is_inserted() {
        let strategies = StrategyRegistry::with_defaults();
        let mut monthly = ledger();
        monthly.add_item(pix(&monthly)).unwrap();

        let snapshot = ItemSnapshot::capture(&monthly);
        let outcome = monthly
            .reconcile_credit_card_item(&strategies, Uuid::new_v4(), brl(25_000), false)
            .unwrap();

        let plan = CreditCardItemPersister::plan(&snapshot, &monthly);
        assert_eq!(plan, vec![PersistAction::Insert(outcome.item_id().unwrap())]);
    }

    #[test]
    fn test_known_credit_card_item_is_updated() {
        let strategies = StrategyRegistry::with_defaults();
        let mut monthly = ledger();
        let category = Uuid::new_v4();
        let created = monthly
            .reconcile_credit_card_item(&strategies, category, brl(25_000), false)
            .unwrap();

        let snapshot = ItemSnapshot::capture(&monthly);
        monthly
            .reconcile_credit_card_item(&strategies, category, brl(30_000), false)
            .unwrap();

        let plan = CreditCardItemPersister::plan(&snapshot, &monthly);
        assert_eq!(plan, vec![PersistAction::Update(created.item_id().unwrap())]);
    }

    #[test]
    fn test_soft_deleted_items_are_updated_before_inserts() {
        let strategies = StrategyRegistry::with_defaults();
        let mut monthly = ledger();
        let category = Uuid::new_v4();
        let old = monthly
            .reconcile_credit_card_item(&strategies, category, brl(25_000), false)
            .unwrap()
            .item_id()
            .unwrap();
        monthly.remove_item(old).unwrap();

        let snapshot = ItemSnapshot::capture(&monthly);
        let new = monthly
            .reconcile_credit_card_item(&strategies, category, brl(9_000), false)
            .unwrap()
            .item_id()
            .unwrap();

        let plan = CreditCardItemPersister::plan(&snapshot, &monthly);
        assert_eq!(plan, vec![PersistAction::Update(old), PersistAction::Insert(new)]);
    }

    #[test]
    fn test_other_types_are_ignored() {
        let mut monthly = ledger();
        let snapshot = ItemSnapshot::capture(&monthly);
        monthly.add_item(pix(&monthly)).unwrap();

        assert!(snapshot.is_empty());
        assert!(CreditCardItemPersister::plan(&snapshot, &monthly).is_empty());
    }
}
