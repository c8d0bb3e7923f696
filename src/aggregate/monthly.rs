//! Monthly Transaction Aggregate
//!
//! The monthly ledger of one user. Every item mutation goes through this
//! aggregate so that totals, item ownership and the single active credit-card
//! item rule are enforced in one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::iter;
use uuid::Uuid;

use crate::domain::{
    Currency, Direction, DomainError, ItemChanges, Money, ReferenceMonth, TransactionItem,
    TransactionType,
};
use crate::strategy::{CreditCardStrategy, ItemDraft, StrategyRegistry};

/// Derived totals of the active items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub income: Money,
    pub expense: Money,
    /// income - expense
    pub net: Money,
}

impl Totals {
    pub fn zero(currency: Currency) -> Self {
        Self {
            income: Money::zero(currency),
            expense: Money::zero(currency),
            net: Money::zero(currency),
        }
    }

    /// Sum active items per direction. Deleted items never count.
    fn compute<'a>(
        currency: Currency,
        items: impl Iterator<Item = &'a TransactionItem>,
    ) -> Result<Self, DomainError> {
        let mut income = Money::zero(currency);
        let mut expense = Money::zero(currency);

        for item in items.filter(|item| item.is_active()) {
            match item.direction() {
                Direction::Income => income = income.checked_add(&item.amount())?,
                Direction::Expense => expense = expense.checked_add(&item.amount())?,
            }
        }

        let net = income.checked_sub(&expense)?;
        Ok(Self {
            income,
            expense,
            net,
        })
    }
}

/// What a credit-card reconciliation did to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No active credit-card item existed; one was added
    Created(Uuid),
    /// The active credit-card item now carries the new values
    Updated(Uuid),
    /// The active credit-card item already carried these values
    Unchanged(Uuid),
    /// The invoice total dropped to zero; the item was soft-deleted
    Removed(Uuid),
    /// Zero total and nothing to remove
    Skipped,
}

impl ReconcileOutcome {
    pub fn item_id(&self) -> Option<Uuid> {
        match self {
            ReconcileOutcome::Created(id)
            | ReconcileOutcome::Updated(id)
            | ReconcileOutcome::Unchanged(id)
            | ReconcileOutcome::Removed(id) => Some(*id),
            ReconcileOutcome::Skipped => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created(_) => "created",
            ReconcileOutcome::Updated(_) => "updated",
            ReconcileOutcome::Unchanged(_) => "unchanged",
            ReconcileOutcome::Removed(_) => "removed",
            ReconcileOutcome::Skipped => "skipped",
        }
    }
}

/// Monthly ledger aggregate (one per user and reference month)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTransaction {
    id: Uuid,
    user_id: Uuid,
    reference_month: ReferenceMonth,
    currency: Currency,
    totals: Totals,
    items: Vec<TransactionItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MonthlyTransaction {
    /// Fresh ledger with zero totals and no items
    pub fn new(id: Uuid, user_id: Uuid, reference_month: ReferenceMonth, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            reference_month,
            currency,
            totals: Totals::zero(currency),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild from storage. Totals are recomputed from the items, stored
    /// totals are never trusted.
    pub fn restore(
        id: Uuid,
        user_id: Uuid,
        reference_month: ReferenceMonth,
        currency: Currency,
        items: Vec<TransactionItem>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let totals = Totals::compute(currency, items.iter())?;
        Ok(Self {
            id,
            user_id,
            reference_month,
            currency,
            totals,
            items,
            created_at,
            updated_at,
        })
    }

    // =========================================================================
    // Item mutations
    // =========================================================================

    /// Attach a new item to this ledger
    pub fn add_item(&mut self, item: TransactionItem) -> Result<(), DomainError> {
        self.ensure_owned(&item)?;
        self.ensure_currency(&item.amount())?;

        if item.kind() == TransactionType::CreditCard
            && item.is_active()
            && self.active_credit_card_item().is_some()
        {
            return Err(DomainError::DuplicateCreditCardItem {
                monthly_id: self.id,
            });
        }

        let totals = Totals::compute(self.currency, self.items.iter().chain(iter::once(&item)))?;

        self.items.push(item);
        self.apply_totals(totals);
        Ok(())
    }

    /// Update one of this ledger's items (active or deleted)
    pub fn update_item(
        &mut self,
        item_id: Uuid,
        changes: ItemChanges,
    ) -> Result<&TransactionItem, DomainError> {
        let index = self.owned_item_index(item_id)?;
        if let Some(amount) = &changes.amount {
            self.ensure_currency(amount)?;
        }

        let mut candidate = self.items[index].clone();
        candidate.update(changes)?;

        let totals = Totals::compute(
            self.currency,
            self.items
                .iter()
                .enumerate()
                .map(|(i, item)| if i == index { &candidate } else { item }),
        )?;

        self.items[index] = candidate;
        self.apply_totals(totals);
        Ok(&self.items[index])
    }

    /// Soft-delete one of this ledger's items
    pub fn remove_item(&mut self, item_id: Uuid) -> Result<&TransactionItem, DomainError> {
        let index = self.owned_item_index(item_id)?;

        let mut candidate = self.items[index].clone();
        candidate.delete(Utc::now());

        let totals = Totals::compute(
            self.currency,
            self.items
                .iter()
                .enumerate()
                .map(|(i, item)| if i == index { &candidate } else { item }),
        )?;

        self.items[index] = candidate;
        self.apply_totals(totals);
        Ok(&self.items[index])
    }

    // =========================================================================
    // Credit-card reconciliation
    // =========================================================================

    /// Make the ledger reflect a closed-invoice total.
    ///
    /// Converges to exactly one active CREDIT_CARD item carrying `amount`, no
    /// matter how many times it is called. A zero total soft-deletes the
    /// active item, if any.
    pub fn reconcile_credit_card_item(
        &mut self,
        strategies: &StrategyRegistry,
        category_id: Uuid,
        amount: Money,
        paid: bool,
    ) -> Result<ReconcileOutcome, DomainError> {
        self.ensure_currency(&amount)?;
        let existing = self.active_credit_card_item().map(|item| {
            let unchanged = item.amount() == amount
                && item.is_paid() == paid
                && item.category_id() == category_id;
            (item.id(), unchanged)
        });

        if amount.is_zero() {
            return match existing {
                Some((item_id, _)) => {
                    self.remove_item(item_id)?;
                    Ok(ReconcileOutcome::Removed(item_id))
                }
                None => Ok(ReconcileOutcome::Skipped),
            };
        }

        let strategy = strategies.resolve(TransactionType::CreditCard)?;
        strategy.validate(&amount, Direction::Expense, paid)?;

        match existing {
            Some((item_id, true)) => Ok(ReconcileOutcome::Unchanged(item_id)),
            Some((item_id, false)) => {
                self.update_item(
                    item_id,
                    ItemChanges {
                        category_id: Some(category_id),
                        amount: Some(amount),
                        paid: Some(paid),
                        ..Default::default()
                    },
                )?;
                Ok(ReconcileOutcome::Updated(item_id))
            }
            None => {
                let item = strategy.create_item(
                    Uuid::new_v4(),
                    ItemDraft {
                        monthly_id: self.id,
                        category_id,
                        title: CreditCardStrategy::ITEM_TITLE.to_string(),
                        description: Some(format!(
                            "Closed invoices for {}",
                            self.reference_month
                        )),
                        amount,
                        direction: Direction::Expense,
                        paid,
                    },
                )?;
                let item_id = item.id();
                self.add_item(item)?;
                Ok(ReconcileOutcome::Created(item_id))
            }
        }
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn owned_item_index(&self, item_id: Uuid) -> Result<usize, DomainError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id() == item_id)
            .ok_or(DomainError::ItemNotFound(item_id))?;
        self.ensure_owned(&self.items[index])?;
        Ok(index)
    }

    fn ensure_owned(&self, item: &TransactionItem) -> Result<(), DomainError> {
        if item.monthly_id() != self.id {
            return Err(DomainError::ItemDoesNotBelongToAggregate {
                item_id: item.id(),
                monthly_id: self.id,
            });
        }
        Ok(())
    }

    fn ensure_currency(&self, amount: &Money) -> Result<(), DomainError> {
        if amount.currency() != self.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency.to_string(),
                found: amount.currency().to_string(),
            });
        }
        Ok(())
    }

    fn apply_totals(&mut self, totals: Totals) {
        self.totals = totals;
        self.updated_at = Utc::now();
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn reference_month(&self) -> ReferenceMonth {
        self.reference_month
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn total_income(&self) -> Money {
        self.totals.income
    }

    pub fn total_expense(&self) -> Money {
        self.totals.expense
    }

    /// Net amount (income - expense)
    pub fn total_amount(&self) -> Money {
        self.totals.net
    }

    pub fn items(&self) -> &[TransactionItem] {
        &self.items
    }

    pub fn active_items(&self) -> impl Iterator<Item = &TransactionItem> {
        self.items.iter().filter(|item| item.is_active())
    }

    pub fn item(&self, item_id: Uuid) -> Option<&TransactionItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    pub fn active_credit_card_item(&self) -> Option<&TransactionItem> {
        self.active_items()
            .find(|item| item.kind() == TransactionType::CreditCard)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewItem;

    fn brl(minor: i64) -> Money {
        Money::new(minor, Currency::Brl)
    }

    fn month() -> ReferenceMonth {
        "2025-01".parse().unwrap()
    }

    fn ledger() -> MonthlyTransaction {
        MonthlyTransaction::new(Uuid::new_v4(), Uuid::new_v4(), month(), Currency::Brl)
    }

    fn item_for(
        monthly: &MonthlyTransaction,
        kind: TransactionType,
        direction: Direction,
        amount_minor: i64,
    ) -> TransactionItem {
        TransactionItem::create(
            Uuid::new_v4(),
            NewItem {
                monthly_id: monthly.id(),
                category_id: Uuid::new_v4(),
                title: format!("{kind} {amount_minor}"),
                description: None,
                amount: brl(amount_minor),
                direction,
                kind,
                paid: false,
            },
        )
        .unwrap()
    }

    /// Recompute totals by hand from the active items
    fn assert_totals_consistent(monthly: &MonthlyTransaction) {
        let income: i64 = monthly
            .active_items()
            .filter(|i| i.direction() == Direction::Income)
            .map(|i| i.amount().amount_minor())
            .sum();
        let expense: i64 = monthly
            .active_items()
            .filter(|i| i.direction() == Direction::Expense)
            .map(|i| i.amount().amount_minor())
            .sum();

        assert_eq!(monthly.total_income().amount_minor(), income);
        assert_eq!(monthly.total_expense().amount_minor(), expense);
        assert_eq!(monthly.total_amount().amount_minor(), income - expense);
    }

    fn credit_card_items(monthly: &MonthlyTransaction) -> Vec<&TransactionItem> {
        monthly
            .active_items()
            .filter(|i| i.kind() == TransactionType::CreditCard)
            .collect()
    }

    #[test]
    fn test_new_ledger_is_empty() {
        let monthly = ledger();
        assert!(monthly.items().is_empty());
        assert_eq!(monthly.total_income(), brl(0));
        assert_eq!(monthly.total_expense(), brl(0));
        assert_eq!(monthly.total_amount(), brl(0));
    }

    #[test]
    fn test_totals_follow_every_mutation() {
        let mut monthly = ledger();

        let salary = item_for(&monthly, TransactionType::Transfer, Direction::Income, 500_000);
        let rent = item_for(&monthly, TransactionType::Boleto, Direction::Expense, 150_000);
        let lunch = item_for(&monthly, TransactionType::Pix, Direction::Expense, 4_500);
        let (rent_id, lunch_id) = (rent.id(), lunch.id());

        monthly.add_item(salary).unwrap();
        assert_totals_consistent(&monthly);
        monthly.add_item(rent).unwrap();
        assert_totals_consistent(&monthly);
        monthly.add_item(lunch).unwrap();
        assert_totals_consistent(&monthly);
        assert_eq!(monthly.total_amount().amount_minor(), 500_000 - 154_500);

        monthly
            .update_item(
                rent_id,
                ItemChanges {
                    amount: Some(brl(160_000)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_totals_consistent(&monthly);
        assert_eq!(monthly.total_expense().amount_minor(), 164_500);

        monthly
            .update_item(
                lunch_id,
                ItemChanges {
                    direction: Some(Direction::Income),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_totals_consistent(&monthly);

        monthly.remove_item(rent_id).unwrap();
        assert_totals_consistent(&monthly);
        assert_eq!(monthly.total_expense().amount_minor(), 0);
        assert_eq!(monthly.total_income().amount_minor(), 504_500);
        assert_eq!(monthly.items().len(), 3);
    }

    #[test]
    fn test_remove_keeps_item_with_tombstone() {
        let mut monthly = ledger();
        let first = item_for(&monthly, TransactionType::Pix, Direction::Expense, 10_000);
        let second = item_for(&monthly, TransactionType::Pix, Direction::Expense, 5_000);
        let second_id = second.id();
        monthly.add_item(first).unwrap();
        monthly.add_item(second).unwrap();
        assert_eq!(monthly.total_expense().amount_minor(), 15_000);

        let removed = monthly.remove_item(second_id).unwrap();
        let tombstone = removed.deleted_at();
        assert!(tombstone.is_some());
        assert_eq!(monthly.total_expense().amount_minor(), 10_000);

        // removing again keeps the first tombstone and the totals
        monthly.remove_item(second_id).unwrap();
        assert_eq!(monthly.item(second_id).unwrap().deleted_at(), tombstone);
        assert_eq!(monthly.total_expense().amount_minor(), 10_000);
    }

    #[test]
    fn test_update_unknown_item() {
        let mut monthly = ledger();
        let missing = Uuid::new_v4();
        let result = monthly.update_item(missing, ItemChanges::default());
        assert_eq!(result.unwrap_err(), DomainError::ItemNotFound(missing));
        assert!(matches!(
            monthly.remove_item(missing),
            Err(DomainError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_ownership_mismatch_is_rejected() {
        let other = ledger();
        let foreign = item_for(&other, TransactionType::Pix, Direction::Expense, 7_000);
        let foreign_id = foreign.id();

        // storage handed us an item owned by another ledger
        let mut monthly = MonthlyTransaction::restore(
            Uuid::new_v4(),
            Uuid::new_v4(),
            month(),
            Currency::Brl,
            vec![foreign],
            Utc::now(),
            Utc::now(),
        )
        .unwrap();

        let update = monthly.update_item(
            foreign_id,
            ItemChanges {
                amount: Some(brl(1)),
                ..Default::default()
            },
        );
        assert!(matches!(
            update,
            Err(DomainError::ItemDoesNotBelongToAggregate { .. })
        ));
        assert!(matches!(
            monthly.remove_item(foreign_id),
            Err(DomainError::ItemDoesNotBelongToAggregate { .. })
        ));
        assert_eq!(monthly.item(foreign_id).unwrap().amount(), brl(7_000));
        assert!(monthly.item(foreign_id).unwrap().is_active());
    }

    #[test]
    fn test_add_rejects_foreign_item() {
        let other = ledger();
        let mut monthly = ledger();
        let foreign = item_for(&other, TransactionType::Pix, Direction::Expense, 7_000);
        assert!(matches!(
            monthly.add_item(foreign),
            Err(DomainError::ItemDoesNotBelongToAggregate { .. })
        ));
        assert!(monthly.items().is_empty());
    }

    #[test]
    fn test_add_rejects_second_credit_card_item() {
        let mut monthly = ledger();
        let first = item_for(&monthly, TransactionType::CreditCard, Direction::Expense, 25_000);
        let second = item_for(&monthly, TransactionType::CreditCard, Direction::Expense, 30_000);

        monthly.add_item(first).unwrap();
        let result = monthly.add_item(second);

        assert_eq!(
            result,
            Err(DomainError::DuplicateCreditCardItem {
                monthly_id: monthly.id()
            })
        );
        assert_eq!(monthly.total_expense().amount_minor(), 25_000);
    }

    #[test]
    fn test_add_rejects_other_currency() {
        let mut monthly = ledger();
        let item = TransactionItem::create(
            Uuid::new_v4(),
            NewItem {
                monthly_id: monthly.id(),
                category_id: Uuid::new_v4(),
                title: "Hotel".to_string(),
                description: None,
                amount: Money::new(10_000, Currency::Usd),
                direction: Direction::Expense,
                kind: TransactionType::Transfer,
                paid: true,
            },
        )
        .unwrap();

        assert!(matches!(
            monthly.add_item(item),
            Err(DomainError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_failed_update_leaves_totals_untouched() {
        let mut monthly = ledger();
        let item = item_for(&monthly, TransactionType::Pix, Direction::Expense, 10_000);
        let item_id = item.id();
        monthly.add_item(item).unwrap();

        let result = monthly.update_item(
            item_id,
            ItemChanges {
                amount: Some(brl(-5)),
                ..Default::default()
            },
        );

        assert!(matches!(result, Err(DomainError::InvalidAmount(_))));
        assert_eq!(monthly.total_expense().amount_minor(), 10_000);
    }

    #[test]
    fn test_reconcile_converges_to_single_item() {
        let strategies = StrategyRegistry::with_defaults();
        let mut monthly = ledger();
        let category = Uuid::new_v4();

        let pix = item_for(&monthly, TransactionType::Pix, Direction::Expense, 10_000);
        monthly.add_item(pix).unwrap();

        let amounts = [25_000, 30_000, 1, 99_999, 42_000];
        let mut first_id = None;
        for amount in amounts {
            let outcome = monthly
                .reconcile_credit_card_item(&strategies, category, brl(amount), false)
                .unwrap();
            first_id.get_or_insert(outcome.item_id().unwrap());

            let cards = credit_card_items(&monthly);
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].amount(), brl(amount));
            assert_eq!(Some(cards[0].id()), first_id);
            assert_totals_consistent(&monthly);
        }

        assert_eq!(monthly.total_expense().amount_minor(), 10_000 + 42_000);
        assert_eq!(monthly.items().len(), 2);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let strategies = StrategyRegistry::with_defaults();
        let mut monthly = ledger();
        let category = Uuid::new_v4();

        let first = monthly
            .reconcile_credit_card_item(&strategies, category, brl(25_000), false)
            .unwrap();
        let totals_after_first = *monthly.totals();
        let second = monthly
            .reconcile_credit_card_item(&strategies, category, brl(25_000), false)
            .unwrap();

        assert!(matches!(first, ReconcileOutcome::Created(_)));
        assert_eq!(second, ReconcileOutcome::Unchanged(first.item_id().unwrap()));
        assert_eq!(monthly.totals(), &totals_after_first);
        assert_eq!(monthly.items().len(), 1);
    }

    #[test]
    fn test_reconcile_creates_expense_item() {
        let strategies = StrategyRegistry::with_defaults();
        let mut monthly = ledger();
        let category = Uuid::new_v4();

        monthly
            .reconcile_credit_card_item(&strategies, category, brl(25_000), true)
            .unwrap();

        let card = monthly.active_credit_card_item().unwrap();
        assert_eq!(card.direction(), Direction::Expense);
        assert_eq!(card.category_id(), category);
        assert_eq!(card.monthly_id(), monthly.id());
        assert_eq!(card.title(), CreditCardStrategy::ITEM_TITLE);
        assert!(card.is_paid());
    }

    #[test]
    fn test_reconcile_zero_total_removes_item() {
        let strategies = StrategyRegistry::with_defaults();
        let mut monthly = ledger();
        let category = Uuid::new_v4();

        let created = monthly
            .reconcile_credit_card_item(&strategies, category, brl(25_000), false)
            .unwrap();
        let removed = monthly
            .reconcile_credit_card_item(&strategies, category, brl(0), false)
            .unwrap();

        assert_eq!(removed, ReconcileOutcome::Removed(created.item_id().unwrap()));
        assert!(monthly.active_credit_card_item().is_none());
        assert_eq!(monthly.total_expense(), brl(0));

        let again = monthly
            .reconcile_credit_card_item(&strategies, category, brl(0), false)
            .unwrap();
        assert_eq!(again, ReconcileOutcome::Skipped);

        let recreated = monthly
            .reconcile_credit_card_item(&strategies, category, brl(1_000), false)
            .unwrap();
        assert!(matches!(recreated, ReconcileOutcome::Created(_)));
        assert_eq!(credit_card_items(&monthly).len(), 1);
        assert_eq!(monthly.items().len(), 2);
    }

    #[test]
    fn test_reconcile_rejects_negative_total() {
        let strategies = StrategyRegistry::with_defaults();
        let mut monthly = ledger();
        let result =
            monthly.reconcile_credit_card_item(&strategies, Uuid::new_v4(), brl(-100), false);
        assert!(matches!(result, Err(DomainError::InvalidAmount(_))));
        assert!(monthly.items().is_empty());
    }

    #[test]
    fn test_reconcile_without_credit_card_strategy() {
        let strategies = StrategyRegistry::empty();
        let mut monthly = ledger();
        let result =
            monthly.reconcile_credit_card_item(&strategies, Uuid::new_v4(), brl(100), false);
        assert_eq!(
            result,
            Err(DomainError::UnsupportedTransactionType(
                TransactionType::CreditCard
            ))
        );
    }

    #[test]
    fn test_restore_recomputes_totals() {
        let id = Uuid::new_v4();
        let stub = MonthlyTransaction::new(id, Uuid::new_v4(), month(), Currency::Brl);
        let income = item_for(&stub, TransactionType::Transfer, Direction::Income, 20_000);
        let mut deleted = item_for(&stub, TransactionType::Pix, Direction::Expense, 5_000);
        deleted.delete(Utc::now());

        let monthly = MonthlyTransaction::restore(
            id,
            stub.user_id(),
            month(),
            Currency::Brl,
            vec![income, deleted],
            Utc::now(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(monthly.total_income().amount_minor(), 20_000);
        assert_eq!(monthly.total_expense().amount_minor(), 0);
        assert_eq!(monthly.total_amount().amount_minor(), 20_000);
    }
}
