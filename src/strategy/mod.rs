//! Transaction strategies
//!
//! Per-type validation and construction rules for transaction items. The
//! registry is built once at start-up and shared behind an `Arc`; adding a
//! type means registering another strategy, the dispatch code stays as is.

mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Direction, DomainError, Money, NewItem, TransactionItem, TransactionType};

pub use builtin::{BoletoStrategy, CreditCardStrategy, PixStrategy, TransferStrategy};

/// Fields a client supplies when creating an item through a strategy
#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub monthly_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount: Money,
    pub direction: Direction,
    pub paid: bool,
}

/// Behaviour attached to one transaction type
pub trait TransactionStrategy: Send + Sync {
    /// The type this strategy handles
    fn kind(&self) -> TransactionType;

    /// Type-specific rules on top of the base item rules
    fn validate(&self, amount: &Money, direction: Direction, paid: bool) -> Result<(), DomainError>;

    /// Validate, then build an active item of this type with the given identity
    fn create_item(&self, item_id: Uuid, draft: ItemDraft) -> Result<TransactionItem, DomainError> {
        self.validate(&draft.amount, draft.direction, draft.paid)?;
        TransactionItem::create(
            item_id,
            NewItem {
                monthly_id: draft.monthly_id,
                category_id: draft.category_id,
                title: draft.title,
                description: draft.description,
                amount: draft.amount,
                direction: draft.direction,
                kind: self.kind(),
                paid: draft.paid,
            },
        )
    }
}

/// Mapping from transaction type to its strategy
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<TransactionType, Arc<dyn TransactionStrategy>>,
}

impl StrategyRegistry {
    /// Empty registry; every lookup misses until strategies are registered
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in strategy of every transaction type
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for kind in TransactionType::ALL {
            registry.register(default_strategy(kind));
        }
        registry
    }

    /// Register (or replace) the strategy for its type
    pub fn register(&mut self, strategy: Arc<dyn TransactionStrategy>) -> &mut Self {
        self.strategies.insert(strategy.kind(), strategy);
        self
    }

    /// Look a strategy up. `None` means the type is unsupported.
    pub fn get(&self, kind: TransactionType) -> Option<&dyn TransactionStrategy> {
        self.strategies.get(&kind).map(|strategy| strategy.as_ref())
    }

    /// Like `get`, mapping a miss to `DomainError::UnsupportedTransactionType`
    pub fn resolve(&self, kind: TransactionType) -> Result<&dyn TransactionStrategy, DomainError> {
        self.get(kind)
            .ok_or(DomainError::UnsupportedTransactionType(kind))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.strategies.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("StrategyRegistry").field("kinds", &kinds).finish()
    }
}

fn default_strategy(kind: TransactionType) -> Arc<dyn TransactionStrategy> {
    match kind {
        TransactionType::Pix => Arc::new(PixStrategy),
        TransactionType::Boleto => Arc::new(BoletoStrategy),
        TransactionType::Transfer => Arc::new(TransferStrategy),
        TransactionType::CreditCard => Arc::new(CreditCardStrategy),
    }
}
