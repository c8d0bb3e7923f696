//! Handler dependencies
//!
//! Everything a use case needs, built once at start-up and cloned into each
//! handler. Clones share the same backends.

use std::sync::Arc;

use crate::domain::Currency;
use crate::invoicing::InvoiceTotalProvider;
use crate::store::UnitOfWork;
use crate::strategy::StrategyRegistry;

#[derive(Clone)]
pub struct HandlerDeps {
    pub uow: UnitOfWork,
    pub strategies: Arc<StrategyRegistry>,
    pub invoices: Arc<dyn InvoiceTotalProvider>,
    /// Currency of every ledger created by this process
    pub currency: Currency,
}

impl HandlerDeps {
    pub fn new(
        uow: UnitOfWork,
        strategies: Arc<StrategyRegistry>,
        invoices: Arc<dyn InvoiceTotalProvider>,
        currency: Currency,
    ) -> Self {
        Self {
            uow,
            strategies,
            invoices,
            currency,
        }
    }
}

impl std::fmt::Debug for HandlerDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDeps")
            .field("uow", &self.uow)
            .field("strategies", &self.strategies)
            .field("currency", &self.currency)
            .finish()
    }
}
