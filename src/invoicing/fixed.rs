use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Currency, Money, ReferenceMonth};

use super::{InvoiceError, InvoiceTotalProvider};

#[derive(Debug, Default)]
struct Table {
    totals: HashMap<(Uuid, ReferenceMonth), Money>,
    lookups: Vec<(Uuid, ReferenceMonth)>,
    failure: Option<String>,
}

/// In-memory invoice totals. Records every lookup so callers can check which
/// months were synchronized.
#[derive(Debug, Clone, Default)]
pub struct StaticInvoiceTotals {
    table: Arc<Mutex<Table>>,
}

impl StaticInvoiceTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the closed total of a month
    pub async fn set_total(&self, user_id: Uuid, reference_month: ReferenceMonth, total: Money) {
        self.table
            .lock()
            .await
            .totals
            .insert((user_id, reference_month), total);
    }

    /// Make every following lookup fail until cleared
    pub async fn fail_with(&self, message: Option<String>) {
        self.table.lock().await.failure = message;
    }

    /// Lookups in call order
    pub async fn lookups(&self) -> Vec<(Uuid, ReferenceMonth)> {
        self.table.lock().await.lookups.clone()
    }

    pub async fn lookup_count(&self, user_id: Uuid, reference_month: ReferenceMonth) -> usize {
        self.table
            .lock()
            .await
            .lookups
            .iter()
            .filter(|lookup| **lookup == (user_id, reference_month))
            .count()
    }
}

#[async_trait]
impl InvoiceTotalProvider for StaticInvoiceTotals {
    async fn closed_invoice_total(
        &self,
        user_id: Uuid,
        reference_month: ReferenceMonth,
        currency: Currency,
    ) -> Result<Money, InvoiceError> {
        let mut table = self.table.lock().await;
        table.lookups.push((user_id, reference_month));

        if let Some(message) = &table.failure {
            return Err(InvoiceError::Unavailable(message.clone()));
        }

        Ok(table
            .totals
            .get(&(user_id, reference_month))
            .copied()
            .unwrap_or_else(|| Money::zero(currency)))
    }
}
