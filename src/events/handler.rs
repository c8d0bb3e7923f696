//! Purchase Event Handler
//!
//! Delivery is at-least-once: the consumer retries events that failed on an
//! outage. Nothing here deduplicates deliveries. A redelivered event just
//! syncs the same months again, and the sync path converges to the same
//! ledger state every time.

use std::collections::BTreeSet;

use crate::domain::{OperationContext, PurchaseEvent, ReferenceMonth};
use crate::error::AppResult;
use crate::handlers::{SyncMonthlyCommand, SyncMonthlyFromInvoicesHandler, SyncMonthlyResult};

use super::EventEnvelope;

#[derive(Debug, Clone)]
pub struct PurchaseEventHandler {
    sync: SyncMonthlyFromInvoicesHandler,
}

impl PurchaseEventHandler {
    pub fn new(sync: SyncMonthlyFromInvoicesHandler) -> Self {
        Self { sync }
    }

    /// Sync every distinct affected month once, each in its own transaction.
    /// Stops at the first failure; months already synced stay committed.
    #[tracing::instrument(
        name = "purchase_event",
        skip_all,
        fields(
            event = event.name(),
            user_id = %event.payload().user_id,
            correlation_id = ?context.correlation_id,
        )
    )]
    pub async fn handle(
        &self,
        event: &PurchaseEvent,
        context: &OperationContext,
    ) -> AppResult<Vec<SyncMonthlyResult>> {
        let payload = event.payload();
        let months: BTreeSet<ReferenceMonth> = payload.affected_months.iter().copied().collect();

        let mut results = Vec::with_capacity(months.len());
        for reference_month in months {
            let command = SyncMonthlyCommand::new(payload.user_id, reference_month, payload.category_id);
            results.push(self.sync.execute(command, context).await?);
        }

        tracing::info!(months = results.len(), "Purchase event handled");
        Ok(results)
    }

    /// Decode a raw envelope, then handle it
    pub async fn handle_envelope(
        &self,
        envelope: &EventEnvelope,
        context: &OperationContext,
    ) -> AppResult<Vec<SyncMonthlyResult>> {
        let event = envelope.decode()?;
        self.handle(&event, context).await
    }
}
