//! Sync Monthly From Invoices Handler
//!
//! Brings a month's credit-card item in line with the closed-invoice total.
//! Safe to repeat: the same total always converges to the same single item.
//! A month with no ledger and nothing invoiced is left alone.

use uuid::Uuid;

use crate::aggregate::{MonthlyTransaction, ReconcileOutcome};
use crate::domain::{Currency, Money, OperationContext, ReferenceMonth};
use crate::error::{AppError, AppResult, StoreResultExt};
use crate::store::{CreditCardItemPersister, ItemSnapshot, LedgerRepository};

use super::{HandlerDeps, SyncMonthlyCommand, SyncMonthlyResult};

/// Handler for invoice synchronization
#[derive(Debug, Clone)]
pub struct SyncMonthlyFromInvoicesHandler {
    deps: HandlerDeps,
}

impl SyncMonthlyFromInvoicesHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    /// Execute the sync in its own transaction
    #[tracing::instrument(
        name = "sync_monthly",
        skip_all,
        fields(
            user_id = %command.user_id,
            reference_month = %command.reference_month,
            correlation_id = ?context.correlation_id,
        )
    )]
    pub async fn execute(
        &self,
        command: SyncMonthlyCommand,
        context: &OperationContext,
    ) -> AppResult<SyncMonthlyResult> {
        let deps = self.deps.clone();
        let result = self
            .deps
            .uow
            .run(move |repo| Box::pin(sync_in_scope(repo, deps, command)))
            .await?;

        match &result.monthly {
            Some(monthly) => tracing::info!(
                monthly_id = %monthly.id(),
                outcome = result.outcome.as_str(),
                total_expense = %monthly.total_expense(),
                "Monthly transaction synchronized"
            ),
            None => tracing::debug!("No ledger and no closed invoices; nothing to sync"),
        }

        Ok(result)
    }
}

async fn sync_in_scope(
    repo: &mut dyn LedgerRepository,
    deps: HandlerDeps,
    command: SyncMonthlyCommand,
) -> AppResult<SyncMonthlyResult> {
    let existing = repo
        .find_monthly_by_month(command.user_id, command.reference_month)
        .await
        .during("load monthly transaction")?;

    let currency = existing.as_ref().map_or(deps.currency, |m| m.currency());
    let total =
        fetch_closed_total(&deps, command.user_id, command.reference_month, currency).await?;

    let mut monthly = match existing {
        Some(monthly) => monthly,
        None if total.is_zero() => {
            return Ok(SyncMonthlyResult {
                monthly: None,
                outcome: ReconcileOutcome::Skipped,
            })
        }
        None => repo
            .find_or_create_monthly(command.user_id, command.reference_month, currency)
            .await
            .during("create monthly transaction")?,
    };

    let outcome = reconcile_and_persist(
        repo,
        &deps,
        &mut monthly,
        command.category_id,
        total,
        command.paid,
    )
    .await?;

    repo.update_monthly(&monthly)
        .await
        .during("update monthly totals")?;

    Ok(SyncMonthlyResult {
        monthly: Some(monthly),
        outcome,
    })
}

pub(crate) async fn fetch_closed_total(
    deps: &HandlerDeps,
    user_id: Uuid,
    reference_month: ReferenceMonth,
    currency: Currency,
) -> AppResult<Money> {
    deps.invoices
        .closed_invoice_total(user_id, reference_month, currency)
        .await
        .map_err(|e| AppError::invoice("fetch closed invoice total", e))
}

/// Reconcile the ledger against a closed-invoice total and write the
/// credit-card item. Totals are left for the caller to persist.
///
/// Without an explicit `paid`, an existing credit-card item keeps its flag.
pub(crate) async fn reconcile_and_persist(
    repo: &mut dyn LedgerRepository,
    deps: &HandlerDeps,
    monthly: &mut MonthlyTransaction,
    category_id: Uuid,
    total: Money,
    paid: Option<bool>,
) -> AppResult<ReconcileOutcome> {
    let snapshot = ItemSnapshot::capture(monthly);

    let paid = paid.unwrap_or_else(|| {
        monthly
            .active_credit_card_item()
            .map(|item| item.is_paid())
            .unwrap_or(false)
    });

    let outcome = monthly.reconcile_credit_card_item(&deps.strategies, category_id, total, paid)?;

    CreditCardItemPersister::persist(repo, &snapshot, monthly)
        .await
        .during("persist credit card item")?;

    tracing::debug!(
        monthly_id = %monthly.id(),
        total = %total,
        outcome = outcome.as_str(),
        "Credit card item reconciled"
    );

    Ok(outcome)
}
