//! Register Transaction Handler
//!
//! Adds a movement to the user's monthly ledger, creating the ledger on first
//! use. CREDIT_CARD registrations never trust the client amount: they
//! reconcile against the closed-invoice total instead.

use uuid::Uuid;

use crate::domain::{Direction, Money, OperationContext, ReferenceMonth, TransactionType};
use crate::error::{AppResult, StoreResultExt};
use crate::store::LedgerRepository;
use crate::strategy::{CreditCardStrategy, ItemDraft};

use super::parse::{parse_amount, parse_uuid, required};
use super::sync_handler::{fetch_closed_total, reconcile_and_persist};
use super::{HandlerDeps, RegisterTransactionCommand, RegisterTransactionResult};

/// Parsed registration, ready to run inside a transaction
#[derive(Debug, Clone)]
struct Registration {
    user_id: Uuid,
    category_id: Uuid,
    reference_month: ReferenceMonth,
    entry: Entry,
}

#[derive(Debug, Clone)]
enum Entry {
    CreditCard {
        paid: Option<bool>,
    },
    Plain {
        kind: TransactionType,
        title: String,
        description: Option<String>,
        amount: Money,
        direction: Direction,
        paid: bool,
    },
}

impl Registration {
    fn parse(command: RegisterTransactionCommand, deps: &HandlerDeps) -> AppResult<Self> {
        let category_id = parse_uuid("category_id", &command.category_id)?;
        let reference_month: ReferenceMonth = command.reference_month.parse()?;
        let kind: TransactionType = command.kind.parse()?;

        let entry = match kind {
            TransactionType::CreditCard => {
                if let Some(direction) = command.direction.as_deref() {
                    CreditCardStrategy::ensure_expense(direction.parse()?)?;
                }
                if command.amount.is_some() {
                    tracing::debug!("Client amount ignored for credit card registration");
                }
                Entry::CreditCard { paid: command.paid }
            }
            _ => {
                let title = required("title", command.title.as_deref())?.to_string();
                let amount = parse_amount(required("amount", command.amount.as_deref())?, deps.currency)?;
                let direction: Direction = required("direction", command.direction.as_deref())?.parse()?;
                Entry::Plain {
                    kind,
                    title,
                    description: command.description,
                    amount,
                    direction,
                    paid: command.paid.unwrap_or(false),
                }
            }
        };

        Ok(Self {
            user_id: command.user_id,
            category_id,
            reference_month,
            entry,
        })
    }
}

// =========================================================================
// RegisterTransactionHandler
// =========================================================================

/// Handler for movement registration
#[derive(Debug, Clone)]
pub struct RegisterTransactionHandler {
    deps: HandlerDeps,
}

impl RegisterTransactionHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    /// Execute the register command
    #[tracing::instrument(
        name = "register_transaction",
        skip_all,
        fields(
            user_id = %command.user_id,
            kind = %command.kind,
            correlation_id = ?context.correlation_id,
        )
    )]
    pub async fn execute(
        &self,
        command: RegisterTransactionCommand,
        context: &OperationContext,
    ) -> AppResult<RegisterTransactionResult> {
        // Reject bad input before opening a transaction
        let registration = Registration::parse(command, &self.deps)?;

        let deps = self.deps.clone();
        let result = self
            .deps
            .uow
            .run(move |repo| Box::pin(register_in_scope(repo, deps, registration)))
            .await?;

        tracing::info!(
            monthly_id = %result.monthly.id(),
            item_id = ?result.item_id,
            reference_month = %result.monthly.reference_month(),
            total_amount = %result.monthly.total_amount(),
            "Transaction registered"
        );

        Ok(result)
    }
}

async fn register_in_scope(
    repo: &mut dyn LedgerRepository,
    deps: HandlerDeps,
    registration: Registration,
) -> AppResult<RegisterTransactionResult> {
    let mut monthly = repo
        .find_or_create_monthly(registration.user_id, registration.reference_month, deps.currency)
        .await
        .during("load monthly transaction")?;

    let item_id = match registration.entry {
        Entry::CreditCard { paid } => {
            let total = fetch_closed_total(
                &deps,
                monthly.user_id(),
                monthly.reference_month(),
                monthly.currency(),
            )
            .await?;
            let outcome = reconcile_and_persist(
                repo,
                &deps,
                &mut monthly,
                registration.category_id,
                total,
                paid,
            )
            .await?;
            outcome.item_id()
        }
        Entry::Plain {
            kind,
            title,
            description,
            amount,
            direction,
            paid,
        } => {
            let item = deps.strategies.resolve(kind)?.create_item(
                Uuid::new_v4(),
                ItemDraft {
                    monthly_id: monthly.id(),
                    category_id: registration.category_id,
                    title,
                    description,
                    amount,
                    direction,
                    paid,
                },
            )?;

            monthly.add_item(item.clone())?;
            repo.insert_item(&item)
                .await
                .during("insert transaction item")?;
            Some(item.id())
        }
    };

    repo.update_monthly(&monthly)
        .await
        .during("update monthly totals")?;

    Ok(RegisterTransactionResult { monthly, item_id })
}
