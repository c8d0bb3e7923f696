//! Item Handlers
//!
//! Update and soft-delete of a single item. The item is looked up first to
//! find its ledger; the change itself always goes through the ledger so
//! totals and ownership are checked in one place.

use uuid::Uuid;

use crate::aggregate::MonthlyTransaction;
use crate::domain::{Currency, Direction, DomainError, ItemChanges, OperationContext};
use crate::error::{AppError, AppResult, StoreResultExt};
use crate::store::LedgerRepository;
use crate::strategy::StrategyRegistry;

use super::parse::{parse_amount, parse_uuid};
use super::{
    DeleteTransactionItemCommand, HandlerDeps, ItemMutationResult, UpdateTransactionItemCommand,
};

fn parse_changes(command: &UpdateTransactionItemCommand, currency: Currency) -> AppResult<ItemChanges> {
    let changes = ItemChanges {
        category_id: command
            .category_id
            .as_deref()
            .map(|value| parse_uuid("category_id", value))
            .transpose()?,
        title: command.title.clone(),
        description: command.description.clone(),
        amount: command
            .amount
            .as_deref()
            .map(|value| parse_amount(value, currency))
            .transpose()?,
        direction: command
            .direction
            .as_deref()
            .map(str::parse::<Direction>)
            .transpose()?,
        paid: command.paid,
    };

    if changes.is_empty() {
        return Err(AppError::InvalidRequest("no fields to update".to_string()));
    }
    Ok(changes)
}

/// Load the item (scoped to the user) and then its ledger
async fn load_owner(
    repo: &mut dyn LedgerRepository,
    user_id: Uuid,
    item_id: Uuid,
) -> AppResult<MonthlyTransaction> {
    let item = repo
        .find_item_by_id(user_id, item_id)
        .await
        .during("load transaction item")?
        .ok_or(DomainError::ItemNotFound(item_id))?;

    let monthly = repo
        .find_monthly_by_id(user_id, item.monthly_id())
        .await
        .during("load monthly transaction")?
        .ok_or(DomainError::MonthlyNotFound(item.monthly_id()))?;

    Ok(monthly)
}

/// Persist the touched item and the new totals
async fn save(
    repo: &mut dyn LedgerRepository,
    monthly: &MonthlyTransaction,
    item_id: Uuid,
) -> AppResult<()> {
    let item = monthly
        .item(item_id)
        .ok_or(DomainError::ItemNotFound(item_id))?;

    repo.update_item(item)
        .await
        .during("update transaction item")?;
    repo.update_monthly(monthly)
        .await
        .during("update monthly totals")?;
    Ok(())
}

// =========================================================================
// UpdateTransactionItemHandler
// =========================================================================

#[derive(Debug, Clone)]
pub struct UpdateTransactionItemHandler {
    deps: HandlerDeps,
}

impl UpdateTransactionItemHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    #[tracing::instrument(
        name = "update_transaction_item",
        skip_all,
        fields(
            user_id = %command.user_id,
            item_id = %command.item_id,
            correlation_id = ?context.correlation_id,
        )
    )]
    pub async fn execute(
        &self,
        command: UpdateTransactionItemCommand,
        context: &OperationContext,
    ) -> AppResult<ItemMutationResult> {
        let changes = parse_changes(&command, self.deps.currency)?;
        let (user_id, item_id) = (command.user_id, command.item_id);

        let strategies = self.deps.strategies.clone();
        let result = self
            .deps
            .uow
            .run(move |repo| {
                Box::pin(update_in_scope(repo, strategies, user_id, item_id, changes))
            })
            .await?;

        tracing::info!(
            monthly_id = %result.monthly.id(),
            total_amount = %result.monthly.total_amount(),
            "Transaction item updated"
        );

        Ok(result)
    }
}

async fn update_in_scope(
    repo: &mut dyn LedgerRepository,
    strategies: std::sync::Arc<StrategyRegistry>,
    user_id: Uuid,
    item_id: Uuid,
    changes: ItemChanges,
) -> AppResult<ItemMutationResult> {
    let mut monthly = load_owner(repo, user_id, item_id).await?;

    // Merged values must still satisfy the rules of the item's type
    let current = monthly
        .item(item_id)
        .ok_or(DomainError::ItemNotFound(item_id))?;
    let amount = changes.amount.unwrap_or(current.amount());
    let direction = changes.direction.unwrap_or(current.direction());
    let paid = changes.paid.unwrap_or(current.is_paid());
    strategies
        .resolve(current.kind())?
        .validate(&amount, direction, paid)?;

    monthly.update_item(item_id, changes)?;
    save(repo, &monthly, item_id).await?;

    Ok(ItemMutationResult { monthly, item_id })
}

// =========================================================================
// DeleteTransactionItemHandler
// =========================================================================

#[derive(Debug, Clone)]
pub struct DeleteTransactionItemHandler {
    deps: HandlerDeps,
}

impl DeleteTransactionItemHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    #[tracing::instrument(
        name = "delete_transaction_item",
        skip_all,
        fields(
            user_id = %command.user_id,
            item_id = %command.item_id,
            correlation_id = ?context.correlation_id,
        )
    )]
    pub async fn execute(
        &self,
        command: DeleteTransactionItemCommand,
        context: &OperationContext,
    ) -> AppResult<ItemMutationResult> {
        let DeleteTransactionItemCommand { user_id, item_id } = command;

        let result = self
            .deps
            .uow
            .run(move |repo| Box::pin(delete_in_scope(repo, user_id, item_id)))
            .await?;

        tracing::info!(
            monthly_id = %result.monthly.id(),
            total_amount = %result.monthly.total_amount(),
            "Transaction item deleted"
        );

        Ok(result)
    }
}

async fn delete_in_scope(
    repo: &mut dyn LedgerRepository,
    user_id: Uuid,
    item_id: Uuid,
) -> AppResult<ItemMutationResult> {
    let mut monthly = load_owner(repo, user_id, item_id).await?;

    monthly.remove_item(item_id)?;
    save(repo, &monthly, item_id).await?;

    Ok(ItemMutationResult { monthly, item_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_is_rejected() {
        let command = UpdateTransactionItemCommand::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(matches!(
            parse_changes(&command, Currency::Brl),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_changes_are_parsed() {
        let command = UpdateTransactionItemCommand::new(Uuid::new_v4(), Uuid::new_v4())
            .with_amount("12.50".to_string())
            .with_direction("income".to_string())
            .with_paid(true);

        let changes = parse_changes(&command, Currency::Brl).unwrap();
        assert_eq!(changes.amount.unwrap().amount_minor(), 1_250);
        assert_eq!(changes.direction, Some(Direction::Income));
        assert_eq!(changes.paid, Some(true));
        assert!(changes.title.is_none());
    }

    #[test]
    fn test_bad_direction_is_rejected() {
        let command = UpdateTransactionItemCommand::new(Uuid::new_v4(), Uuid::new_v4())
            .with_direction("sideways".to_string());
        assert!(matches!(
            parse_changes(&command, Currency::Brl),
            Err(AppError::Domain(DomainError::InvalidDirection(_)))
        ));
    }
}
