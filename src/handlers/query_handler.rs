//! Query Handlers
//!
//! Read side: one ledger with its items, or a keyset-paginated listing.

use uuid::Uuid;

use crate::aggregate::MonthlyTransaction;
use crate::domain::{DomainError, OperationContext};
use crate::error::{AppError, AppResult, StoreResultExt};
use crate::store::{LedgerRepository, MonthlyCursor, MonthlySummary};

use super::{GetMonthlyQuery, HandlerDeps, ListMonthlyQuery, MonthlyPage};

/// Page size bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl PageLimits {
    /// Zero is rejected; anything above the maximum is clamped
    pub fn resolve(&self, requested: Option<usize>) -> AppResult<usize> {
        match requested {
            None => Ok(self.default_limit),
            Some(0) => Err(AppError::InvalidRequest(
                "limit must be greater than zero".to_string(),
            )),
            Some(limit) => Ok(limit.min(self.max_limit)),
        }
    }
}

// =========================================================================
// GetMonthlyHandler
// =========================================================================

#[derive(Debug, Clone)]
pub struct GetMonthlyHandler {
    deps: HandlerDeps,
}

impl GetMonthlyHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    #[tracing::instrument(
        name = "get_monthly",
        skip_all,
        fields(
            user_id = %query.user_id,
            monthly_id = %query.monthly_id,
            correlation_id = ?context.correlation_id,
        )
    )]
    pub async fn execute(
        &self,
        query: GetMonthlyQuery,
        context: &OperationContext,
    ) -> AppResult<MonthlyTransaction> {
        let GetMonthlyQuery { user_id, monthly_id } = query;
        self.deps
            .uow
            .run(move |repo| Box::pin(get_in_scope(repo, user_id, monthly_id)))
            .await
    }
}

async fn get_in_scope(
    repo: &mut dyn LedgerRepository,
    user_id: Uuid,
    monthly_id: Uuid,
) -> AppResult<MonthlyTransaction> {
    let monthly = repo
        .find_monthly_by_id(user_id, monthly_id)
        .await
        .during("load monthly transaction")?
        .ok_or(DomainError::MonthlyNotFound(monthly_id))?;
    Ok(monthly)
}

// =========================================================================
// ListMonthlyHandler
// =========================================================================

#[derive(Debug, Clone)]
pub struct ListMonthlyHandler {
    deps: HandlerDeps,
    limits: PageLimits,
}

impl ListMonthlyHandler {
    pub fn new(deps: HandlerDeps, limits: PageLimits) -> Self {
        Self { deps, limits }
    }

    #[tracing::instrument(
        name = "list_monthly",
        skip_all,
        fields(user_id = %query.user_id, correlation_id = ?context.correlation_id)
    )]
    pub async fn execute(
        &self,
        query: ListMonthlyQuery,
        context: &OperationContext,
    ) -> AppResult<MonthlyPage> {
        let limit = self.limits.resolve(query.limit)?;
        let after = query
            .cursor
            .as_deref()
            .map(MonthlyCursor::decode)
            .transpose()
            .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        let user_id = query.user_id;

        // One extra row tells whether another page exists
        let mut entries = self
            .deps
            .uow
            .run(move |repo| Box::pin(list_in_scope(repo, user_id, limit + 1, after)))
            .await?;

        let has_next = entries.len() > limit;
        entries.truncate(limit);

        let next_cursor = match (has_next, entries.last()) {
            (true, Some(last)) => Some(
                last.cursor()
                    .encode()
                    .map_err(|e| AppError::Internal(e.to_string()))?,
            ),
            _ => None,
        };

        tracing::debug!(returned = entries.len(), has_next, "Monthly transactions listed");

        Ok(MonthlyPage {
            entries,
            has_next,
            next_cursor,
        })
    }
}

async fn list_in_scope(
    repo: &mut dyn LedgerRepository,
    user_id: Uuid,
    limit: usize,
    after: Option<MonthlyCursor>,
) -> AppResult<Vec<MonthlySummary>> {
    repo.list_monthly(user_id, limit, after)
        .await
        .during("list monthly transactions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limits() {
        let limits = PageLimits::default();
        assert_eq!(limits.resolve(None).unwrap(), 20);
        assert_eq!(limits.resolve(Some(2)).unwrap(), 2);
        assert_eq!(limits.resolve(Some(1_000)).unwrap(), 100);
        assert!(matches!(limits.resolve(Some(0)), Err(AppError::InvalidRequest(_))));
    }
}
