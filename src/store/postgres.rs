//! PostgreSQL ledger store
//!
//! One `sqlx` transaction per scope. Ledgers live in `monthly_transactions`
//! (unique on `user_id, reference_month`), items in `transaction_items`.
//! Months are stored as the first day of the month and amounts as minor units.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::aggregate::MonthlyTransaction;
use crate::domain::{Currency, Direction, Money, ReferenceMonth, TransactionItem, TransactionType};

use super::{
    LedgerRepository, MonthlyCursor, MonthlySummary, StoreError, StoreFuture, TransactionBackend,
    TransactionScope,
};

const MONTHLY_COLUMNS: &str = "id, user_id, reference_month, currency, total_income_minor, \
     total_expense_minor, total_amount_minor, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, monthly_id, category_id, title, description, amount_minor, \
     currency, direction, type, paid, created_at, updated_at, deleted_at";

#[derive(Debug, sqlx::FromRow)]
struct MonthlyRow {
    id: Uuid,
    user_id: Uuid,
    reference_month: NaiveDate,
    currency: String,
    total_income_minor: i64,
    total_expense_minor: i64,
    total_amount_minor: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MonthlyRow {
    fn currency(&self) -> Result<Currency, StoreError> {
        self.currency
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("monthly {}: {}", self.id, e)))
    }

    fn into_summary(self) -> Result<MonthlySummary, StoreError> {
        let currency = self.currency()?;
        Ok(MonthlySummary {
            id: self.id,
            user_id: self.user_id,
            reference_month: ReferenceMonth::from_date(self.reference_month),
            currency,
            total_income: Money::new(self.total_income_minor, currency),
            total_expense: Money::new(self.total_expense_minor, currency),
            total_amount: Money::new(self.total_amount_minor, currency),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    monthly_id: Uuid,
    category_id: Uuid,
    title: String,
    description: Option<String>,
    amount_minor: i64,
    currency: String,
    direction: String,
    #[sqlx(rename = "type")]
    kind: String,
    paid: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ItemRow> for TransactionItem {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let corrupt = |e: &dyn std::fmt::Display| StoreError::Corrupt(format!("item {}: {}", row.id, e));

        let currency: Currency = row.currency.parse().map_err(|e| corrupt(&e))?;
        let direction: Direction = row.direction.parse().map_err(|e| corrupt(&e))?;
        let kind: TransactionType = row.kind.parse().map_err(|e| corrupt(&e))?;

        Ok(TransactionItem::restore(
            row.id,
            row.monthly_id,
            row.category_id,
            row.title,
            row.description,
            Money::new(row.amount_minor, currency),
            direction,
            kind,
            row.paid,
            row.created_at,
            row.updated_at,
            row.deleted_at,
        ))
    }
}

/// PostgreSQL transaction backend
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionBackend for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn TransactionScope>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerScope { tx }))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// Open PostgreSQL transaction
pub struct PgLedgerScope {
    tx: Transaction<'static, Postgres>,
}

impl TransactionScope for PgLedgerScope {
    fn repository(&mut self) -> &mut dyn LedgerRepository {
        self
    }

    fn commit(self: Box<Self>) -> StoreFuture {
        let PgLedgerScope { tx } = *self;
        Box::pin(async move { tx.commit().await.map_err(StoreError::from) })
    }

    fn rollback(self: Box<Self>) -> StoreFuture {
        let PgLedgerScope { tx } = *self;
        Box::pin(async move { tx.rollback().await.map_err(StoreError::from) })
    }
}

impl PgLedgerScope {
    /// Attach items to a ledger row
    async fn hydrate(&mut self, row: MonthlyRow) -> Result<MonthlyTransaction, StoreError> {
        let currency = row.currency()?;

        let items = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items \
             WHERE monthly_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(row.id)
        .fetch_all(&mut *self.tx)
        .await?
        .into_iter()
        .map(TransactionItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        MonthlyTransaction::restore(
            row.id,
            row.user_id,
            ReferenceMonth::from_date(row.reference_month),
            currency,
            items,
            row.created_at,
            row.updated_at,
        )
        .map_err(|e| StoreError::Corrupt(format!("monthly {}: {}", row.id, e)))
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerScope {
    async fn find_or_create_monthly(
        &mut self,
        user_id: Uuid,
        reference_month: ReferenceMonth,
        currency: Currency,
    ) -> Result<MonthlyTransaction, StoreError> {
        // Concurrent first writers race here; the unique key lets one win
        let inserted = sqlx::query(
            r#"
            INSERT INTO monthly_transactions (
                id, user_id, reference_month, currency,
                total_income_minor, total_expense_minor, total_amount_minor
            )
            VALUES ($1, $2, $3, $4, 0, 0, 0)
            ON CONFLICT (user_id, reference_month) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(reference_month.first_day())
        .bind(currency.as_str())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if inserted > 0 {
            tracing::debug!(%user_id, %reference_month, "Monthly transaction created");
        }

        let row = sqlx::query_as::<_, MonthlyRow>(&format!(
            "SELECT {MONTHLY_COLUMNS} FROM monthly_transactions \
             WHERE user_id = $1 AND reference_month = $2 FOR UPDATE"
        ))
        .bind(user_id)
        .bind(reference_month.first_day())
        .fetch_one(&mut *self.tx)
        .await?;

        self.hydrate(row).await
    }

    async fn find_monthly_by_id(
        &mut self,
        user_id: Uuid,
        monthly_id: Uuid,
    ) -> Result<Option<MonthlyTransaction>, StoreError> {
        let row = sqlx::query_as::<_, MonthlyRow>(&format!(
            "SELECT {MONTHLY_COLUMNS} FROM monthly_transactions \
             WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(monthly_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_monthly_by_month(
        &mut self,
        user_id: Uuid,
        reference_month: ReferenceMonth,
    ) -> Result<Option<MonthlyTransaction>, StoreError> {
        let row = sqlx::query_as::<_, MonthlyRow>(&format!(
            "SELECT {MONTHLY_COLUMNS} FROM monthly_transactions \
             WHERE user_id = $1 AND reference_month = $2 FOR UPDATE"
        ))
        .bind(user_id)
        .bind(reference_month.first_day())
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn update_monthly(&mut self, monthly: &MonthlyTransaction) -> Result<(), StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE monthly_transactions
            SET total_income_minor = $2,
                total_expense_minor = $3,
                total_amount_minor = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(monthly.id())
        .bind(monthly.total_income().amount_minor())
        .bind(monthly.total_expense().amount_minor())
        .bind(monthly.total_amount().amount_minor())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::MonthlyNotFound(monthly.id()));
        }
        Ok(())
    }

    async fn insert_item(&mut self, item: &TransactionItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transaction_items (
                id, monthly_id, category_id, title, description, amount_minor,
                currency, direction, type, paid, created_at, updated_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(item.id())
        .bind(item.monthly_id())
        .bind(item.category_id())
        .bind(item.title())
        .bind(item.description())
        .bind(item.amount().amount_minor())
        .bind(item.amount().currency().as_str())
        .bind(item.direction().as_str())
        .bind(item.kind().as_str())
        .bind(item.is_paid())
        .bind(item.created_at())
        .bind(item.updated_at())
        .bind(item.deleted_at())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_item(&mut self, item: &TransactionItem) -> Result<(), StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE transaction_items
            SET category_id = $2,
                title = $3,
                description = $4,
                amount_minor = $5,
                currency = $6,
                direction = $7,
                paid = $8,
                updated_at = $9,
                deleted_at = $10
            WHERE id = $1
            "#,
        )
        .bind(item.id())
        .bind(item.category_id())
        .bind(item.title())
        .bind(item.description())
        .bind(item.amount().amount_minor())
        .bind(item.amount().currency().as_str())
        .bind(item.direction().as_str())
        .bind(item.is_paid())
        .bind(item.updated_at())
        .bind(item.deleted_at())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::ItemNotFound(item.id()));
        }
        Ok(())
    }

    async fn find_item_by_id(
        &mut self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<TransactionItem>, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT i.id, i.monthly_id, i.category_id, i.title, i.description, i.amount_minor,
                   i.currency, i.direction, i.type, i.paid, i.created_at, i.updated_at, i.deleted_at
            FROM transaction_items i
            JOIN monthly_transactions m ON m.id = i.monthly_id
            WHERE i.id = $1 AND m.user_id = $2
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(TransactionItem::try_from).transpose()
    }

    async fn list_monthly(
        &mut self,
        user_id: Uuid,
        limit: usize,
        after: Option<MonthlyCursor>,
    ) -> Result<Vec<MonthlySummary>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, MonthlyRow>(&format!(
            "SELECT {MONTHLY_COLUMNS} FROM monthly_transactions \
             WHERE user_id = $1 \
               AND ($2::date IS NULL OR (reference_month, id) < ($2::date, $3::uuid)) \
             ORDER BY reference_month DESC, id DESC \
             LIMIT $4"
        ))
        .bind(user_id)
        .bind(after.map(|c| c.reference_month.first_day()))
        .bind(after.map(|c| c.id))
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(MonthlyRow::into_summary).collect()
    }
}
