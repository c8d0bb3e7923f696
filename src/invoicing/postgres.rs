use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Currency, Money, ReferenceMonth};

use super::{InvoiceError, InvoiceTotalProvider};

/// Reads closed invoices from the invoicing module's `invoices` table
#[derive(Debug, Clone)]
pub struct PgInvoiceTotalProvider {
    pool: PgPool,
}

impl PgInvoiceTotalProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceTotalProvider for PgInvoiceTotalProvider {
    async fn closed_invoice_total(
        &self,
        user_id: Uuid,
        reference_month: ReferenceMonth,
        currency: Currency,
    ) -> Result<Money, InvoiceError> {
        let total_minor: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_minor), 0)::BIGINT
            FROM invoices
            WHERE user_id = $1
              AND reference_month = $2
              AND currency = $3
              AND status IN ('CLOSED', 'PAID')
            "#,
        )
        .bind(user_id)
        .bind(reference_month.first_day())
        .bind(currency.as_str())
        .fetch_one(&self.pool)
        .await?;

        if total_minor < 0 {
            return Err(InvoiceError::InvalidTotal(format!(
                "negative closed total {} for {}",
                total_minor, reference_month
            )));
        }

        tracing::debug!(%user_id, %reference_month, total_minor, "Closed invoice total fetched");

        Ok(Money::new(total_minor, currency))
    }
}
