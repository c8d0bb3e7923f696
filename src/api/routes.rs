//! API Routes
//!
//! HTTP endpoint definitions. Handlers here only translate between JSON and
//! use-case commands; all rules live in `handlers`.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::MonthlyTransaction;
use crate::domain::{OperationContext, ReferenceMonth, TransactionItem};
use crate::error::{AppError, AppResult};
use crate::events::{EventEnvelope, EventPublisher};
use crate::handlers::{
    DeleteTransactionItemCommand, DeleteTransactionItemHandler, GetMonthlyHandler,
    GetMonthlyQuery, HandlerDeps, ListMonthlyHandler, ListMonthlyQuery, PageLimits,
    RegisterTransactionCommand, RegisterTransactionHandler, SyncMonthlyCommand,
    SyncMonthlyFromInvoicesHandler, UpdateTransactionItemCommand, UpdateTransactionItemHandler,
};
use crate::store::MonthlySummary;

use super::middleware::RequestUser;

// =========================================================================
// Shared state
// =========================================================================

/// Handlers shared by every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub register: RegisterTransactionHandler,
    pub update_item: UpdateTransactionItemHandler,
    pub delete_item: DeleteTransactionItemHandler,
    pub sync: SyncMonthlyFromInvoicesHandler,
    pub get_monthly: GetMonthlyHandler,
    pub list_monthly: ListMonthlyHandler,
    pub publisher: EventPublisher,
}

impl AppState {
    pub fn new(deps: HandlerDeps, limits: PageLimits, publisher: EventPublisher) -> Self {
        Self {
            register: RegisterTransactionHandler::new(deps.clone()),
            update_item: UpdateTransactionItemHandler::new(deps.clone()),
            delete_item: DeleteTransactionItemHandler::new(deps.clone()),
            sync: SyncMonthlyFromInvoicesHandler::new(deps.clone()),
            get_monthly: GetMonthlyHandler::new(deps.clone()),
            list_monthly: ListMonthlyHandler::new(deps, limits),
            publisher,
        }
    }
}

// =========================================================================
// Request/Response types
// =========================================================================

/// Amount as sent by clients: a decimal string or a bare JSON number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    fn into_text(self) -> String {
        match self {
            AmountInput::Text(text) => text,
            AmountInput::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterItemRequest {
    pub category_id: String,
    pub reference_month: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub paid: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub paid: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub reference_month: String,
    pub category_id: String,
    #[serde(default)]
    pub paid: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: Uuid,
    pub monthly_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub direction: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&TransactionItem> for ItemResponse {
    fn from(item: &TransactionItem) -> Self {
        Self {
            id: item.id(),
            monthly_id: item.monthly_id(),
            category_id: item.category_id(),
            title: item.title().to_string(),
            description: item.description().map(str::to_string),
            amount: item.amount().to_decimal(),
            direction: item.direction().to_string(),
            kind: item.kind().to_string(),
            paid: item.is_paid(),
            created_at: item.created_at(),
            updated_at: item.updated_at(),
        }
    }
}

/// A ledger with its active items
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reference_month: String,
    pub currency: String,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub total_amount: Decimal,
    pub items: Vec<ItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&MonthlyTransaction> for MonthlyResponse {
    fn from(monthly: &MonthlyTransaction) -> Self {
        Self {
            id: monthly.id(),
            user_id: monthly.user_id(),
            reference_month: monthly.reference_month().to_string(),
            currency: monthly.currency().to_string(),
            total_income: monthly.total_income().to_decimal(),
            total_expense: monthly.total_expense().to_decimal(),
            total_amount: monthly.total_amount().to_decimal(),
            items: monthly.active_items().map(ItemResponse::from).collect(),
            created_at: monthly.created_at(),
            updated_at: monthly.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummaryResponse {
    pub id: Uuid,
    pub reference_month: String,
    pub currency: String,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&MonthlySummary> for MonthlySummaryResponse {
    fn from(summary: &MonthlySummary) -> Self {
        Self {
            id: summary.id,
            reference_month: summary.reference_month.to_string(),
            currency: summary.currency.to_string(),
            total_income: summary.total_income.to_decimal(),
            total_expense: summary.total_expense.to_decimal(),
            total_amount: summary.total_amount.to_decimal(),
            created_at: summary.created_at,
            updated_at: summary.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPageResponse {
    pub entries: Vec<MonthlySummaryResponse>,
    pub has_next: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMutationResponse {
    pub item_id: Option<Uuid>,
    pub monthly: MonthlyResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub outcome: &'static str,
    pub item_id: Option<Uuid>,
    pub monthly: Option<MonthlyResponse>,
}

#[derive(Debug, Serialize)]
pub struct EventAcceptedResponse {
    pub accepted: bool,
    pub name: String,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/monthly-transactions", get(list_monthly))
        .route("/monthly-transactions/items", post(register_item))
        .route("/monthly-transactions/sync", post(sync_monthly))
        .route("/monthly-transactions/:monthly_id", get(get_monthly))
        .route("/items/:item_id", patch(update_item).delete(delete_item))
        .route("/events", post(publish_event))
}

fn parse_uuid_field(field: &str, value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::InvalidRequest(format!("{} must be a UUID", field)))
}

// =========================================================================
// POST /monthly-transactions/items
// =========================================================================

async fn register_item(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<RegisterItemRequest>,
) -> AppResult<(StatusCode, Json<ItemMutationResponse>)> {
    let mut command = RegisterTransactionCommand::new(
        user.user_id,
        request.category_id,
        request.reference_month,
        request.kind,
    );
    command.paid = request.paid;
    command.title = request.title;
    command.description = request.description;
    command.amount = request.amount.map(AmountInput::into_text);
    command.direction = request.direction;

    let result = state.register.execute(command, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(ItemMutationResponse {
            item_id: result.item_id,
            monthly: MonthlyResponse::from(&result.monthly),
        }),
    ))
}

// =========================================================================
// GET /monthly-transactions
// =========================================================================

async fn list_monthly(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(context): Extension<OperationContext>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<MonthlyPageResponse>> {
    let mut query = ListMonthlyQuery::new(user.user_id);
    query.limit = params.limit;
    query.cursor = params.cursor.filter(|c| !c.is_empty());

    let page = state.list_monthly.execute(query, &context).await?;

    Ok(Json(MonthlyPageResponse {
        entries: page.entries.iter().map(MonthlySummaryResponse::from).collect(),
        has_next: page.has_next,
        next_cursor: page.next_cursor,
    }))
}

// =========================================================================
// GET /monthly-transactions/:monthly_id
// =========================================================================

async fn get_monthly(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(context): Extension<OperationContext>,
    Path(monthly_id): Path<String>,
) -> AppResult<Json<MonthlyResponse>> {
    let query = GetMonthlyQuery {
        user_id: user.user_id,
        monthly_id: parse_uuid_field("monthly_id", &monthly_id)?,
    };

    let monthly = state.get_monthly.execute(query, &context).await?;
    Ok(Json(MonthlyResponse::from(&monthly)))
}

// =========================================================================
// POST /monthly-transactions/sync
// =========================================================================

async fn sync_monthly(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<SyncRequest>,
) -> AppResult<Json<SyncResponse>> {
    let reference_month: ReferenceMonth = request.reference_month.parse()?;
    let category_id = parse_uuid_field("categoryId", &request.category_id)?;

    let mut command = SyncMonthlyCommand::new(user.user_id, reference_month, category_id);
    command.paid = request.paid;

    let result = state.sync.execute(command, &context).await?;

    Ok(Json(SyncResponse {
        outcome: result.outcome.as_str(),
        item_id: result.outcome.item_id(),
        monthly: result.monthly.as_ref().map(MonthlyResponse::from),
    }))
}

// =========================================================================
// PATCH /items/:item_id
// =========================================================================

async fn update_item(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(context): Extension<OperationContext>,
    Path(item_id): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> AppResult<Json<ItemMutationResponse>> {
    let item_id = parse_uuid_field("item_id", &item_id)?;

    let command = UpdateTransactionItemCommand {
        category_id: request.category_id,
        title: request.title,
        description: request.description,
        amount: request.amount.map(AmountInput::into_text),
        direction: request.direction,
        paid: request.paid,
        ..UpdateTransactionItemCommand::new(user.user_id, item_id)
    };

    let result = state.update_item.execute(command, &context).await?;

    Ok(Json(ItemMutationResponse {
        item_id: Some(result.item_id),
        monthly: MonthlyResponse::from(&result.monthly),
    }))
}

// =========================================================================
// DELETE /items/:item_id
// =========================================================================

async fn delete_item(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(context): Extension<OperationContext>,
    Path(item_id): Path<String>,
) -> AppResult<Json<ItemMutationResponse>> {
    let item_id = parse_uuid_field("item_id", &item_id)?;
    let command = DeleteTransactionItemCommand::new(user.user_id, item_id);

    let result = state.delete_item.execute(command, &context).await?;

    Ok(Json(ItemMutationResponse {
        item_id: Some(result.item_id),
        monthly: MonthlyResponse::from(&result.monthly),
    }))
}

// =========================================================================
// POST /events
// =========================================================================

/// Accept a purchase event for asynchronous handling. The envelope is
/// decoded up front so malformed events are rejected here, not in the
/// consumer.
async fn publish_event(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(envelope): Json<EventEnvelope>,
) -> AppResult<(StatusCode, Json<EventAcceptedResponse>)> {
    envelope.decode()?;
    let name = envelope.name.clone();

    state.publisher.publish(envelope)?;

    tracing::info!(
        event = %name,
        correlation_id = ?context.correlation_id,
        "Purchase event queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(EventAcceptedResponse {
            accepted: true,
            name,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_input_accepts_text_and_numbers() {
        let text: AmountInput = serde_json::from_value(serde_json::json!("100.50")).unwrap();
        let number: AmountInput = serde_json::from_value(serde_json::json!(42)).unwrap();

        assert_eq!(text.into_text(), "100.50");
        assert_eq!(number.into_text(), "42");
    }

    #[test]
    fn test_register_request_uses_wire_names() {
        let request: RegisterItemRequest = serde_json::from_value(serde_json::json!({
            "categoryId": "c0a80101-0000-4000-8000-000000000001",
            "referenceMonth": "2025-01",
            "type": "PIX",
            "title": "Salary",
            "amount": "1000.00",
            "direction": "INCOME"
        }))
        .unwrap();

        assert_eq!(request.kind, "PIX");
        assert_eq!(request.reference_month, "2025-01");
        assert!(request.paid.is_none());
        assert!(request.description.is_none());
    }
}
