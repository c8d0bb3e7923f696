//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use uuid::Uuid;

use monthly_ledger::api::{self, AppState};
use monthly_ledger::domain::{Currency, Money, OperationContext, OperationSource, ReferenceMonth};
use monthly_ledger::events::{EventBus, EventConsumer, EventPublisher, PurchaseEventHandler, RetryPolicy};
use monthly_ledger::handlers::{HandlerDeps, PageLimits, SyncMonthlyFromInvoicesHandler};
use monthly_ledger::invoicing::StaticInvoiceTotals;
use monthly_ledger::store::{InMemoryLedger, UnitOfWork};
use monthly_ledger::strategy::StrategyRegistry;

/// In-memory ledger wired the same way the binary wires postgres
pub struct TestLedger {
    pub store: InMemoryLedger,
    pub invoices: StaticInvoiceTotals,
    pub deps: HandlerDeps,
    pub context: OperationContext,
}

impl TestLedger {
    pub fn new() -> Self {
        let store = InMemoryLedger::new();
        let invoices = StaticInvoiceTotals::new();
        let deps = HandlerDeps::new(
            UnitOfWork::new(Arc::new(store.clone())),
            Arc::new(StrategyRegistry::with_defaults()),
            Arc::new(invoices.clone()),
            Currency::Brl,
        );

        Self {
            store,
            invoices,
            deps,
            context: OperationContext::new(OperationSource::Internal),
        }
    }

    pub fn event_handler(&self) -> PurchaseEventHandler {
        PurchaseEventHandler::new(SyncMonthlyFromInvoicesHandler::new(self.deps.clone()))
    }

    pub fn event_bus(&self, capacity: usize) -> (EventPublisher, EventConsumer) {
        EventBus::channel(capacity)
    }

    /// Full HTTP router with the given page limits
    pub fn router(&self, limits: PageLimits, publisher: EventPublisher) -> Router {
        api::build_router(AppState::new(self.deps.clone(), limits, publisher))
    }
}

/// Retry policy with millisecond backoff
pub fn quick_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(10),
    }
}

pub fn month(s: &str) -> ReferenceMonth {
    s.parse().unwrap()
}

pub fn brl(minor: i64) -> Money {
    Money::new(minor, Currency::Brl)
}

/// JSON request carrying the acting user
pub fn json_request(method: &str, uri: &str, user_id: Uuid, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("X-Request-User-Id", user_id.to_string())
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str, user_id: Uuid) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("X-Request-User-Id", user_id.to_string())
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
