//! API Integration Tests
//!
//! Drive the full router with `oneshot` against the in-memory store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use monthly_ledger::handlers::PageLimits;
use monthly_ledger::store::MonthlyCursor;

mod common;

use common::{body_json, brl, get_request, json_request, month, TestLedger};

fn pix_body(reference_month: &str, amount: &str, direction: &str) -> Value {
    json!({
        "categoryId": Uuid::new_v4().to_string(),
        "referenceMonth": reference_month,
        "type": "PIX",
        "title": "Market",
        "amount": amount,
        "direction": direction
    })
}

#[tokio::test]
async fn test_health_needs_no_user() {
    let ledger = TestLedger::new();
    let (publisher, _consumer) = ledger.event_bus(4);
    let app = ledger.router(PageLimits::default(), publisher);

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_and_read_back_e2e() {
    let ledger = TestLedger::new();
    let (publisher, _consumer) = ledger.event_bus(4);
    let app = ledger.router(PageLimits::default(), publisher);
    let user_id = Uuid::new_v4();

    // 1. Register a PIX expense
    let req = json_request(
        "POST",
        "/api/v1/monthly-transactions/items",
        user_id,
        pix_body("2025-01", "100.00", "EXPENSE"),
    );
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED, "Registration failed");

    let body = body_json(response).await;
    assert_eq!(body["monthly"]["totalExpense"], "100.00");
    assert_eq!(body["monthly"]["totalIncome"], "0.00");
    assert_eq!(body["monthly"]["totalAmount"], "-100.00");
    assert_eq!(body["monthly"]["referenceMonth"], "2025-01");
    let monthly_id = body["monthly"]["id"].as_str().unwrap().to_string();
    let item_id = body["itemId"].as_str().unwrap().to_string();

    // 2. Read the ledger back
    let uri = format!("/api/v1/monthly-transactions/{}", monthly_id);
    let response = app.clone().oneshot(get_request(&uri, user_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["id"], item_id.as_str());
    assert_eq!(body["items"][0]["amount"], "100.00");
    assert_eq!(body["items"][0]["type"], "PIX");

    // 3. Another user cannot see it
    let response = app
        .clone()
        .oneshot(get_request(&uri, Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // 4. Update the amount
    let req = json_request(
        "PATCH",
        &format!("/api/v1/items/{}", item_id),
        user_id,
        json!({ "amount": 80 }),
    );
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK, "Update failed");
    let body = body_json(response).await;
    assert_eq!(body["monthly"]["totalExpense"], "80.00");

    // 5. Delete it
    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/items/{}", item_id))
        .header("X-Request-User-Id", user_id.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK, "Delete failed");
    let body = body_json(response).await;
    assert_eq!(body["monthly"]["totalExpense"], "0.00");
    assert!(body["monthly"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_user_header_is_rejected() {
    let ledger = TestLedger::new();
    let (publisher, _consumer) = ledger.event_bus(4);
    let app = ledger.router(PageLimits::default(), publisher);

    let req = Request::builder()
        .method("GET")
        .uri("/api/v1/monthly-transactions")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error_code"], "missing_header");
}

#[tokio::test]
async fn test_validation_errors_use_the_error_body() {
    let ledger = TestLedger::new();
    let (publisher, _consumer) = ledger.event_bus(4);
    let app = ledger.router(PageLimits::default(), publisher);
    let user_id = Uuid::new_v4();

    let req = json_request(
        "POST",
        "/api/v1/monthly-transactions/items",
        user_id,
        pix_body("2025-13", "10.00", "EXPENSE"),
    );
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_code"], "invalid_reference_month");

    let req = json_request(
        "POST",
        "/api/v1/monthly-transactions/items",
        user_id,
        pix_body("2025-01", "-5.00", "EXPENSE"),
    );
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_code"], "invalid_amount");

    let response = app
        .oneshot(get_request("/api/v1/monthly-transactions?limit=0", user_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ledger.store.monthly_count().await, 0);
}

#[tokio::test]
async fn test_credit_card_and_sync_follow_the_invoice_total() {
    let ledger = TestLedger::new();
    let (publisher, _consumer) = ledger.event_bus(4);
    let app = ledger.router(PageLimits::default(), publisher);
    let user_id = Uuid::new_v4();
    let category_id = Uuid::new_v4();

    ledger.invoices.set_total(user_id, month("2025-01"), brl(25_000)).await;
    let req = json_request(
        "POST",
        "/api/v1/monthly-transactions/items",
        user_id,
        json!({
            "categoryId": category_id.to_string(),
            "referenceMonth": "2025-01",
            "type": "CREDIT_CARD",
            "amount": "1.00"
        }),
    );
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["monthly"]["totalExpense"], "250.00");

    ledger.invoices.set_total(user_id, month("2025-01"), brl(30_000)).await;
    let req = json_request(
        "POST",
        "/api/v1/monthly-transactions/sync",
        user_id,
        json!({ "referenceMonth": "2025-01", "categoryId": category_id.to_string() }),
    );
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["outcome"], "updated");
    assert_eq!(body["monthly"]["totalExpense"], "300.00");
    assert_eq!(body["monthly"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sync_with_nothing_closed_opens_no_ledger() {
    let ledger = TestLedger::new();
    let (publisher, _consumer) = ledger.event_bus(4);
    let app = ledger.router(PageLimits::default(), publisher);
    let user_id = Uuid::new_v4();

    let req = json_request(
        "POST",
        "/api/v1/monthly-transactions/sync",
        user_id,
        json!({ "referenceMonth": "2025-06", "categoryId": Uuid::new_v4().to_string() }),
    );
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["outcome"], "skipped");
    assert!(body["monthly"].is_null());
    assert_eq!(ledger.store.monthly_count().await, 0);
}

#[tokio::test]
async fn test_listing_returns_a_decodable_cursor() {
    let ledger = TestLedger::new();
    let (publisher, _consumer) = ledger.event_bus(4);
    let app = ledger.router(PageLimits::default(), publisher);
    let user_id = Uuid::new_v4();

    for reference_month in ["2025-01", "2025-02", "2025-03"] {
        let req = json_request(
            "POST",
            "/api/v1/monthly-transactions/items",
            user_id,
            pix_body(reference_month, "10.00", "INCOME"),
        );
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(get_request("/api/v1/monthly-transactions?limit=2", user_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(body["hasNext"], true);
    assert_eq!(entries[0]["totalIncome"], "10.00");

    let cursor = MonthlyCursor::decode(body["nextCursor"].as_str().unwrap()).unwrap();
    assert_eq!(cursor.reference_month.to_string(), entries[1]["referenceMonth"]);
    assert_eq!(cursor.id.to_string(), entries[1]["id"]);

    let uri = format!(
        "/api/v1/monthly-transactions?limit=2&cursor={}",
        body["nextCursor"].as_str().unwrap()
    );
    let response = app.clone().oneshot(get_request(&uri, user_id)).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["hasNext"], false);
    assert!(body["nextCursor"].is_null());

    let response = app
        .oneshot(get_request("/api/v1/monthly-transactions?cursor=%%%", user_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_events_are_queued_for_the_consumer() {
    let ledger = TestLedger::new();
    let (publisher, consumer) = ledger.event_bus(4);
    let app = ledger.router(PageLimits::default(), publisher);
    let user_id = Uuid::new_v4();
    ledger.invoices.set_total(user_id, month("2025-02"), brl(4_200)).await;

    let event = json!({
        "name": "purchase_created",
        "payload": {
            "user_id": user_id,
            "category_id": Uuid::new_v4(),
            "affected_months": ["2025-02"]
        }
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/events", user_id, event))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let unknown = json!({ "name": "purchase_refunded", "payload": {} });
    let response = app
        .oneshot(json_request("POST", "/api/v1/events", user_id, unknown))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Dropping the router drops the last publisher; the consumer drains and stops
    let stats = consumer.run(ledger.event_handler()).await;
    assert_eq!(stats.handled, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(ledger.invoices.lookup_count(user_id, month("2025-02")).await, 1);
}
