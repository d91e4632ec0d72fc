use super::*;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct MockState {
    authorization: Arc<Mutex<Vec<String>>>,
    status_paths: Arc<Mutex<Vec<String>>>,
    status_bodies: Arc<Mutex<Vec<Value>>>,
    measurement_bodies: Arc<Mutex<Vec<(String, Value)>>>,
    deleted: Arc<Mutex<Vec<String>>>,
}

fn record_auth(state: &MockState, headers: &HeaderMap) {
    if let Some(value) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
    {
        state
            .authorization
            .lock()
            .expect("lock")
            .push(value.to_string());
    }
}

fn order_json(id: &str, status: &str) -> Value {
    record_json(&format!("rec-{id}"), id, status)
}

fn record_json(record_id: &str, id: &str, status: &str) -> Value {
    json!({
        "_id": record_id,
        "orderId": id,
        "orderDate": "2024-03-10T18:00:00Z",
        "firstName": "Hira",
        "lastName": "Ahmed",
        "orderStatus": status,
        "address": "3 Gulberg",
        "postCode": "54660",
        "products": [{"productId": 4, "title": "Dupatta", "quantity": 1, "price": 900.0}]
    })
}

async fn list_orders(State(state): State<MockState>, headers: HeaderMap) -> Json<Value> {
    record_auth(&state, &headers);
    Json(json!({ "result": [order_json("A1", "Pending"), order_json("A2", "Dispatched")] }))
}

async fn order_detail(Path(order_id): Path<String>) -> impl IntoResponse {
    if order_id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "no such order" })),
        )
            .into_response();
    }
    Json(json!({ "order": order_json(&order_id, "Pending") })).into_response()
}

async fn update_status(
    State(state): State<MockState>,
    Path(record_id): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if record_id == "locked" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "order is locked" })),
        )
            .into_response();
    }
    let status = body["orderStatus"].as_str().unwrap_or("Pending").to_string();
    let order_id = body["orderId"].as_str().unwrap_or_default().to_string();
    state.status_paths.lock().expect("lock").push(record_id.clone());
    state.status_bodies.lock().expect("lock").push(body);
    Json(json!({ "result": record_json(&record_id, &order_id, &status) })).into_response()
}

async fn update_measurements(
    State(state): State<MockState>,
    Path(order_id): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    state
        .measurement_bodies
        .lock()
        .expect("lock")
        .push((order_id, body));
    StatusCode::OK
}

async fn delete_order(State(state): State<MockState>, Path(order_id): Path<String>) -> StatusCode {
    state.deleted.lock().expect("lock").push(order_id);
    StatusCode::NO_CONTENT
}

async fn fulfilled_sales() -> Json<Value> {
    Json(json!({ "totalSales": 4200.5 }))
}

async fn sales_of_date(Path(date): Path<String>) -> Json<Value> {
    if date == "2024-03-10" {
        Json(json!(1800))
    } else {
        Json(json!(0))
    }
}

async fn verify_token(headers: HeaderMap) -> impl IntoResponse {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer good-token") => {
            (StatusCode::OK, Json(json!({ "code": 200, "isValid": true })))
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "code": 401, "message": "invalid token" })),
        ),
    }
}

async fn spawn_order_server() -> (String, MockState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = MockState::default();
    let app = Router::new()
        .route("/api/billing-details", get(list_orders))
        .route(
            "/api/billing-details/:order_id",
            axum::routing::delete(delete_order).put(update_measurements),
        )
        .route("/api/get-order-by-orderId/:order_id", get(order_detail))
        .route("/api/billing-status/:order_id", put(update_status))
        .route("/api/total-sales/fulfilled", get(fulfilled_sales))
        .route("/api/total-sales-of-date/:date", get(sales_of_date))
        .route("/api/verify-token", post(verify_token))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api"), state)
}

fn backend(base_url: &str, token: Option<&str>) -> HttpOrderBackend {
    HttpOrderBackend::new(
        BackendOptions::new(base_url).with_token(token.map(str::to_string)),
    )
    .expect("backend")
}

#[test]
fn base_url_gains_trailing_slash() {
    let backend = backend("http://localhost:9000/api", None);
    assert_eq!(backend.base_url().as_str(), "http://localhost:9000/api/");
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = HttpOrderBackend::new(BackendOptions::new("not a url"));
    assert!(matches!(result, Err(ClientError::InvalidUrl { .. })));
}

#[test]
fn blank_token_is_dropped() {
    let options = BackendOptions::new("http://localhost").with_token(Some("  ".to_string()));
    assert_eq!(options.token, None);
}

#[tokio::test]
async fn fetch_orders_unwraps_result_and_sends_bearer_token() {
    let (base_url, state) = spawn_order_server().await;
    let backend = backend(&base_url, Some("good-token"));

    let orders = backend.fetch_orders().await.expect("orders");

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[1].order_status, OrderStatus::Dispatched);
    assert_eq!(
        state.authorization.lock().expect("lock").as_slice(),
        ["Bearer good-token".to_string()]
    );
}

#[tokio::test]
async fn update_status_sends_both_status_keys_and_reads_echo() {
    let (base_url, state) = spawn_order_server().await;
    let backend = backend(&base_url, None);

    let echoed = backend
        .update_status(&OrderId::from("A1"), &OrderId::from("A1"), OrderStatus::Cancelled)
        .await
        .expect("update");

    assert_eq!(echoed.map(|o| o.order_status), Some(OrderStatus::Cancelled));
    let bodies = state.status_bodies.lock().expect("lock");
    assert_eq!(bodies[0]["orderStatus"], "Cancelled");
    assert_eq!(bodies[0]["newStatus"], "Cancelled");
    assert_eq!(bodies[0]["orderId"], "A1");
}

#[tokio::test]
async fn status_update_is_addressed_by_record_id() {
    let (base_url, state) = spawn_order_server().await;
    let backend = backend(&base_url, None);

    let orders = backend.fetch_orders().await.expect("list");
    let first = &orders[0];
    assert_eq!(first.record_key(), &OrderId::from("rec-A1"));

    let echoed = backend
        .update_status(first.record_key(), &first.order_id, OrderStatus::Dispatched)
        .await
        .expect("update")
        .expect("echo");

    assert_eq!(
        state.status_paths.lock().expect("lock").as_slice(),
        ["rec-A1".to_string()]
    );
    assert_eq!(state.status_bodies.lock().expect("lock")[0]["orderId"], "A1");
    assert_eq!(echoed.record_id, Some(OrderId::from("rec-A1")));
    assert_eq!(echoed.order_id, OrderId::from("A1"));
}

#[tokio::test]
async fn measurements_are_put_under_stretch_data() {
    let (base_url, state) = spawn_order_server().await;
    let backend = backend(&base_url, None);
    let mut measurements = StretchData::default();
    measurements.set("kameez.chest", "38").expect("known key");
    measurements.set("fitPreferences.sleeve", "full").expect("known key");

    backend
        .update_measurements(&OrderId::from("A1"), &measurements)
        .await
        .expect("saved");

    let bodies = state.measurement_bodies.lock().expect("lock");
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].0, "A1");
    assert_eq!(
        bodies[0].1,
        json!({
            "stretchData": {
                "kameez": { "chest": "38" },
                "fitPreferences": { "sleeve": "full" }
            }
        })
    );
}

#[tokio::test]
async fn backend_error_message_is_surfaced() {
    let (base_url, _state) = spawn_order_server().await;
    let backend = backend(&base_url, None);

    let err = backend
        .update_status(
            &OrderId::from("locked"),
            &OrderId::from("ORD-9"),
            OrderStatus::Dispatched,
        )
        .await
        .expect_err("must fail");

    match err {
        ClientError::Backend { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "order is locked");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_order_maps_to_not_found() {
    let (base_url, _state) = spawn_order_server().await;
    let backend = backend(&base_url, None);

    let found = backend
        .fetch_order(&OrderId::from("A7"))
        .await
        .expect("detail");
    assert_eq!(found.order_id, OrderId::from("A7"));

    let err = backend
        .fetch_order(&OrderId::from("missing"))
        .await
        .expect_err("missing");
    assert!(matches!(err, ClientError::NotFound(id) if id.as_str() == "missing"));
}

#[tokio::test]
async fn delete_targets_the_order_path() {
    let (base_url, state) = spawn_order_server().await;
    let backend = backend(&base_url, None);

    backend
        .delete_order(&OrderId::from("A2"))
        .await
        .expect("delete");

    assert_eq!(state.deleted.lock().expect("lock").as_slice(), ["A2".to_string()]);
}

#[tokio::test]
async fn sales_reports_accept_wrapped_and_bare_totals() {
    let (base_url, _state) = spawn_order_server().await;
    let backend = backend(&base_url, None);

    assert_eq!(
        backend.total_fulfilled_sales().await.expect("fulfilled"),
        4200.5
    );
    let day = NaiveDate::from_ymd_opt(2024, 3, 10).expect("date");
    assert_eq!(backend.total_sales_on(day).await.expect("day"), 1800.0);
}

#[tokio::test]
async fn verify_token_distinguishes_valid_and_rejected_tokens() {
    let (base_url, _state) = spawn_order_server().await;

    assert!(backend(&base_url, Some("good-token"))
        .verify_token()
        .await
        .expect("valid"));
    assert!(!backend(&base_url, Some("stale-token"))
        .verify_token()
        .await
        .expect("rejected"));
    assert!(!backend(&base_url, None)
        .verify_token()
        .await
        .expect("no token"));
}

#[tokio::test]
async fn unauthorized_list_requires_reauth() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route(
        "/billing-details",
        get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "message": "jwt expired" }))) }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let err = backend(&format!("http://{addr}"), Some("old"))
        .fetch_orders()
        .await
        .expect_err("unauthorized");

    assert!(err.requires_reauth());
    assert_eq!(err.category(false), crate::error::ErrorCategory::Auth);
}
