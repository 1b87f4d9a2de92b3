mod common;

use auth::entities::db::user_account::{UserAccount, UserRole};
use auth::http::middleware::CurrentUser;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::MemoryShop;
use ordering::config::OrderingConfig;
use ordering::http::{OrderingState, router};
use ordering::utils::qr::SvgQrRenderer;
use serde_json::{Value, json};
use tower::ServiceExt;

struct Harness {
    shop: MemoryShop,
    app: axum::Router,
}

impl Harness {
    fn new() -> Self {
        let shop = MemoryShop::with_catalog();
        let state = OrderingState::new(&OrderingConfig::default(), shop.clone(), SvgQrRenderer::default());
        Self {
            shop,
            app: router(state),
        }
    }

    async fn call(&self, user: &UserAccount, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(path);
        let mut request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        request.extensions_mut().insert(CurrentUser(user.clone()));
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

fn order_body() -> Value {
    json!({
        "delivery_latitude": "-16.500000",
        "delivery_longitude": "-68.150000",
        "items": [
            {"product_id": 1, "quantity": 2, "notes": "no onion"},
            {"product_id": 2, "quantity": 1}
        ]
    })
}

#[tokio::test]
async fn order_and_pay_over_http() {
    let h = Harness::new();
    let ana = h.shop.add_user("ana@example.com", UserRole::Customer, false);

    let (status, order) = h.call(&ana, "POST", "/api/orders", Some(order_body())).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["subtotal"], "61.00");
    assert_eq!(order["delivery_fee"], "10.00");
    assert_eq!(order["total"], "71.00");
    assert_eq!(order["total_items"], 3);
    assert_eq!(order["items"][0]["notes"], "no onion");
    let order_id = order["id"].as_i64().unwrap();

    let (status, payment) = h
        .call(&ana, "POST", "/api/payments/create-qr", Some(json!({"order_id": order_id})))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{payment}");
    assert_eq!(payment["amount"], "71.00");
    let payment_id = payment["id"].as_i64().unwrap();

    let (status, again) = h
        .call(&ana, "POST", "/api/payments/create-qr", Some(json!({"order_id": order_id})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["error"], "payment_already_exists");

    let (status, confirmed) = h
        .call(&ana, "POST", &format!("/api/payments/{payment_id}/confirm"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{confirmed}");
    assert_eq!(confirmed["payment"]["status"], "completed");
    assert_eq!(confirmed["order_status"], "Confirmed");

    let (_, mine) = h.call(&ana, "GET", "/api/orders/my-orders", None).await;
    assert_eq!(mine["count"], 1);
    assert_eq!(mine["orders"][0]["status"], "confirmed");
}

#[tokio::test]
async fn invalid_transition_names_both_states() {
    let h = Harness::new();
    let ana = h.shop.add_user("ana@example.com", UserRole::Customer, false);
    let ops = h.shop.add_user("ops@example.com", UserRole::Customer, true);
    let (_, order) = h.call(&ana, "POST", "/api/orders", Some(order_body())).await;
    let id = order["id"].as_i64().unwrap();

    let (status, body) = h
        .call(
            &ops,
            "POST",
            &format!("/api/orders/{id}/update-status"),
            Some(json!({"status": "delivered"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");
    assert_eq!(body["current"], "pending");
    assert_eq!(body["requested"], "delivered");
}

#[tokio::test]
async fn cancel_accepts_an_empty_body() {
    let h = Harness::new();
    let ana = h.shop.add_user("ana@example.com", UserRole::Customer, false);
    let (_, order) = h.call(&ana, "POST", "/api/orders", Some(order_body())).await;
    let id = order["id"].as_i64().unwrap();

    let (status, body) = h
        .call(&ana, "POST", &format!("/api/orders/{id}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["status_history"][1]["notes"], "Cancelled: No reason given");
}

#[tokio::test]
async fn catalog_errors_are_bad_requests() {
    let h = Harness::new();
    let ana = h.shop.add_user("ana@example.com", UserRole::Customer, false);
    let mut body = order_body();
    body["items"] = json!([{"product_id": 3, "quantity": 1}]);
    let (status, err) = h.call(&ana, "POST", "/api/orders", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "product_unavailable");

    let mut body = order_body();
    body["items"] = json!([]);
    let (status, err) = h.call(&ana, "POST", "/api/orders", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "empty_order");
}

#[tokio::test]
async fn deliveries_are_for_drivers() {
    let h = Harness::new();
    let ana = h.shop.add_user("ana@example.com", UserRole::Customer, false);
    let dan = h.shop.add_user("dan@example.com", UserRole::Driver, false);

    let (status, _) = h.call(&ana, "GET", "/api/orders/my-deliveries", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = h.call(&dan, "GET", "/api/orders/my-deliveries", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn status_filter_on_the_list() {
    let h = Harness::new();
    let ana = h.shop.add_user("ana@example.com", UserRole::Customer, false);
    h.call(&ana, "POST", "/api/orders", Some(order_body())).await;
    let (_, order) = h.call(&ana, "POST", "/api/orders", Some(order_body())).await;
    let id = order["id"].as_i64().unwrap();
    h.call(&ana, "POST", &format!("/api/orders/{id}/cancel"), Some(json!({"reason": "dup"})))
        .await;

    let (_, all) = h.call(&ana, "GET", "/api/orders", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    let (_, cancelled) = h.call(&ana, "GET", "/api/orders?status=cancelled", None).await;
    assert_eq!(cancelled.as_array().unwrap().len(), 1);
    assert_eq!(cancelled[0]["id"], id);
}
