//! HTTP-level tests for the POS API.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tavola_core::{CallerContext, Money, Product, Role, Table, TableStatus};
use tavola_db::{Database, DbConfig};
use tavola_orders::{EngineConfig, OrderEngine};
use tower::ServiceExt;

use pos_api::{build_router, AppState, JwtManager};

const BRANCH: &str = "branch-kemang";
const SECRET: &str = "api-test-secret";

struct TestApp {
    router: Router,
    db: Database,
    jwt: JwtManager,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = OrderEngine::new(db.clone(), EngineConfig::new());
        let router = build_router(AppState::new(engine, JwtManager::new(SECRET, 3600)));
        TestApp {
            router,
            db,
            jwt: JwtManager::new(SECRET, 3600),
        }
    }

    async fn add_product(&self, id: &str, name: &str, price: i64, stock: i64) {
        let now = Utc::now();
        self.db
            .products()
            .insert(&Product {
                id: id.to_string(),
                branch_id: BRANCH.to_string(),
                name: name.to_string(),
                price: Money::from_units(price),
                stock,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    async fn add_table(&self, id: &str, number: &str) {
        self.db
            .tables()
            .insert(&Table {
                id: id.to_string(),
                branch_id: BRANCH.to_string(),
                number: number.to_string(),
                name: None,
                capacity: 4,
                status: TableStatus::Available,
                current_order_id: None,
                reservation: None,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    fn token(&self, role: Role) -> String {
        let caller = match role {
            Role::Owner => CallerContext::owner("u-owner"),
            role => CallerContext::staff(format!("u-{}", role.as_str().to_lowercase()), role, BRANCH),
        };
        self.jwt.issue(&caller).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn call(&self, method: &str, uri: &str, role: Option<Role>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(role) = role {
            builder = builder.header("authorization", format!("Bearer {}", self.token(role)));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }
}

fn latte_order(qty: i64) -> Value {
    json!({
        "order_source": "POS",
        "items": [{ "product_id": "p-latte", "qty": qty }]
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_order_and_stock_refusal() {
    let app = TestApp::new().await;
    app.add_product("p-latte", "Latte", 30_000, 3).await;

    let (status, body) = app
        .call("POST", "/orders", Some(Role::Cashier), Some(latte_order(2)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["payment_status"], "UNPAID");
    assert_eq!(body["financials"]["total"], 66_000);
    assert!(body["order_number"].as_str().unwrap().starts_with("POS-"));

    let (status, body) = app
        .call("POST", "/orders", Some(Role::Cashier), Some(latte_order(2)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert!(body["error"].as_str().unwrap().contains("Latte"));
}

#[tokio::test]
async fn test_idempotency_key_replays_original() {
    let app = TestApp::new().await;
    app.add_product("p-latte", "Latte", 30_000, 5).await;

    let request = || {
        Request::builder()
            .method("POST")
            .uri("/orders")
            .header("authorization", format!("Bearer {}", app.token(Role::Cashier)))
            .header("content-type", "application/json")
            .header("idempotency-key", "till-1-0007")
            .body(Body::from(latte_order(1).to_string()))
            .unwrap()
    };

    let (first_status, first) = app.send(request()).await;
    let (replay_status, replay) = app.send(request()).await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(replay_status, StatusCode::OK);
    assert_eq!(first["id"], replay["id"]);
    assert_eq!(app.db.products().stock_of("p-latte").await.unwrap(), Some(4));
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = TestApp::new().await;
    let (status, body) = app.call("GET", "/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/orders")
        .header("authorization", "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guest_web_order_and_public_tracking() {
    let app = TestApp::new().await;
    app.add_product("p-latte", "Latte", 30_000, 5).await;

    let order = json!({
        "order_source": "WEB",
        "guest_info": { "name": "Sari", "whatsapp": "+628123456789", "pax": 2 },
        "items": [{ "product_id": "p-latte", "qty": 1 }]
    });
    let (status, body) = app
        .call("POST", &format!("/orders?branch_id={BRANCH}"), None, Some(order))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let number = body["order_number"].as_str().unwrap().to_string();
    assert!(number.starts_with("WEB-"));

    // Guests never see the staff listing
    let (status, _) = app
        .call("GET", &format!("/orders?branch_id={BRANCH}"), None, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, tracking) = app
        .call("GET", &format!("/orders/track/{number}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tracking["status"], "PENDING");
    assert_eq!(tracking["total"], 33_000);
    assert!(tracking.get("guest_info").is_none());
}

#[tokio::test]
async fn test_guest_cannot_read_tables_or_orders() {
    let app = TestApp::new().await;
    app.add_product("p-latte", "Latte", 30_000, 5).await;
    app.add_table("t-1", "1").await;

    let order = json!({
        "order_source": "WEB",
        "table_id": "t-1",
        "guest_info": { "name": "Sari", "whatsapp": "+628123456789", "pax": 2 },
        "items": [{ "product_id": "p-latte", "qty": 1 }]
    });
    let (status, body) = app
        .call("POST", &format!("/orders?branch_id={BRANCH}"), None, Some(order))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap().to_string();

    for uri in [
        format!("/tables?branch_id={BRANCH}"),
        format!("/tables/t-1?branch_id={BRANCH}"),
        format!("/orders/{id}?branch_id={BRANCH}"),
    ] {
        let (status, body) = app.call("GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert!(body.get("guest_info").is_none());
    }

    let (status, table) = app.call("GET", "/tables/t-1", Some(Role::Waiter), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(table["current_order_id"], id.as_str());
}

#[tokio::test]
async fn test_status_pay_and_void_flow() {
    let app = TestApp::new().await;
    app.add_product("p-latte", "Latte", 30_000, 10).await;

    let (_, order) = app
        .call("POST", "/orders", Some(Role::Cashier), Some(latte_order(2)))
        .await;
    let id = order["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            "PATCH",
            &format!("/orders/{id}/status"),
            Some(Role::Kitchen),
            Some(json!({ "status": "READY" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, body) = app
        .call(
            "PATCH",
            &format!("/orders/{id}/status"),
            Some(Role::Kitchen),
            Some(json!({ "status": "CONFIRMED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CONFIRMED");

    let (status, kitchen) = app.call("GET", "/orders/kitchen", Some(Role::Kitchen), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kitchen.as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(
            "POST",
            &format!("/orders/{id}/pay"),
            Some(Role::Cashier),
            Some(json!({ "payment_method": "CASH", "amount": 50_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_PAYMENT");

    let (status, receipt) = app
        .call(
            "POST",
            &format!("/orders/{id}/pay"),
            Some(Role::Cashier),
            Some(json!({ "payment_method": "CASH", "amount": 70_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["change"], 4_000);
    assert_eq!(receipt["order"]["payment_status"], "PAID");

    let (status, body) = app
        .call("POST", &format!("/orders/{id}/void"), Some(Role::Cashier), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, voided) = app
        .call("POST", &format!("/orders/{id}/void"), Some(Role::Manager), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voided["status"], "CANCELLED");
    assert_eq!(voided["payment_status"], "REFUNDED");
    assert_eq!(app.db.products().stock_of("p-latte").await.unwrap(), Some(10));

    let (status, txs) = app
        .call("GET", &format!("/orders/{id}/transactions"), Some(Role::Manager), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(txs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_other_branch_order_is_not_found() {
    let app = TestApp::new().await;
    app.add_product("p-latte", "Latte", 30_000, 10).await;
    let (_, order) = app
        .call("POST", "/orders", Some(Role::Cashier), Some(latte_order(1)))
        .await;
    let id = order["id"].as_str().unwrap();

    let outsider = app
        .jwt
        .issue(&CallerContext::staff("u-x", Role::Manager, "branch-other"))
        .unwrap();
    let request = Request::builder()
        .uri(format!("/orders/{id}"))
        .header("authorization", format!("Bearer {outsider}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    // Owners span every branch
    let (status, _) = app
        .call("GET", &format!("/orders/{id}"), Some(Role::Owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_table_reset_conflicts_with_unpaid_order() {
    let app = TestApp::new().await;
    app.add_product("p-latte", "Latte", 30_000, 10).await;
    app.add_table("t-a1", "A1").await;

    let order = json!({
        "order_source": "POS",
        "table_id": "t-a1",
        "items": [{ "product_id": "p-latte", "qty": 1 }]
    });
    let (status, _) = app.call("POST", "/orders", Some(Role::Waiter), Some(order)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, table) = app.call("GET", "/tables/t-a1", Some(Role::Waiter), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(table["status"], "occupied");

    let (status, body) = app
        .call("POST", "/tables/t-a1/reset", Some(Role::Cashier), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "TABLE_HAS_UNPAID_ORDERS");

    let (status, table) = app
        .call("POST", "/tables/t-a1/reset", Some(Role::Manager), Some(json!({ "force": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(table["status"], "available");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("authorization", format!("Bearer {}", app.token(Role::Cashier)))
        .header("content-type", "application/json")
        .body(Body::from("{\"order_source\": \"POS\", \"items\": ["))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_inventory_adjust_and_logs() {
    let app = TestApp::new().await;
    app.add_product("p-latte", "Latte", 30_000, 2).await;

    let (status, body) = app
        .call(
            "POST",
            "/inventory/adjust",
            Some(Role::Manager),
            Some(json!({ "product_id": "p-latte", "qty_change": -5, "reason": "WASTAGE" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (status, entry) = app
        .call(
            "POST",
            "/inventory/adjust",
            Some(Role::Manager),
            Some(json!({ "product_id": "p-latte", "qty_change": 10, "reason": "RESTOCK", "note": "Monday delivery" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["qty_before"], 2);
    assert_eq!(entry["qty_after"], 12);

    let (status, page) = app
        .call("GET", "/inventory/logs?product_id=p-latte&limit=5", Some(Role::Manager), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["limit"], 5);
    assert_eq!(page["data"][0]["reason"], "RESTOCK");
}
