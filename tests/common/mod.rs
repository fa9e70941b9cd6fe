#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use stockline_api::{
    app_router,
    config::AppConfig,
    db,
    events::{self, EventSender},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up the router over a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // An in-memory database lives and dies with its single connection.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));
        let router = app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router response")
    }

    /// Posts `raw` verbatim as a JSON body and decodes the reply.
    pub async fn post_raw(&self, uri: &str, raw: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw.to_string()))
            .expect("request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        (status, response_json(response).await)
    }

    /// Sends a request and returns the status with the decoded JSON body.
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn create_tenant(&self, slug: &str) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/tenants",
                Some(json!({ "name": format!("Tenant {slug}"), "slug": slug })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create tenant: {body}");
        uuid_field(&body["data"]["id"])
    }

    pub async fn create_product(&self, tenant: Uuid, name: &str, sku: &str) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/api/v1/tenants/{tenant}/products"),
                Some(json!({ "name": name, "sku": sku, "price": "9.99" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product: {body}");
        uuid_field(&body["data"]["id"])
    }

    pub async fn create_material(&self, tenant: Uuid, payload: Value) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/api/v1/tenants/{tenant}/materials"),
                Some(payload),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create material: {body}");
        body["data"].clone()
    }

    /// Material with opening stock, reorder level and unit cost
    pub async fn material(
        &self,
        tenant: Uuid,
        name: &str,
        stock: &str,
        reorder_level: &str,
        unit_cost: &str,
    ) -> Uuid {
        let data = self
            .create_material(
                tenant,
                json!({
                    "name": name,
                    "sku": format!("SKU-{}", name.to_uppercase().replace(' ', "-")),
                    "category": "raw",
                    "unit_of_measure": "ml",
                    "stock_quantity": stock,
                    "reorder_level": reorder_level,
                    "unit_cost": unit_cost,
                }),
            )
            .await;
        uuid_field(&data["id"])
    }

    /// Active recipe for `product` yielding one unit
    pub async fn active_recipe(&self, tenant: Uuid, product: Uuid, components: Value) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/api/v1/tenants/{tenant}/recipes"),
                Some(json!({
                    "product_id": product,
                    "name": "House recipe",
                    "yield_quantity": "1",
                    "yield_unit": "unit",
                    "is_active": true,
                    "components": components,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create recipe: {body}");
        uuid_field(&body["data"]["recipe"]["id"])
    }

    pub async fn adjust(&self, tenant: Uuid, material: Uuid, payload: Value) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            &format!("/api/v1/tenants/{tenant}/materials/{material}/adjust-stock"),
            Some(payload),
        )
        .await
    }

    pub async fn stock_of(&self, tenant: Uuid, material: Uuid) -> Decimal {
        let (status, body) = self
            .call(
                Method::GET,
                &format!("/api/v1/tenants/{tenant}/materials/{material}"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "get material: {body}");
        dec_field(&body["data"]["stock_quantity"])
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimals serialize as strings; numbers are accepted too.
pub fn dec_field(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected a decimal, got {other}"),
    }
}

pub fn uuid_field(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("expected a uuid, got {value}"))
}
