//! Stockline API Library
//!
//! Multi-tenant inventory and bill-of-materials service: materials with an
//! append-only stock ledger, recipes, BOM calculations, stock alerts and
//! analytics, served over a JSON REST API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod telemetry;

use axum::{response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), &config);
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::telemetry::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes nested under `/api/v1/tenants/:tenant_id`
fn tenant_scoped_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", handlers::products::product_routes())
        .nest("/materials", handlers::materials::material_routes())
        .nest(
            "/inventory-transactions",
            handlers::materials::ledger_routes(),
        )
        .nest("/recipes", handlers::recipes::recipe_routes())
        .nest("/bom", handlers::bom::bom_routes())
        .nest("/analytics", handlers::analytics::analytics_routes())
}

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status endpoint
        .route("/status", get(api_status))
        // Tenant registry
        .nest("/tenants", handlers::tenants::tenant_routes())
        // Everything else is tenant scoped
        .nest("/tenants/:tenant_id", tenant_scoped_routes())
}

/// Full application router without the outer middleware stack
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .nest("/health", health::health_routes())
        .merge(openapi::openapi_routes())
        .with_state(state)
}

async fn api_status() -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "service": "stockline-api",
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}
