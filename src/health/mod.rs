/*!
 * # Health Check Module
 *
 * - Liveness (`/health`): the process is up and serving
 * - Readiness (`/health/ready`): the database answers a ping
 * - Version (`/health/version`): build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, error};

use crate::AppState;

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Health check detail
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthDetail {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Readiness report
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub details: BTreeMap<String, HealthDetail>,
}

impl HealthInfo {
    fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Returns build and version information
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
        "built": option_env!("BUILD_TIME").unwrap_or("unknown"),
    }))
}

/// Liveness: answers as long as the server loop runs
pub async fn health_check() -> impl IntoResponse {
    debug!("Health check endpoint called");
    (
        StatusCode::OK,
        Json(json!({
            "status": HealthStatus::Up,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

/// Readiness: 503 until the database is reachable
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();
    let database = match crate::db::check_connection(&state.db).await {
        Ok(()) => HealthDetail {
            status: HealthStatus::Up,
            message: None,
            timestamp: now,
        },
        Err(e) => {
            error!("Database health check failed: {}", e);
            HealthDetail {
                status: HealthStatus::Down,
                message: Some("database unreachable".to_string()),
                timestamp: now,
            }
        }
    };

    let mut details = BTreeMap::new();
    details.insert("database".to_string(), database);
    let status = if details.values().any(|d| d.status == HealthStatus::Down) {
        HealthStatus::Down
    } else {
        HealthStatus::Up
    };

    let info = HealthInfo {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: now,
        details,
    };
    (info.status_code(), Json(info))
}

/// Router mounted at `/health`
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/version", get(version_info))
}
