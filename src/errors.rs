use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::telemetry::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "Not found: Material 550e8400-e29b-41d4-a716-446655440000 not found",
    "details": null,
    "request_id": "req-abc123xyz",
    "timestamp": "2026-01-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Unprocessable Entity")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Structured details, e.g. the shortages that blocked a production run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Request identifier echoed from `x-request-id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error was produced
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Insufficient stock: {message}")]
    InsufficientStock {
        message: String,
        #[serde(skip)]
        details: Option<serde_json::Value>,
    },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON that does not fit the request type
            JsonRejection::JsonDataError(err) => ServiceError::ValidationError(err.body_text()),
            other => ServiceError::BadRequest(other.body_text()),
        }
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    ///
    /// Unique-constraint violations are surfaced as [`ServiceError::Conflict`]
    /// so duplicate tenant-scoped SKUs answer 409 instead of 500.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        let err = error.into_db_err();
        if is_unique_violation(&err) {
            return ServiceError::Conflict("A record with the same unique key already exists".into());
        }
        ServiceError::DatabaseError(err)
    }

    pub fn insufficient_stock(message: impl Into<String>) -> Self {
        ServiceError::InsufficientStock {
            message: message.into(),
            details: None,
        }
    }

    pub fn insufficient_stock_with(message: impl Into<String>, details: serde_json::Value) -> Self {
        ServiceError::InsufficientStock {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidOperation(_)
            | Self::InvalidStatus(_)
            | Self::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InternalError(_)
            | Self::MigrationError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::MigrationError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InsufficientStock { details, .. } => details.clone(),
            _ => None,
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    let lower = err.to_string().to_ascii_lowercase();
    lower.contains("unique constraint") || lower.contains("duplicate key")
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = self.response_message();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: error_message,
            details: self.details(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response = crate::telemetry::scope_request_id(
            crate::telemetry::RequestId::new("req-123"),
            async { ServiceError::NotFound("missing".into()).into_response() },
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.error, "Not Found");
    }

    #[tokio::test]
    async fn insufficient_stock_response_carries_details() {
        let err = ServiceError::insufficient_stock_with(
            "not enough flour",
            serde_json::json!([{ "material": "flour", "shortage": "2.5" }]),
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        let details = payload.details.expect("details expected");
        assert_eq!(details[0]["material"], "flour");
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::InvalidStatus("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::insufficient_stock("x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InternalError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn service_error_response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::InternalError("pool exhausted".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::db_error("connection reset").response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::NotFound("Recipe not found".into()).response_message(),
            "Not found: Recipe not found"
        );
    }

    #[test]
    fn unique_violations_become_conflicts() {
        let err = ServiceError::db_error("UNIQUE constraint failed: materials.tenant_id, materials.sku");
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
