use crate::{errors::ServiceError, ApiResponse, AppState, PaginatedResponse};
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::IntoParams;
use uuid::Uuid;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// JSON request body whose rejections answer with the standard error body
#[derive(Debug, Clone)]
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped by `api_max_page_size`
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Page and page size with configured defaults and bounds applied
    pub fn resolve(&self, state: &AppState) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(state.config.api_default_page_size)
            .clamp(1, state.config.api_max_page_size);
        (page, per_page)
    }
}

/// Wraps one page of a listing in the standard envelope
pub fn paginated_response<T: Serialize>(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Response {
    success_response(PaginatedResponse::new(items, total, page, per_page))
}

/// Tenant named by the `tenant_id` path segment, checked to exist.
///
/// Every tenant-scoped handler takes this extractor, so an unknown tenant
/// answers 404 before any service runs.
#[derive(Debug, Clone, Copy)]
pub struct TenantScope {
    pub tenant_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for TenantScope {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ServiceError::BadRequest(e.body_text()))?;
        let raw = params
            .get("tenant_id")
            .ok_or_else(|| ServiceError::InternalError("route has no tenant_id segment".into()))?;
        let tenant_id = Uuid::parse_str(raw)
            .map_err(|_| ServiceError::BadRequest(format!("Invalid tenant id: {}", raw)))?;

        if !state.services.tenants.exists(tenant_id).await? {
            return Err(ServiceError::NotFound(format!("Tenant {} not found", tenant_id)));
        }
        Ok(Self { tenant_id })
    }
}

/// `{id}` segment of a tenant-scoped route
#[derive(Debug, Deserialize)]
pub struct IdPath {
    pub id: Uuid,
}

/// `{id}/components/{component_id}` segments
#[derive(Debug, Deserialize)]
pub struct ComponentPath {
    pub id: Uuid,
    pub component_id: Uuid,
}

/// `{product_id}` segment of the BOM routes
#[derive(Debug, Deserialize)]
pub struct ProductPath {
    pub product_id: Uuid,
}
