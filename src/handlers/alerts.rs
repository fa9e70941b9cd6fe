use super::common::{paginated_response, success_response, IdPath, PaginationParams, TenantScope};
use crate::{
    errors::ServiceError,
    services::stock_alerts::{AlertActionInput, AlertFilter, AlertScanResult, AlertSummary},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Routes under `/tenants/:tenant_id/bom/alerts`
pub fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_alerts))
        .route("/summary", get(alert_summary))
        .route("/check", post(check_alerts))
        .route("/:id", get(get_alert))
        .route("/:id/acknowledge", post(acknowledge_alert))
        .route("/:id/resolve", post(resolve_alert))
        .route("/:id/dismiss", post(dismiss_alert))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AlertCheckRequest {
    pub performed_by: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/bom/alerts",
    params(("tenant_id" = Uuid, Path, description = "Tenant id"), AlertFilter, PaginationParams),
    responses((status = 200, description = "Alerts, newest first")),
    tag = "Alerts"
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(filter): Query<AlertFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let (page, per_page) = pagination.resolve(&state);
    let (items, total) = state
        .services
        .alerts
        .list(scope.tenant_id, filter, page, per_page)
        .await?;
    Ok(paginated_response(items, total, page, per_page))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/bom/alerts/summary",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    responses((status = 200, description = "Alert counts by status", body = AlertSummary)),
    tag = "Alerts"
)]
pub async fn alert_summary(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Response, ServiceError> {
    let summary = state.services.alerts.summary(scope.tenant_id).await?;
    Ok(success_response(summary))
}

/// Evaluate every material of the tenant against its reorder level
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/bom/alerts/check",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body(content = AlertCheckRequest, description = "Optional actor"),
    responses((status = 200, description = "Alerts raised and resolved by the scan", body = AlertScanResult)),
    tag = "Alerts"
)]
pub async fn check_alerts(
    State(state): State<AppState>,
    scope: TenantScope,
    body: Option<Json<AlertCheckRequest>>,
) -> Result<Response, ServiceError> {
    let actor = body.and_then(|Json(b)| b.performed_by);
    let result = state.services.alerts.scan(scope.tenant_id, actor).await?;
    Ok(success_response(result))
}

pub async fn get_alert(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
) -> Result<Response, ServiceError> {
    let alert = state.services.alerts.get(scope.tenant_id, path.id).await?;
    Ok(success_response(alert))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/bom/alerts/{id}/acknowledge",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Alert id")
    ),
    request_body = AlertActionInput,
    responses(
        (status = 200, description = "Alert acknowledged", body = crate::entities::stock_alert::Model),
        (status = 422, description = "Alert is not pending", body = crate::errors::ErrorResponse)
    ),
    tag = "Alerts"
)]
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
    body: Option<Json<AlertActionInput>>,
) -> Result<Response, ServiceError> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let alert = state
        .services
        .alerts
        .acknowledge(scope.tenant_id, path.id, input)
        .await?;
    Ok(success_response(alert))
}

pub async fn resolve_alert(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
    body: Option<Json<AlertActionInput>>,
) -> Result<Response, ServiceError> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let alert = state
        .services
        .alerts
        .resolve(scope.tenant_id, path.id, input)
        .await?;
    Ok(success_response(alert))
}

pub async fn dismiss_alert(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
    body: Option<Json<AlertActionInput>>,
) -> Result<Response, ServiceError> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let alert = state
        .services
        .alerts
        .dismiss(scope.tenant_id, path.id, input)
        .await?;
    Ok(success_response(alert))
}
