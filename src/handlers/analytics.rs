use super::common::TenantScope;
use crate::{
    errors::ServiceError,
    services::analytics::{
        CategoryRollup, MaterialDashboard, ProductEfficiency, StockStatusReport, TurnoverQuery,
        TurnoverReport, UsageTrendQuery, UsageTrends,
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use uuid::Uuid;

/// Routes under `/tenants/:tenant_id/analytics`
pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/stock-status", get(stock_status))
        .route("/categories", get(categories))
        .route("/usage-trends", get(usage_trends))
        .route("/turnover", get(turnover))
        .route("/production-efficiency", get(production_efficiency))
        .route("/dashboard", get(dashboard))
}

/// Materials bucketed into critical, low, normal and excess stock
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/analytics/stock-status",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Stock status per material", body = ApiResponse<StockStatusReport>)
    ),
    tag = "Analytics"
)]
pub async fn stock_status(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Json<ApiResponse<StockStatusReport>>, ServiceError> {
    let report = state.services.analytics.stock_status(scope.tenant_id).await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/analytics/categories",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Count, quantity and value per category", body = ApiResponse<Vec<CategoryRollup>>)
    ),
    tag = "Analytics"
)]
pub async fn categories(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Json<ApiResponse<Vec<CategoryRollup>>>, ServiceError> {
    let rollup = state.services.analytics.categories(scope.tenant_id).await?;
    Ok(Json(ApiResponse::success(rollup)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/analytics/usage-trends",
    params(("tenant_id" = Uuid, Path, description = "Tenant id"), UsageTrendQuery),
    responses(
        (status = 200, description = "Consumption and replenishment per period", body = ApiResponse<UsageTrends>),
        (status = 422, description = "Invalid window", body = crate::errors::ErrorResponse)
    ),
    tag = "Analytics"
)]
pub async fn usage_trends(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(query): Query<UsageTrendQuery>,
) -> Result<Json<ApiResponse<UsageTrends>>, ServiceError> {
    let trends = state
        .services
        .analytics
        .usage_trends(scope.tenant_id, query)
        .await?;
    Ok(Json(ApiResponse::success(trends)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/analytics/turnover",
    params(("tenant_id" = Uuid, Path, description = "Tenant id"), TurnoverQuery),
    responses(
        (status = 200, description = "Turnover and days of supply per material", body = ApiResponse<TurnoverReport>),
        (status = 422, description = "Invalid window", body = crate::errors::ErrorResponse)
    ),
    tag = "Analytics"
)]
pub async fn turnover(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(query): Query<TurnoverQuery>,
) -> Result<Json<ApiResponse<TurnoverReport>>, ServiceError> {
    let report = state.services.analytics.turnover(scope.tenant_id, query).await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/analytics/production-efficiency",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Cost and capacity per product", body = ApiResponse<Vec<ProductEfficiency>>)
    ),
    tag = "Analytics"
)]
pub async fn production_efficiency(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Json<ApiResponse<Vec<ProductEfficiency>>>, ServiceError> {
    let report = state
        .services
        .analytics
        .production_efficiency(scope.tenant_id)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/analytics/dashboard",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Material dashboard", body = ApiResponse<MaterialDashboard>)
    ),
    tag = "Analytics"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Json<ApiResponse<MaterialDashboard>>, ServiceError> {
    let dashboard = state.services.analytics.dashboard(scope.tenant_id).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}
