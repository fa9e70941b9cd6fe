use super::common::{success_response, AppJson, ProductPath, TenantScope};
use crate::{
    errors::ServiceError,
    services::{
        bom::{
            BatchPlanInput, BulkAvailabilityInput, BulkAvailabilityItem, OptimalBatchInput,
            ProduceInput, ProductAvailability, ProductOptimalBatch, ProductionResult,
        },
        bom_calculator::BatchPlan,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

/// Routes under `/tenants/:tenant_id/bom`
pub fn bom_routes() -> Router<AppState> {
    Router::new()
        .route("/products/:product_id/availability", get(product_availability))
        .route("/products/:product_id/optimal-batch", post(optimal_batch))
        .route("/products/:product_id/produce", post(produce))
        .route("/availability/bulk", post(bulk_availability))
        .route("/batch-plan", post(batch_plan))
        .nest("/alerts", super::alerts::alert_routes())
}

/// How many units of a product the current stock allows
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/bom/products/{product_id}/availability",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("product_id" = Uuid, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Producible quantity and bottleneck", body = ProductAvailability),
        (status = 404, description = "Product or active recipe not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Recipe has no usable components", body = crate::errors::ErrorResponse)
    ),
    tag = "BOM"
)]
pub async fn product_availability(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<ProductPath>,
) -> Result<Response, ServiceError> {
    let availability = state
        .services
        .bom
        .availability(scope.tenant_id, path.product_id)
        .await?;
    Ok(success_response(availability))
}

/// Availability of several products, each computed against the full stock
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/bom/availability/bulk",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = BulkAvailabilityInput,
    responses(
        (status = 200, description = "One entry per requested product", body = Vec<BulkAvailabilityItem>),
        (status = 422, description = "Empty product list", body = crate::errors::ErrorResponse)
    ),
    tag = "BOM"
)]
pub async fn bulk_availability(
    State(state): State<AppState>,
    scope: TenantScope,
    AppJson(payload): AppJson<BulkAvailabilityInput>,
) -> Result<Response, ServiceError> {
    let items = state
        .services
        .bom
        .bulk_availability(scope.tenant_id, payload)
        .await?;
    Ok(success_response(items))
}

/// Material requirements of a mixed production batch against pooled stock
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/bom/batch-plan",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = BatchPlanInput,
    responses(
        (status = 200, description = "Requirements, shortages and cost", body = BatchPlan),
        (status = 404, description = "Product or active recipe not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid items", body = crate::errors::ErrorResponse)
    ),
    tag = "BOM"
)]
pub async fn batch_plan(
    State(state): State<AppState>,
    scope: TenantScope,
    AppJson(payload): AppJson<BatchPlanInput>,
) -> Result<Response, ServiceError> {
    let plan = state.services.bom.batch_plan(scope.tenant_id, payload).await?;
    Ok(success_response(plan))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/bom/products/{product_id}/optimal-batch",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("product_id" = Uuid, Path, description = "Product id")
    ),
    request_body = OptimalBatchInput,
    responses(
        (status = 200, description = "Recommended batch size", body = ProductOptimalBatch),
        (status = 422, description = "Invalid bounds", body = crate::errors::ErrorResponse)
    ),
    tag = "BOM"
)]
pub async fn optimal_batch(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<ProductPath>,
    AppJson(payload): AppJson<OptimalBatchInput>,
) -> Result<Response, ServiceError> {
    let batch = state
        .services
        .bom
        .optimal_batch(scope.tenant_id, path.product_id, payload)
        .await?;
    Ok(success_response(batch))
}

/// Deduct the materials for a production run
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/bom/products/{product_id}/produce",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("product_id" = Uuid, Path, description = "Product id")
    ),
    request_body = ProduceInput,
    responses(
        (status = 200, description = "Materials deducted", body = ProductionResult),
        (status = 404, description = "Product or active recipe not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock; shortages in details", body = crate::errors::ErrorResponse)
    ),
    tag = "BOM"
)]
pub async fn produce(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<ProductPath>,
    AppJson(payload): AppJson<ProduceInput>,
) -> Result<Response, ServiceError> {
    let result = state
        .services
        .bom
        .produce(scope.tenant_id, path.product_id, payload)
        .await?;
    Ok(success_response(result))
}
