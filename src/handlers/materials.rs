use super::common::{
    created_response, no_content_response, paginated_response, success_response, AppJson,
    IdPath, PaginationParams, TenantScope,
};
use crate::{
    errors::ServiceError,
    services::{
        inventory_adjustment_service::{AdjustStockInput, LedgerFilter, StockAdjustmentResult},
        materials::{CreateMaterialInput, MaterialFilter, MaterialView, UpdateMaterialInput},
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Routes under `/tenants/:tenant_id/materials`
pub fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_materials).post(create_material))
        .route(
            "/:id",
            get(get_material).put(update_material).delete(delete_material),
        )
        .route("/:id/restore", post(restore_material))
        .route("/:id/adjust-stock", post(adjust_stock))
        .route("/:id/transactions", get(material_transactions))
}

/// Routes under `/tenants/:tenant_id/inventory-transactions`
pub fn ledger_routes() -> Router<AppState> {
    Router::new().route("/", get(list_transactions))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/materials",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = CreateMaterialInput,
    responses(
        (status = 201, description = "Material created", body = MaterialView),
        (status = 409, description = "SKU already used in this tenant", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Materials"
)]
pub async fn create_material(
    State(state): State<AppState>,
    scope: TenantScope,
    AppJson(payload): AppJson<CreateMaterialInput>,
) -> Result<Response, ServiceError> {
    let material = state.services.materials.create(scope.tenant_id, payload).await?;
    Ok(created_response(material))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/materials",
    params(("tenant_id" = Uuid, Path, description = "Tenant id"), MaterialFilter, PaginationParams),
    responses((status = 200, description = "Live materials ordered by name")),
    tag = "Materials"
)]
pub async fn list_materials(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(filter): Query<MaterialFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let (page, per_page) = pagination.resolve(&state);
    let (items, total) = state
        .services
        .materials
        .list(scope.tenant_id, filter, page, per_page)
        .await?;
    Ok(paginated_response(items, total, page, per_page))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/materials/{id}",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Material id")
    ),
    responses(
        (status = 200, description = "Material", body = MaterialView),
        (status = 404, description = "Not found in this tenant", body = crate::errors::ErrorResponse)
    ),
    tag = "Materials"
)]
pub async fn get_material(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
) -> Result<Response, ServiceError> {
    let material = state.services.materials.get(scope.tenant_id, path.id).await?;
    Ok(success_response(material))
}

pub async fn update_material(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
    AppJson(payload): AppJson<UpdateMaterialInput>,
) -> Result<Response, ServiceError> {
    let material = state
        .services
        .materials
        .update(scope.tenant_id, path.id, payload)
        .await?;
    Ok(success_response(material))
}

pub async fn delete_material(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
) -> Result<Response, ServiceError> {
    state.services.materials.delete(scope.tenant_id, path.id).await?;
    info!(tenant_id = %scope.tenant_id, material_id = %path.id, "Material soft-deleted");
    Ok(no_content_response())
}

pub async fn restore_material(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
) -> Result<Response, ServiceError> {
    let material = state.services.materials.restore(scope.tenant_id, path.id).await?;
    Ok(success_response(material))
}

/// Restock, deduct or correct the stock of a material
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/materials/{id}/adjust-stock",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Material id")
    ),
    request_body = AdjustStockInput,
    responses(
        (status = 200, description = "Stock changed and ledger row written", body = StockAdjustmentResult),
        (status = 404, description = "Not found in this tenant", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid quantity or insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "Materials"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
    AppJson(payload): AppJson<AdjustStockInput>,
) -> Result<Response, ServiceError> {
    let result = state
        .services
        .inventory_adjustments
        .adjust_stock(scope.tenant_id, path.id, payload)
        .await?;
    Ok(success_response(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/materials/{id}/transactions",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Material id"),
        PaginationParams
    ),
    responses((status = 200, description = "Ledger of the material, newest first")),
    tag = "Materials"
)]
pub async fn material_transactions(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let (page, per_page) = pagination.resolve(&state);
    let (items, total) = state
        .services
        .inventory_adjustments
        .material_transactions(scope.tenant_id, path.id, page, per_page)
        .await?;
    Ok(paginated_response(items, total, page, per_page))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/inventory-transactions",
    params(("tenant_id" = Uuid, Path, description = "Tenant id"), LedgerFilter, PaginationParams),
    responses((status = 200, description = "Tenant ledger, newest first")),
    tag = "Materials"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(filter): Query<LedgerFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let (page, per_page) = pagination.resolve(&state);
    let (items, total) = state
        .services
        .inventory_adjustments
        .list_transactions(scope.tenant_id, filter, page, per_page)
        .await?;
    Ok(paginated_response(items, total, page, per_page))
}
