use super::common::{
    created_response, paginated_response, success_response, AppJson, IdPath, PaginationParams,
    TenantScope,
};
use crate::{errors::ServiceError, services::products::CreateProductInput, AppState};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use uuid::Uuid;

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/products",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = crate::entities::product::Model),
        (status = 409, description = "SKU already used in this tenant", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    scope: TenantScope,
    AppJson(payload): AppJson<CreateProductInput>,
) -> Result<Response, ServiceError> {
    let product = state.services.products.create(scope.tenant_id, payload).await?;
    Ok(created_response(product))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/products",
    params(("tenant_id" = Uuid, Path, description = "Tenant id"), PaginationParams),
    responses((status = 200, description = "Products, ordered by name")),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let (page, per_page) = pagination.resolve(&state);
    let (items, total) = state
        .services
        .products
        .list(scope.tenant_id, page, per_page)
        .await?;
    Ok(paginated_response(items, total, page, per_page))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/products/{id}",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product", body = crate::entities::product::Model),
        (status = 404, description = "Not found in this tenant", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
) -> Result<Response, ServiceError> {
    let product = state.services.products.get(scope.tenant_id, path.id).await?;
    Ok(success_response(product))
}
