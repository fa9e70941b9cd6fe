use super::common::{created_response, success_response, AppJson, TenantScope};
use crate::{errors::ServiceError, services::tenants::CreateTenantInput, AppState};
use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

pub fn tenant_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tenant))
        .route("/:tenant_id", get(get_tenant))
}

/// Register a tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    request_body = CreateTenantInput,
    responses(
        (status = 201, description = "Tenant created", body = crate::entities::tenant::Model),
        (status = 409, description = "Slug already taken", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Tenants"
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTenantInput>,
) -> Result<Response, ServiceError> {
    let tenant = state.services.tenants.create(payload).await?;
    info!(tenant_id = %tenant.id, "Tenant registered");
    Ok(created_response(tenant))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Tenant", body = crate::entities::tenant::Model),
        (status = 404, description = "Unknown tenant", body = crate::errors::ErrorResponse)
    ),
    tag = "Tenants"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Response, ServiceError> {
    let tenant = state.services.tenants.get(scope.tenant_id).await?;
    Ok(success_response(tenant))
}
