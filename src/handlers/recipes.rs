use super::common::{
    created_response, no_content_response, paginated_response, success_response, AppJson,
    ComponentPath, IdPath, PaginationParams, TenantScope,
};
use crate::{
    errors::ServiceError,
    services::recipes::{
        ComponentSpec, CreateRecipeInput, RecipeCostReport, RecipeDetail, RecipeFilter,
        UpdateComponentInput, UpdateRecipeInput,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

/// Routes under `/tenants/:tenant_id/recipes`
pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/:id", get(get_recipe).put(update_recipe).delete(delete_recipe))
        .route("/:id/activate", post(activate_recipe))
        .route("/:id/cost", get(recipe_cost))
        .route("/:id/components", post(add_component))
        .route(
            "/:id/components/:component_id",
            put(update_component).delete(remove_component),
        )
}

/// Create a recipe, optionally with its components
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/recipes",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = CreateRecipeInput,
    responses(
        (status = 201, description = "Recipe created", body = RecipeDetail),
        (status = 404, description = "Product or material not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Material listed twice", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Recipes"
)]
pub async fn create_recipe(
    State(state): State<AppState>,
    scope: TenantScope,
    AppJson(payload): AppJson<CreateRecipeInput>,
) -> Result<Response, ServiceError> {
    let recipe = state.services.recipes.create(scope.tenant_id, payload).await?;
    Ok(created_response(recipe))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/recipes",
    params(("tenant_id" = Uuid, Path, description = "Tenant id"), RecipeFilter, PaginationParams),
    responses((status = 200, description = "Live recipes")),
    tag = "Recipes"
)]
pub async fn list_recipes(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(filter): Query<RecipeFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let (page, per_page) = pagination.resolve(&state);
    let (items, total) = state
        .services
        .recipes
        .list(scope.tenant_id, filter, page, per_page)
        .await?;
    Ok(paginated_response(items, total, page, per_page))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/recipes/{id}",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Recipe id")
    ),
    responses(
        (status = 200, description = "Recipe with its components", body = RecipeDetail),
        (status = 404, description = "Not found in this tenant", body = crate::errors::ErrorResponse)
    ),
    tag = "Recipes"
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
) -> Result<Response, ServiceError> {
    let recipe = state.services.recipes.get(scope.tenant_id, path.id).await?;
    Ok(success_response(recipe))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
    AppJson(payload): AppJson<UpdateRecipeInput>,
) -> Result<Response, ServiceError> {
    let recipe = state
        .services
        .recipes
        .update(scope.tenant_id, path.id, payload)
        .await?;
    Ok(success_response(recipe))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
) -> Result<Response, ServiceError> {
    state.services.recipes.delete(scope.tenant_id, path.id).await?;
    Ok(no_content_response())
}

/// Make this recipe the only active recipe of its product
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/recipes/{id}/activate",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Recipe id")
    ),
    responses(
        (status = 200, description = "Recipe activated", body = crate::entities::recipe::Model),
        (status = 404, description = "Not found in this tenant", body = crate::errors::ErrorResponse)
    ),
    tag = "Recipes"
)]
pub async fn activate_recipe(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
) -> Result<Response, ServiceError> {
    let recipe = state.services.recipes.activate(scope.tenant_id, path.id).await?;
    Ok(success_response(recipe))
}

pub async fn add_component(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
    AppJson(payload): AppJson<ComponentSpec>,
) -> Result<Response, ServiceError> {
    let component = state
        .services
        .recipes
        .add_component(scope.tenant_id, path.id, payload)
        .await?;
    Ok(created_response(component))
}

pub async fn update_component(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<ComponentPath>,
    AppJson(payload): AppJson<UpdateComponentInput>,
) -> Result<Response, ServiceError> {
    let component = state
        .services
        .recipes
        .update_component(scope.tenant_id, path.id, path.component_id, payload)
        .await?;
    Ok(success_response(component))
}

pub async fn remove_component(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<ComponentPath>,
) -> Result<Response, ServiceError> {
    state
        .services
        .recipes
        .remove_component(scope.tenant_id, path.id, path.component_id)
        .await?;
    Ok(no_content_response())
}

/// Material cost of one batch and of one yielded unit
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/recipes/{id}/cost",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Recipe id")
    ),
    responses(
        (status = 200, description = "Cost breakdown", body = RecipeCostReport),
        (status = 404, description = "Not found in this tenant", body = crate::errors::ErrorResponse)
    ),
    tag = "Recipes"
)]
pub async fn recipe_cost(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(path): Path<IdPath>,
) -> Result<Response, ServiceError> {
    let report = state.services.recipes.cost(scope.tenant_id, path.id).await?;
    Ok(success_response(report))
}
