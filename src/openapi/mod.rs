use axum::{response::Json, routing::get, Router};
use utoipa::OpenApi;

use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockline API",
        version = "1.0.0",
        description = r#"
# Stockline inventory and bill-of-materials API

Tenant-scoped raw materials with an append-only stock ledger, recipes that map
a product to the materials it consumes, and the calculations built on them.

## Features

- **Materials**: stock levels, soft delete and restore, stock adjustments
- **Ledger**: every stock change recorded with before / change / after
- **Recipes**: components with waste percentages, one active recipe per product
- **BOM**: producible quantity and bottleneck, pooled batch planning, batch sizing, costing, production runs
- **Alerts**: low / out-of-stock alerts with an acknowledge / resolve / dismiss lifecycle
- **Analytics**: stock status, category rollup, usage trends, turnover, production efficiency

## Tenancy

Every resource lives under `/api/v1/tenants/{tenant_id}`. Rows of another
tenant are reported as not found.

## Error Handling

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient stock: Flour has 2 kg on hand, cannot apply -5",
  "details": { "material_id": "...", "available": "2", "requested_change": "-5" },
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20, capped by configuration).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Tenants", description = "Tenant registry"),
        (name = "Products", description = "Products that recipes produce"),
        (name = "Materials", description = "Materials and the stock ledger"),
        (name = "Recipes", description = "Recipes and their components"),
        (name = "BOM", description = "Availability, batch planning and production"),
        (name = "Alerts", description = "Stock alerts"),
        (name = "Analytics", description = "Inventory reports")
    ),
    paths(
        // Tenants and products
        crate::handlers::tenants::create_tenant,
        crate::handlers::tenants::get_tenant,
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,

        // Materials
        crate::handlers::materials::create_material,
        crate::handlers::materials::list_materials,
        crate::handlers::materials::get_material,
        crate::handlers::materials::adjust_stock,
        crate::handlers::materials::material_transactions,
        crate::handlers::materials::list_transactions,

        // Recipes
        crate::handlers::recipes::create_recipe,
        crate::handlers::recipes::list_recipes,
        crate::handlers::recipes::get_recipe,
        crate::handlers::recipes::activate_recipe,
        crate::handlers::recipes::recipe_cost,

        // BOM
        crate::handlers::bom::product_availability,
        crate::handlers::bom::bulk_availability,
        crate::handlers::bom::batch_plan,
        crate::handlers::bom::optimal_batch,
        crate::handlers::bom::produce,

        // Alerts
        crate::handlers::alerts::list_alerts,
        crate::handlers::alerts::alert_summary,
        crate::handlers::alerts::check_alerts,
        crate::handlers::alerts::acknowledge_alert,

        // Analytics
        crate::handlers::analytics::stock_status,
        crate::handlers::analytics::categories,
        crate::handlers::analytics::usage_trends,
        crate::handlers::analytics::turnover,
        crate::handlers::analytics::production_efficiency,
        crate::handlers::analytics::dashboard,
    ),
    components(
        schemas(
            crate::services::recipes::UpdateRecipeInput,
            crate::services::recipes::UpdateComponentInput,
            crate::services::recipes::ComponentSpec,
            crate::services::materials::UpdateMaterialInput,
            crate::services::stock_alerts::AlertActionInput,
            crate::entities::recipe_material::Model,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes() -> Router<AppState> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_tenant_scoped_paths() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Stockline API"));
        assert!(json.contains("/api/v1/tenants/{tenant_id}/bom/products/{product_id}/availability"));
        assert!(json.contains("/api/v1/tenants/{tenant_id}/materials/{id}/adjust-stock"));
    }
}
