mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;

#[tokio::test]
async fn rows_of_another_tenant_read_as_not_found() {
    let app = TestApp::new().await;
    let north = app.create_tenant("north").await;
    let south = app.create_tenant("south").await;
    let material = app.material(north, "Copper", "10", "1", "8").await;

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/tenants/{south}/materials/{material}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .adjust(
            south,
            material,
            json!({ "transaction_type": "deduction", "quantity": "1" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.stock_of(north, material).await, dec!(10));

    let (_, ledger) = app
        .call(
            Method::GET,
            &format!("/api/v1/tenants/{south}/inventory-transactions"),
            None,
        )
        .await;
    assert_eq!(ledger["data"]["total"], 0);
}

#[tokio::test]
async fn recipes_cannot_reference_foreign_materials() {
    let app = TestApp::new().await;
    let north = app.create_tenant("north-r").await;
    let south = app.create_tenant("south-r").await;
    let foreign = app.material(north, "Tin", "10", "1", "3").await;
    let product = app.create_product(south, "Bronze bar", "BRZ").await;

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/v1/tenants/{south}/recipes"),
            Some(json!({
                "product_id": product,
                "name": "Bronze",
                "yield_quantity": "1",
                "yield_unit": "bar",
                "is_active": true,
                "components": [{ "material_id": foreign, "quantity_required": "2" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, recipes) = app
        .call(
            Method::GET,
            &format!("/api/v1/tenants/{south}/recipes"),
            None,
        )
        .await;
    assert_eq!(recipes["data"]["total"], 0);
}

#[tokio::test]
async fn unknown_or_malformed_tenant_is_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/tenants/{}/materials", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(Method::GET, "/api/v1/tenants/not-a-uuid/materials", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn same_sku_is_allowed_in_different_tenants() {
    let app = TestApp::new().await;
    let north = app.create_tenant("north-s").await;
    let south = app.create_tenant("south-s").await;

    app.material(north, "Zinc", "1", "0", "1").await;
    app.material(south, "Zinc", "1", "0", "1").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/tenants",
            Some(json!({ "name": "Dup", "slug": "north-s" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
