mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{dec_field, uuid_field, TestApp};

async fn draft_recipe(app: &TestApp, tenant: Uuid, product: Uuid, name: &str, components: serde_json::Value) -> Uuid {
    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/tenants/{tenant}/recipes"),
            Some(json!({
                "product_id": product,
                "name": name,
                "yield_quantity": "4",
                "yield_unit": "loaf",
                "components": components,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["recipe"]["is_active"], false);
    uuid_field(&body["data"]["recipe"]["id"])
}

#[tokio::test]
async fn components_keep_order_and_default_unit() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("bread").await;
    let product = app.create_product(tenant, "Sourdough", "SRD").await;
    let flour = app.material(tenant, "Flour", "10000", "1000", "0.001").await;
    let water = app.material(tenant, "Water", "50000", "0", "0").await;

    let recipe = draft_recipe(
        &app,
        tenant,
        product,
        "Country loaf",
        json!([
            { "material_id": flour, "quantity_required": "1000", "waste_percentage": "2" },
            { "material_id": water, "quantity_required": "750", "unit": "g" }
        ]),
    )
    .await;

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/tenants/{tenant}/recipes/{recipe}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let components = body["data"]["components"].as_array().expect("components");
    assert_eq!(components.len(), 2);
    assert_eq!(components[0]["material_name"], "Flour");
    assert_eq!(components[0]["unit"], "ml");
    assert_eq!(dec_field(&components[0]["effective_need"]), dec!(1020));
    assert_eq!(components[1]["unit"], "g");
}

#[tokio::test]
async fn a_product_has_at_most_one_active_recipe() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("rye").await;
    let product = app.create_product(tenant, "Rye", "RYE").await;
    let flour = app.material(tenant, "Rye flour", "5000", "0", "0.002").await;
    let components = json!([{ "material_id": flour, "quantity_required": "500" }]);

    let first = draft_recipe(&app, tenant, product, "Light rye", components.clone()).await;
    let second = draft_recipe(&app, tenant, product, "Dark rye", components).await;
    let base = format!("/api/v1/tenants/{tenant}/recipes");

    let (status, _) = app
        .call(Method::POST, &format!("{base}/{first}/activate"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .call(Method::POST, &format!("{base}/{second}/activate"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], true);

    let (_, active) = app
        .call(
            Method::GET,
            &format!("{base}?product_id={product}&is_active=true"),
            None,
        )
        .await;
    assert_eq!(active["data"]["total"], 1);
    assert_eq!(uuid_field(&active["data"]["items"][0]["id"]), second);

    // Deleting the active recipe leaves the product without one
    let response = app
        .request(Method::DELETE, &format!("{base}/{second}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/tenants/{tenant}/bom/products/{product}/availability"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn component_lifecycle() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("buns").await;
    let product = app.create_product(tenant, "Bun", "BUN").await;
    let flour = app.material(tenant, "Bun flour", "1000", "0", "0.001").await;
    let sugar = app.material(tenant, "Bun sugar", "1000", "0", "0.003").await;
    let recipe = draft_recipe(
        &app,
        tenant,
        product,
        "Sweet bun",
        json!([{ "material_id": flour, "quantity_required": "100" }]),
    )
    .await;
    let base = format!("/api/v1/tenants/{tenant}/recipes/{recipe}/components");

    let (status, added) = app
        .call(
            Method::POST,
            &base,
            Some(json!({ "material_id": sugar, "quantity_required": "20" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{added}");
    assert_eq!(added["data"]["sort_order"], 1);
    let component = uuid_field(&added["data"]["id"]);

    let (status, _) = app
        .call(
            Method::POST,
            &base,
            Some(json!({ "material_id": sugar, "quantity_required": "5" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("{base}/{component}"),
            Some(json!({ "waste_percentage": "150" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{updated}");

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("{base}/{component}"),
            Some(json!({ "quantity_required": "25", "waste_percentage": "4" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec_field(&updated["data"]["quantity_required"]), dec!(25));

    let response = app
        .request(Method::DELETE, &format!("{base}/{component}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (_, detail) = app
        .call(
            Method::GET,
            &format!("/api/v1/tenants/{tenant}/recipes/{recipe}"),
            None,
        )
        .await;
    assert_eq!(detail["data"]["components"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn duplicate_materials_and_bad_quantities_are_rejected() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("rolls").await;
    let product = app.create_product(tenant, "Roll", "ROLL").await;
    let flour = app.material(tenant, "Roll flour", "1000", "0", "0.001").await;
    let uri = format!("/api/v1/tenants/{tenant}/recipes");

    let (status, _) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({
                "product_id": product,
                "name": "Twice",
                "yield_quantity": "1",
                "yield_unit": "roll",
                "components": [
                    { "material_id": flour, "quantity_required": "1" },
                    { "material_id": flour, "quantity_required": "2" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({
                "product_id": product,
                "name": "Nothing",
                "yield_quantity": "0",
                "yield_unit": "roll"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({
                "product_id": product,
                "name": "Negative",
                "yield_quantity": "1",
                "yield_unit": "roll",
                "components": [{ "material_id": flour, "quantity_required": "-1" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
