mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{dec_field, TestApp};

struct Latte {
    tenant: Uuid,
    product: Uuid,
    milk: Uuid,
    espresso: Uuid,
}

/// Milk: 150 ml with 5% waste against 2000 ml on hand, espresso: 18 g against 500 g
async fn latte(app: &TestApp) -> Latte {
    let tenant = app.create_tenant("coffee-bar").await;
    let product = app.create_product(tenant, "Latte", "LATTE").await;
    let milk = app.material(tenant, "Milk", "2000", "200", "0.002").await;
    let espresso = app.material(tenant, "Espresso", "500", "50", "0.05").await;
    app.active_recipe(
        tenant,
        product,
        json!([
            { "material_id": milk, "quantity_required": "150", "waste_percentage": "5" },
            { "material_id": espresso, "quantity_required": "18" }
        ]),
    )
    .await;
    Latte {
        tenant,
        product,
        milk,
        espresso,
    }
}

#[tokio::test]
async fn availability_floors_and_names_the_bottleneck() {
    let app = TestApp::new().await;
    let latte = latte(&app).await;

    let (status, body) = app
        .call(
            Method::GET,
            &format!(
                "/api/v1/tenants/{}/bom/products/{}/availability",
                latte.tenant, latte.product
            ),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(dec_field(&data["available_quantity"]), dec!(12));
    assert_eq!(data["bottleneck"]["material_name"], "Milk");
    assert_eq!(dec_field(&data["bottleneck"]["effective_need"]), dec!(157.5));
    assert_eq!(data["components"].as_array().map(Vec::len), Some(2));
    assert_eq!(dec_field(&data["components"][1]["producible"]), dec!(27));
}

#[tokio::test]
async fn product_without_active_recipe_is_not_found() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("empty-shelf").await;
    let product = app.create_product(tenant, "Mocha", "MOCHA").await;

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
async fn production_deducts_every_component() {
    let app = TestApp::new().await;
    let latte = latte(&app).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!(
                "/api/v1/tenants/{}/bom/products/{}/produce",
                latte.tenant, latte.product
            ),
            Some(json!({ "quantity": "12", "notes": "morning rush" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let transactions = body["data"]["transactions"].as_array().expect("transactions");
    assert_eq!(transactions.len(), 2);
    for tx in transactions {
        assert_eq!(tx["transaction_type"], "deduction");
        assert_eq!(tx["reason"], "production");
        assert_eq!(tx["reference_type"], "recipe");
    }

    assert_eq!(app.stock_of(latte.tenant, latte.milk).await, dec!(110));
    assert_eq!(app.stock_of(latte.tenant, latte.espresso).await, dec!(284));
    // Milk fell below its reorder level of 200
    let raised = body["data"]["raised_alerts"].as_array().expect("alerts");
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0]["alert_type"], "low_stock");
}

#[tokio::test]
async fn production_is_all_or_nothing() {
    let app = TestApp::new().await;
    let latte = latte(&app).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!(
                "/api/v1/tenants/{}/bom/products/{}/produce",
                latte.tenant, latte.product
            ),
            Some(json!({ "quantity": "13" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let shortages = body["details"]["shortages"].as_array().expect("shortages");
    assert_eq!(shortages.len(), 1);
    assert_eq!(shortages[0]["material_name"], "Milk");
    assert_eq!(dec_field(&shortages[0]["shortage"]), dec!(47.5));

    // Espresso had enough but must not be touched either
    assert_eq!(app.stock_of(latte.tenant, latte.milk).await, dec!(2000));
    assert_eq!(app.stock_of(latte.tenant, latte.espresso).await, dec!(500));
    let (_, ledger) = app
        .call(
            Method::GET,
            &format!(
                "/api/v1/tenants/{}/inventory-transactions?reference_type=recipe",
                latte.tenant
            ),
            None,
        )
        .await;
    assert_eq!(ledger["data"]["total"], 0);
}

#[tokio::test]
async fn batch_plan_pools_shared_stock() {
    let app = TestApp::new().await;
    let latte = latte(&app).await;
    let cappuccino = app
        .create_product(latte.tenant, "Cappuccino", "CAPPU")
        .await;
    app.active_recipe(
        latte.tenant,
        cappuccino,
        json!([
            { "material_id": latte.milk, "quantity_required": "100" },
            { "material_id": latte.espresso, "quantity_required": "18" }
        ]),
    )
    .await;

    // 10 lattes need 1575 ml and 10 cappuccinos 1000 ml: 2575 against 2000
    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/tenants/{}/bom/batch-plan", latte.tenant),
            Some(json!({
                "items": [
                    { "product_id": latte.product, "quantity": "10" },
                    { "product_id": cappuccino, "quantity": "10" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let plan = &body["data"];
    assert_eq!(plan["feasible"], false);
    assert_eq!(plan["shortages"].as_array().map(Vec::len), Some(1));
    assert_eq!(dec_field(&plan["shortages"][0]["required"]), dec!(2575));
    assert_eq!(dec_field(&plan["shortages"][0]["shortage"]), dec!(575));
    let espresso = plan["materials"]
        .as_array()
        .expect("materials")
        .iter()
        .find(|m| m["material_name"] == "Espresso")
        .expect("espresso line");
    assert_eq!(dec_field(&espresso["required"]), dec!(360));
    assert_eq!(espresso["sufficient"], true);
}

#[tokio::test]
async fn bulk_availability_reports_failures_per_product() {
    let app = TestApp::new().await;
    let latte = latte(&app).await;
    let unknown = Uuid::new_v4();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/tenants/{}/bom/availability/bulk", latte.tenant),
            Some(json!({ "product_ids": [latte.product, unknown] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let items = body["data"].as_array().expect("items");
    assert_eq!(items.len(), 2);
    assert_eq!(dec_field(&items[0]["availability"]["available_quantity"]), dec!(12));
    assert!(items[1]["availability"].is_null());
    assert!(items[1]["error"].as_str().is_some());

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/v1/tenants/{}/bom/availability/bulk", latte.tenant),
            Some(json!({ "product_ids": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn optimal_batch_caps_at_what_stock_allows() {
    let app = TestApp::new().await;
    let latte = latte(&app).await;
    let uri = format!(
        "/api/v1/tenants/{}/bom/products/{}/optimal-batch",
        latte.tenant, latte.product
    );

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({ "min_quantity": "5", "max_quantity": "20", "target_quantity": "15" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(dec_field(&data["max_producible"]), dec!(12));
    assert_eq!(data["can_meet_minimum"], true);
    assert_eq!(dec_field(&data["recommended_batch_size"]), dec!(12));

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({ "min_quantity": "15", "max_quantity": "20" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["can_meet_minimum"], false);
    assert!(body["data"]["recommended_batch_size"].is_null());

    let (status, _) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({ "min_quantity": "20", "max_quantity": "5" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn recipe_cost_includes_waste() {
    let app = TestApp::new().await;
    let latte = latte(&app).await;

    let (_, recipes) = app
        .call(
            Method::GET,
            &format!(
                "/api/v1/tenants/{}/recipes?product_id={}",
                latte.tenant, latte.product
            ),
            None,
        )
        .await;
    let recipe_id = recipes["data"]["items"][0]["id"]
        .as_str()
        .expect("recipe id")
        .to_string();

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/tenants/{}/recipes/{recipe_id}/cost", latte.tenant),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    // 157.5 * 0.002 + 18 * 0.05
    assert_eq!(dec_field(&body["data"]["total_cost"]).round_dp(6), dec!(1.215));
    assert_eq!(dec_field(&body["data"]["total_waste_cost"]).round_dp(6), dec!(0.015));
    assert_eq!(dec_field(&body["data"]["cost_per_unit"]).round_dp(6), dec!(1.215));
}

#[tokio::test]
async fn oversized_quantities_are_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let latte = latte(&app).await;
    let produce = format!(
        "/api/v1/tenants/{}/bom/products/{}/produce",
        latte.tenant, latte.product
    );

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/tenants/{}/bom/batch-plan", latte.tenant),
            Some(json!({
                "items": [
                    { "product_id": latte.product, "quantity": "79228162514264337593543950335" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, body) = app
        .call(
            Method::POST,
            &produce,
            Some(json!({ "quantity": "79228162514264337593543950335" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    // Largest storable quantity still computes and reports a shortage
    let (status, body) = app
        .call(
            Method::POST,
            &produce,
            Some(json!({ "quantity": "99999999999.9999" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["details"]["shortages"].as_array().map(Vec::len), Some(2));

    assert_eq!(app.stock_of(latte.tenant, latte.milk).await, dec!(2000));
    assert_eq!(app.stock_of(latte.tenant, latte.espresso).await, dec!(500));
}

#[tokio::test]
async fn fractional_production_rounds_consumption_to_ledger_precision() {
    let app = TestApp::new().await;
    let latte = latte(&app).await;

    // 0.3333 lattes need 52.49475 ml of milk, recorded as 52.4948
    let (status, body) = app
        .call(
            Method::POST,
            &format!(
                "/api/v1/tenants/{}/bom/products/{}/produce",
                latte.tenant, latte.product
            ),
            Some(json!({ "quantity": "0.3333" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        app.stock_of(latte.tenant, latte.milk).await,
        dec!(1947.5052)
    );
    assert_eq!(
        app.stock_of(latte.tenant, latte.espresso).await,
        dec!(494.0006)
    );
}
