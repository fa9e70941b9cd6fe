pub mod alerts;
pub mod analytics;
pub mod bom;
pub mod common;
pub mod materials;
pub mod products;
pub mod recipes;
pub mod tenants;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        analytics::AnalyticsService, bom::BomService,
        inventory_adjustment_service::InventoryAdjustmentService, materials::MaterialService,
        products::ProductService, recipes::RecipeService, stock_alerts::StockAlertService,
        tenants::TenantService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub tenants: Arc<TenantService>,
    pub products: Arc<ProductService>,
    pub materials: Arc<MaterialService>,
    pub inventory_adjustments: Arc<InventoryAdjustmentService>,
    pub recipes: Arc<RecipeService>,
    pub bom: Arc<BomService>,
    pub alerts: Arc<StockAlertService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        let thresholds = config.stock_thresholds();
        Self {
            tenants: Arc::new(TenantService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            materials: Arc::new(MaterialService::new(
                db_pool.clone(),
                event_sender.clone(),
                thresholds,
            )),
            inventory_adjustments: Arc::new(InventoryAdjustmentService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            recipes: Arc::new(RecipeService::new(db_pool.clone(), event_sender.clone())),
            bom: Arc::new(BomService::new(db_pool.clone(), event_sender.clone())),
            alerts: Arc::new(StockAlertService::new(db_pool.clone(), event_sender)),
            analytics: Arc::new(AnalyticsService::new(
                db_pool,
                thresholds,
                config.usage_trend_default_days,
            )),
        }
    }
}
