use crate::{
    db::{self, DbPool},
    entities::{inventory_transaction::{self, TransactionType}, stock_alert},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        bom_calculator::{
            self, Availability, BatchBounds, BatchPlan, CalculationError, ComponentAvailability,
            OptimalBatch, PlanLine,
        },
        inventory_adjustment_service::{apply_stock_change, StockChange},
        materials::find_material,
        products::find_product,
        recipes::{find_active_recipe, load_component_inputs},
        validators::STORAGE_SCALE,
    },
};
use metrics::counter;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductAvailability {
    pub product_id: Uuid,
    pub product_name: String,
    pub recipe_id: Uuid,
    pub recipe_name: String,
    pub available_quantity: Decimal,
    pub bottleneck: ComponentAvailability,
    pub components: Vec<ComponentAvailability>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkAvailabilityInput {
    #[validate(length(min = 1, max = 200))]
    pub product_ids: Vec<Uuid>,
}

/// Per-product outcome of a bulk availability request
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkAvailabilityItem {
    pub product_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<ProductAvailability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BatchPlanItem {
    pub product_id: Uuid,
    #[validate(custom = "super::validators::positive_decimal")]
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BatchPlanInput {
    #[validate(length(min = 1, max = 200))]
    #[validate]
    pub items: Vec<BatchPlanItem>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct OptimalBatchInput {
    #[validate(custom = "super::validators::positive_decimal")]
    pub min_quantity: Decimal,
    #[validate(custom = "super::validators::positive_decimal")]
    pub max_quantity: Decimal,
    #[validate(custom = "super::validators::positive_decimal")]
    pub target_quantity: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductOptimalBatch {
    pub product_id: Uuid,
    pub recipe_id: Uuid,
    #[serde(flatten)]
    pub batch: OptimalBatch,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProduceInput {
    /// Number of units (recipe batches) to produce
    #[validate(custom = "super::validators::positive_decimal")]
    pub quantity: Decimal,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub performed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductionResult {
    pub product_id: Uuid,
    pub recipe_id: Uuid,
    pub quantity: Decimal,
    pub material_cost: Decimal,
    pub transactions: Vec<inventory_transaction::Model>,
    pub raised_alerts: Vec<stock_alert::Model>,
}

/// Recipe-driven stock calculations and production runs
#[derive(Clone)]
pub struct BomService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl BomService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Whole units of the product the current stock allows
    #[instrument(skip(self))]
    pub async fn availability(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductAvailability, ServiceError> {
        product_availability(self.db_pool.as_ref(), tenant_id, product_id).await
    }

    /// Availability of each product computed on its own, with no stock
    /// reserved between them. Failures are reported per product.
    #[instrument(skip(self, input), fields(count = input.product_ids.len()))]
    pub async fn bulk_availability(
        &self,
        tenant_id: Uuid,
        input: BulkAvailabilityInput,
    ) -> Result<Vec<BulkAvailabilityItem>, ServiceError> {
        input.validate()?;
        let db = self.db_pool.as_ref();
        let mut items = Vec::with_capacity(input.product_ids.len());
        for product_id in input.product_ids {
            let item = match product_availability(db, tenant_id, product_id).await {
                Ok(availability) => BulkAvailabilityItem {
                    product_id,
                    availability: Some(availability),
                    error: None,
                },
                Err(
                    err @ (ServiceError::NotFound(_)
                    | ServiceError::InvalidOperation(_)
                    | ServiceError::ValidationError(_)),
                ) => BulkAvailabilityItem {
                    product_id,
                    availability: None,
                    error: Some(err.to_string()),
                },
                Err(other) => return Err(other),
            };
            items.push(item);
        }
        Ok(items)
    }

    /// Pools stock across all requested products
    #[instrument(skip(self, input), fields(items = input.items.len()))]
    pub async fn batch_plan(
        &self,
        tenant_id: Uuid,
        input: BatchPlanInput,
    ) -> Result<BatchPlan, ServiceError> {
        input.validate()?;
        let db = self.db_pool.as_ref();
        let mut lines = Vec::with_capacity(input.items.len());
        for item in input.items {
            find_product(db, tenant_id, item.product_id).await?;
            let recipe = find_active_recipe(db, tenant_id, item.product_id).await?;
            lines.push(PlanLine {
                product_id: item.product_id,
                quantity: item.quantity,
                components: load_component_inputs(db, tenant_id, recipe.id).await?,
            });
        }
        let plan = bom_calculator::plan_batch(&lines)?;
        info!(%tenant_id, feasible = plan.feasible, shortages = plan.shortages.len(), "Batch plan computed");
        Ok(plan)
    }

    #[instrument(skip(self, input))]
    pub async fn optimal_batch(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        input: OptimalBatchInput,
    ) -> Result<ProductOptimalBatch, ServiceError> {
        input.validate()?;
        let db = self.db_pool.as_ref();
        find_product(db, tenant_id, product_id).await?;
        let recipe = find_active_recipe(db, tenant_id, product_id).await?;
        let components = load_component_inputs(db, tenant_id, recipe.id).await?;
        let batch = bom_calculator::optimal_batch(
            &components,
            BatchBounds {
                min_quantity: input.min_quantity,
                max_quantity: input.max_quantity,
                target_quantity: input.target_quantity,
            },
        )?;
        Ok(ProductOptimalBatch {
            product_id,
            recipe_id: recipe.id,
            batch,
        })
    }

    /// Deducts the materials for `quantity` units of the product.
    ///
    /// All or nothing: when any component is short, nothing is written and
    /// the shortages are returned in the error details.
    #[instrument(skip(self, input), fields(quantity = %input.quantity))]
    pub async fn produce(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        input: ProduceInput,
    ) -> Result<ProductionResult, ServiceError> {
        input.validate()?;
        let quantity = input.quantity;

        let outcome = db::transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                find_product(txn, tenant_id, product_id).await?;
                let recipe = find_active_recipe(txn, tenant_id, product_id).await?;
                let components = load_component_inputs(txn, tenant_id, recipe.id).await?;

                let shortages = bom_calculator::production_shortages(&components, quantity)?;
                if !shortages.is_empty() {
                    let names: Vec<&str> =
                        shortages.iter().map(|s| s.material_name.as_str()).collect();
                    return Err(ServiceError::insufficient_stock_with(
                        format!(
                            "Cannot produce {} units: short of {}",
                            quantity.normalize(),
                            names.join(", ")
                        ),
                        serde_json::json!({ "shortages": shortages }),
                    ));
                }

                let mut transactions = Vec::with_capacity(components.len());
                let mut raised = Vec::new();
                let mut events = Vec::new();
                let mut material_cost = Decimal::ZERO;
                for component in &components {
                    // Ledger columns keep four decimals; round consumption up to them
                    let consumed = component
                        .required_for(quantity)?
                        .round_dp_with_strategy(STORAGE_SCALE, RoundingStrategy::AwayFromZero);
                    material_cost = consumed
                        .checked_mul(component.unit_cost)
                        .and_then(|cost| material_cost.checked_add(cost))
                        .ok_or(CalculationError::Overflow)?;
                    let material = find_material(txn, tenant_id, component.material_id).await?;
                    let applied = apply_stock_change(
                        txn,
                        material,
                        StockChange {
                            transaction_type: TransactionType::Deduction,
                            change: -consumed,
                            reason: Some("production".to_string()),
                            notes: input.notes.clone(),
                            reference_type: Some("recipe".to_string()),
                            reference_id: Some(recipe.id),
                            actor: input.performed_by,
                        },
                    )
                    .await?;
                    events.extend(applied.events());
                    raised.extend(applied.alerts.raised);
                    transactions.push(applied.transaction);
                }

                events.push(Event::ProductionRecorded {
                    tenant_id,
                    product_id,
                    recipe_id: recipe.id,
                    quantity,
                    transaction_ids: transactions.iter().map(|t| t.id).collect(),
                });

                Ok((
                    ProductionResult {
                        product_id,
                        recipe_id: recipe.id,
                        quantity,
                        material_cost,
                        transactions,
                        raised_alerts: raised,
                    },
                    events,
                ))
            })
        })
        .await;

        let (result, events) = match outcome {
            Ok(done) => done,
            Err(err) => {
                if matches!(err, ServiceError::InsufficientStock { .. }) {
                    counter!("stockline_production.rejected", 1);
                    warn!(%tenant_id, %product_id, "Production rejected: {}", err);
                }
                return Err(err);
            }
        };

        counter!("stockline_production.runs", 1);
        info!(
            %tenant_id,
            %product_id,
            recipe_id = %result.recipe_id,
            quantity = %result.quantity,
            "Production recorded"
        );
        self.event_sender.publish_all(events).await;
        Ok(result)
    }
}

async fn product_availability<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    product_id: Uuid,
) -> Result<ProductAvailability, ServiceError> {
    let product = find_product(conn, tenant_id, product_id).await?;
    let recipe = find_active_recipe(conn, tenant_id, product_id).await?;
    let components = load_component_inputs(conn, tenant_id, recipe.id).await?;
    let Availability {
        available_quantity,
        bottleneck,
        components,
    } = bom_calculator::available_quantity(&components)?;

    Ok(ProductAvailability {
        product_id,
        product_name: product.name,
        recipe_id: recipe.id,
        recipe_name: recipe.name,
        available_quantity,
        bottleneck,
        components,
    })
}
