//! Pure bill-of-materials arithmetic.
//!
//! Nothing in here touches the database: [`crate::services::bom`] loads the
//! recipe and stock rows, turns them into [`ComponentInput`]s and hands them to
//! these functions. All quantities are [`Decimal`]; producible counts are
//! whole units (floored).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    #[error("recipe has no components")]
    EmptyRecipe,
    #[error("material {material_id} has an effective need of zero")]
    ZeroEffectiveNeed { material_id: Uuid },
    #[error("recipe yield must be greater than zero")]
    InvalidYield,
    #[error("{0}")]
    InvalidBatchBounds(String),
    #[error("quantities are too large to calculate with")]
    Overflow,
}

fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal, CalculationError> {
    a.checked_mul(b).ok_or(CalculationError::Overflow)
}

fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal, CalculationError> {
    a.checked_add(b).ok_or(CalculationError::Overflow)
}

impl From<CalculationError> for ServiceError {
    fn from(err: CalculationError) -> Self {
        ServiceError::InvalidOperation(err.to_string())
    }
}

/// One recipe line joined with the current state of its material
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInput {
    pub material_id: Uuid,
    pub material_name: String,
    pub unit: String,
    pub quantity_required: Decimal,
    pub waste_percentage: Decimal,
    pub stock_quantity: Decimal,
    pub unit_cost: Decimal,
}

impl ComponentInput {
    pub fn effective_need(&self) -> Decimal {
        effective_need(self.quantity_required, self.waste_percentage)
    }

    /// Material consumed by `quantity` units
    pub fn required_for(&self, quantity: Decimal) -> Result<Decimal, CalculationError> {
        checked_mul(quantity, self.effective_need())
    }
}

/// `quantity_required * (1 + waste_percentage / 100)`
pub fn effective_need(quantity_required: Decimal, waste_percentage: Decimal) -> Decimal {
    quantity_required * (Decimal::ONE + waste_percentage / HUNDRED)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComponentAvailability {
    pub material_id: Uuid,
    pub material_name: String,
    pub unit: String,
    pub stock_quantity: Decimal,
    pub effective_need: Decimal,
    /// Whole units this material alone allows
    pub producible: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Availability {
    pub available_quantity: Decimal,
    pub bottleneck: ComponentAvailability,
    pub components: Vec<ComponentAvailability>,
}

fn validate_components(components: &[ComponentInput]) -> Result<(), CalculationError> {
    if components.is_empty() {
        return Err(CalculationError::EmptyRecipe);
    }
    if let Some(c) = components.iter().find(|c| c.effective_need() <= Decimal::ZERO) {
        return Err(CalculationError::ZeroEffectiveNeed {
            material_id: c.material_id,
        });
    }
    Ok(())
}

/// How many whole units the current stock allows, and which material limits it.
///
/// Ties keep the earliest component in recipe order as the bottleneck.
pub fn available_quantity(components: &[ComponentInput]) -> Result<Availability, CalculationError> {
    validate_components(components)?;

    let lines: Vec<ComponentAvailability> = components
        .iter()
        .map(|c| {
            let need = c.effective_need();
            let stock = c.stock_quantity.max(Decimal::ZERO);
            ComponentAvailability {
                material_id: c.material_id,
                material_name: c.material_name.clone(),
                unit: c.unit.clone(),
                stock_quantity: c.stock_quantity,
                effective_need: need,
                producible: (stock / need).floor(),
            }
        })
        .collect();

    let mut bottleneck = &lines[0];
    for line in &lines[1..] {
        if line.producible < bottleneck.producible {
            bottleneck = line;
        }
    }

    Ok(Availability {
        available_quantity: bottleneck.producible,
        bottleneck: bottleneck.clone(),
        components: lines,
    })
}

/// A requested product in a multi-product plan
#[derive(Debug, Clone)]
pub struct PlanLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub components: Vec<ComponentInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlannedProduct {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub material_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MaterialRequirement {
    pub material_id: Uuid,
    pub material_name: String,
    pub unit: String,
    pub required: Decimal,
    pub available: Decimal,
    pub sufficient: bool,
    pub shortage: Decimal,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchPlan {
    pub feasible: bool,
    pub products: Vec<PlannedProduct>,
    pub materials: Vec<MaterialRequirement>,
    pub shortages: Vec<MaterialRequirement>,
    pub total_material_cost: Decimal,
}

/// Pools the stock across every requested product.
///
/// Repeated product ids are summed into one line. Materials are reported in
/// the order they are first met.
pub fn plan_batch(lines: &[PlanLine]) -> Result<BatchPlan, CalculationError> {
    let mut merged: Vec<PlanLine> = Vec::new();
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity = checked_add(existing.quantity, line.quantity)?,
            None => merged.push(line.clone()),
        }
    }

    let mut order: Vec<Uuid> = Vec::new();
    let mut requirements: HashMap<Uuid, MaterialRequirement> = HashMap::new();
    let mut products = Vec::with_capacity(merged.len());

    for line in &merged {
        validate_components(&line.components)?;
        let mut line_cost = Decimal::ZERO;
        for c in &line.components {
            let required = c.required_for(line.quantity)?;
            let cost = checked_mul(required, c.unit_cost)?;
            line_cost = checked_add(line_cost, cost)?;
            let entry = requirements.entry(c.material_id).or_insert_with(|| {
                order.push(c.material_id);
                MaterialRequirement {
                    material_id: c.material_id,
                    material_name: c.material_name.clone(),
                    unit: c.unit.clone(),
                    required: Decimal::ZERO,
                    available: c.stock_quantity,
                    sufficient: true,
                    shortage: Decimal::ZERO,
                    cost: Decimal::ZERO,
                }
            });
            entry.required = checked_add(entry.required, required)?;
            entry.cost = checked_add(entry.cost, cost)?;
        }
        products.push(PlannedProduct {
            product_id: line.product_id,
            quantity: line.quantity,
            material_cost: line_cost,
        });
    }

    let materials: Vec<MaterialRequirement> = order
        .iter()
        .filter_map(|id| requirements.remove(id))
        .map(|mut m| {
            m.sufficient = m.required <= m.available;
            m.shortage = if m.sufficient {
                Decimal::ZERO
            } else {
                m.required - m.available
            };
            m
        })
        .collect();

    let shortages: Vec<MaterialRequirement> =
        materials.iter().filter(|m| !m.sufficient).cloned().collect();
    let total_material_cost = products
        .iter()
        .try_fold(Decimal::ZERO, |total, p| checked_add(total, p.material_cost))?;

    Ok(BatchPlan {
        feasible: shortages.is_empty(),
        products,
        materials,
        shortages,
        total_material_cost,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, ToSchema)]
pub struct BatchBounds {
    pub min_quantity: Decimal,
    pub max_quantity: Decimal,
    pub target_quantity: Option<Decimal>,
}

impl BatchBounds {
    fn validate(&self) -> Result<(), CalculationError> {
        if self.min_quantity <= Decimal::ZERO {
            return Err(CalculationError::InvalidBatchBounds(
                "min_quantity must be greater than zero".into(),
            ));
        }
        if self.min_quantity > self.max_quantity {
            return Err(CalculationError::InvalidBatchBounds(
                "min_quantity cannot exceed max_quantity".into(),
            ));
        }
        if let Some(target) = self.target_quantity {
            if target < self.min_quantity || target > self.max_quantity {
                return Err(CalculationError::InvalidBatchBounds(
                    "target_quantity must lie between min_quantity and max_quantity".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchCandidate {
    pub quantity: Decimal,
    pub material_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OptimalBatch {
    pub max_producible: Decimal,
    pub bottleneck: ComponentAvailability,
    pub can_meet_minimum: bool,
    pub recommended_batch_size: Option<Decimal>,
    pub recommended_batch_cost: Option<Decimal>,
    /// Distinct sizes among min, target and max that the stock covers
    pub candidates: Vec<BatchCandidate>,
}

fn batch_cost(components: &[ComponentInput], quantity: Decimal) -> Result<Decimal, CalculationError> {
    components.iter().try_fold(Decimal::ZERO, |total, c| {
        checked_add(total, checked_mul(c.required_for(quantity)?, c.unit_cost)?)
    })
}

pub fn optimal_batch(
    components: &[ComponentInput],
    bounds: BatchBounds,
) -> Result<OptimalBatch, CalculationError> {
    bounds.validate()?;
    let availability = available_quantity(components)?;
    let max_producible = availability.available_quantity;

    let wanted = bounds.target_quantity.unwrap_or(bounds.max_quantity);
    let size = wanted.min(bounds.max_quantity).min(max_producible);
    let can_meet_minimum = size >= bounds.min_quantity;
    let recommended_batch_size = can_meet_minimum.then_some(size);

    let mut candidates: Vec<BatchCandidate> = Vec::new();
    let sizes = [
        Some(bounds.min_quantity),
        bounds.target_quantity,
        Some(bounds.max_quantity),
    ];
    for quantity in sizes.into_iter().flatten() {
        if quantity <= max_producible && !candidates.iter().any(|c| c.quantity == quantity) {
            candidates.push(BatchCandidate {
                quantity,
                material_cost: batch_cost(components, quantity)?,
            });
        }
    }

    let recommended_batch_cost = recommended_batch_size
        .map(|q| batch_cost(components, q))
        .transpose()?;

    Ok(OptimalBatch {
        max_producible,
        bottleneck: availability.bottleneck,
        can_meet_minimum,
        recommended_batch_cost,
        recommended_batch_size,
        candidates,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComponentCost {
    pub material_id: Uuid,
    pub material_name: String,
    pub quantity_required: Decimal,
    pub waste_percentage: Decimal,
    pub effective_need: Decimal,
    pub unit_cost: Decimal,
    pub line_cost: Decimal,
    pub waste_cost: Decimal,
    /// Percentage of the recipe's total cost
    pub share_of_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecipeCost {
    pub total_cost: Decimal,
    pub cost_per_unit: Decimal,
    pub total_waste_cost: Decimal,
    pub yield_quantity: Decimal,
    pub components: Vec<ComponentCost>,
}

/// Material cost of one batch and of one yielded unit.
pub fn recipe_cost(
    components: &[ComponentInput],
    yield_quantity: Decimal,
) -> Result<RecipeCost, CalculationError> {
    if yield_quantity <= Decimal::ZERO {
        return Err(CalculationError::InvalidYield);
    }

    let mut lines = components
        .iter()
        .map(|c| {
            let need = c.effective_need();
            let wasted = checked_mul(c.quantity_required, c.waste_percentage / HUNDRED)?;
            Ok(ComponentCost {
                material_id: c.material_id,
                material_name: c.material_name.clone(),
                quantity_required: c.quantity_required,
                waste_percentage: c.waste_percentage,
                effective_need: need,
                unit_cost: c.unit_cost,
                line_cost: checked_mul(need, c.unit_cost)?,
                waste_cost: checked_mul(wasted, c.unit_cost)?,
                share_of_total: Decimal::ZERO,
            })
        })
        .collect::<Result<Vec<ComponentCost>, CalculationError>>()?;

    let total_cost = lines
        .iter()
        .try_fold(Decimal::ZERO, |total, l| checked_add(total, l.line_cost))?;
    let total_waste_cost = lines
        .iter()
        .try_fold(Decimal::ZERO, |total, l| checked_add(total, l.waste_cost))?;
    if total_cost > Decimal::ZERO {
        for line in &mut lines {
            line.share_of_total = (line.line_cost / total_cost * HUNDRED).round_dp(2);
        }
    }

    Ok(RecipeCost {
        total_cost,
        cost_per_unit: total_cost / yield_quantity,
        total_waste_cost,
        yield_quantity,
        components: lines,
    })
}

/// Every shortage that would block deducting `quantity` batches.
pub fn production_shortages(
    components: &[ComponentInput],
    quantity: Decimal,
) -> Result<Vec<MaterialRequirement>, CalculationError> {
    let plan = plan_batch(&[PlanLine {
        product_id: Uuid::nil(),
        quantity,
        components: components.to_vec(),
    }])?;
    Ok(plan.shortages)
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockStatus {
    Critical,
    Low,
    Normal,
    Excess,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockThresholds {
    pub critical_ratio: Decimal,
    pub excess_ratio: Decimal,
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self {
            critical_ratio: Decimal::new(5, 1),
            excess_ratio: Decimal::from(3),
        }
    }
}

/// Buckets a stock level against its reorder level.
pub fn classify_stock(
    stock: Decimal,
    reorder_level: Decimal,
    thresholds: StockThresholds,
) -> StockStatus {
    if stock <= Decimal::ZERO {
        return StockStatus::Critical;
    }
    if reorder_level <= Decimal::ZERO {
        return StockStatus::Normal;
    }
    if stock <= reorder_level * thresholds.critical_ratio {
        StockStatus::Critical
    } else if stock <= reorder_level {
        StockStatus::Low
    } else if stock > reorder_level * thresholds.excess_ratio {
        StockStatus::Excess
    } else {
        StockStatus::Normal
    }
}
