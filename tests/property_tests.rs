//! Property-based tests for the bill-of-materials arithmetic.
//!
//! These use proptest to check invariants of availability, batch planning and
//! costing across a wide range of stock levels and recipe shapes.

use proptest::prelude::*;
use rust_decimal::Decimal;
use stockline_api::services::bom_calculator::{
    available_quantity, classify_stock, effective_need, optimal_batch, plan_batch, recipe_cost,
    BatchBounds, ComponentInput, PlanLine, StockStatus, StockThresholds,
};
use stockline_api::services::inventory_adjustment_service::{next_stock_level, StockLevelError};
use stockline_api::services::validators::fits_storage;
use uuid::Uuid;

// Strategies for generating test data
fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    // 0.01 ..= 10000.00
    (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn stock_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

fn signed_change_strategy() -> impl Strategy<Value = Decimal> {
    // -10000.0000 ..= 10000.0000, plus a scale-5 change now and then
    prop_oneof![
        9 => (-100_000_000i64..=100_000_000).prop_map(|units| Decimal::new(units, 4)),
        1 => (-1_000_000i64..=1_000_000).prop_map(|units| Decimal::new(units, 5)),
    ]
}

fn waste_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=1000).prop_map(|tenths| Decimal::new(tenths, 1))
}

fn component_strategy() -> impl Strategy<Value = ComponentInput> {
    (
        quantity_strategy(),
        waste_strategy(),
        stock_strategy(),
        (0i64..10_000).prop_map(|c| Decimal::new(c, 3)),
    )
        .prop_map(|(qty, waste, stock, cost)| ComponentInput {
            material_id: Uuid::new_v4(),
            material_name: "material".to_string(),
            unit: "g".to_string(),
            quantity_required: qty,
            waste_percentage: waste,
            stock_quantity: stock,
            unit_cost: cost,
        })
}

fn recipe_strategy() -> impl Strategy<Value = Vec<ComponentInput>> {
    prop::collection::vec(component_strategy(), 1..8)
}

// Property: the producible quantity is the largest whole number the stock covers
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn availability_is_tight(components in recipe_strategy()) {
        let availability = available_quantity(&components).unwrap();
        let units = availability.available_quantity;

        prop_assert!(units >= Decimal::ZERO);
        prop_assert_eq!(units, units.trunc());
        for c in &components {
            prop_assert!(units * c.effective_need() <= c.stock_quantity);
        }
        let bottleneck = components
            .iter()
            .find(|c| c.material_id == availability.bottleneck.material_id)
            .unwrap();
        prop_assert!((units + Decimal::ONE) * bottleneck.effective_need() > bottleneck.stock_quantity);
    }

    #[test]
    fn producing_the_available_quantity_is_always_feasible(components in recipe_strategy()) {
        let units = available_quantity(&components).unwrap().available_quantity;
        prop_assume!(units > Decimal::ZERO);

        let plan = plan_batch(&[PlanLine {
            product_id: Uuid::new_v4(),
            quantity: units,
            components: components.clone(),
        }])
        .unwrap();
        prop_assert!(plan.feasible);
        prop_assert!(plan.shortages.is_empty());
    }

    #[test]
    fn waste_never_lowers_the_need(qty in quantity_strategy(), waste in waste_strategy()) {
        let need = effective_need(qty, waste);
        prop_assert!(need >= qty);
        prop_assert_eq!(effective_need(qty, Decimal::ZERO), qty);
    }
}

// Property: pooling a plan agrees with the per-line arithmetic
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn batch_plan_totals_add_up(
        components in recipe_strategy(),
        first in 1i64..50,
        second in 1i64..50,
    ) {
        let product = Uuid::new_v4();
        let lines = [
            PlanLine { product_id: product, quantity: Decimal::from(first), components: components.clone() },
            PlanLine { product_id: product, quantity: Decimal::from(second), components: components.clone() },
        ];
        let plan = plan_batch(&lines).unwrap();

        // Repeated products are merged
        prop_assert_eq!(plan.products.len(), 1);
        prop_assert_eq!(plan.products[0].quantity, Decimal::from(first + second));

        let material_cost: Decimal = plan.materials.iter().map(|m| m.cost).sum();
        prop_assert_eq!(material_cost, plan.total_material_cost);
        for m in &plan.materials {
            prop_assert_eq!(m.sufficient, m.required <= m.available);
            if m.sufficient {
                prop_assert_eq!(m.shortage, Decimal::ZERO);
            } else {
                prop_assert_eq!(m.shortage, m.required - m.available);
            }
        }
        prop_assert_eq!(plan.feasible, plan.shortages.is_empty());
    }

    #[test]
    fn recommended_batch_respects_bounds(
        components in recipe_strategy(),
        min in 1i64..20,
        span in 0i64..50,
    ) {
        let bounds = BatchBounds {
            min_quantity: Decimal::from(min),
            max_quantity: Decimal::from(min + span),
            target_quantity: None,
        };
        let batch = optimal_batch(&components, bounds).unwrap();
        match batch.recommended_batch_size {
            Some(size) => {
                prop_assert!(batch.can_meet_minimum);
                prop_assert!(size >= bounds.min_quantity && size <= bounds.max_quantity);
                prop_assert!(size <= batch.max_producible);
            }
            None => {
                prop_assert!(!batch.can_meet_minimum);
                prop_assert!(batch.max_producible < bounds.min_quantity);
            }
        }
        for candidate in &batch.candidates {
            prop_assert!(candidate.quantity <= batch.max_producible);
        }
    }

    #[test]
    fn cost_per_unit_scales_with_yield(components in recipe_strategy(), yield_qty in 1i64..100) {
        let cost = recipe_cost(&components, Decimal::from(yield_qty)).unwrap();
        let rebuilt = cost.cost_per_unit * Decimal::from(yield_qty);
        prop_assert!((rebuilt - cost.total_cost).abs() <= Decimal::new(1, 18));
        prop_assert!(cost.total_waste_cost <= cost.total_cost);
    }
}

// Property: an empty shelf is always critical, no matter the thresholds
proptest! {
    #[test]
    fn empty_stock_is_critical(reorder in stock_strategy()) {
        prop_assert_eq!(
            classify_stock(Decimal::ZERO, reorder, StockThresholds::default()),
            StockStatus::Critical
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn ledger_rows_chain_and_stock_stays_non_negative(
        opening in stock_strategy(),
        changes in prop::collection::vec(signed_change_strategy(), 1..40)
    ) {
        let mut stock = opening;
        let mut ledger: Vec<(Decimal, Decimal, Decimal)> = Vec::new();
        for change in changes {
            match next_stock_level(stock, change) {
                Ok(after) => {
                    prop_assert_eq!(after, stock + change);
                    prop_assert!(after >= Decimal::ZERO);
                    prop_assert!(fits_storage(after));
                    ledger.push((stock, change, after));
                    stock = after;
                }
                Err(StockLevelError::Negative) => prop_assert!(stock + change < Decimal::ZERO),
                Err(StockLevelError::OutOfRange) => prop_assert!(!fits_storage(change)),
            }
        }

        // Rows chain: each row starts where the previous one ended
        let mut expected = opening;
        for (before, change, after) in &ledger {
            prop_assert_eq!(*before, expected);
            prop_assert_eq!(*after, *before + *change);
            expected = *after;
        }
        prop_assert_eq!(expected, stock);
    }
}
