use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{inventory_transaction, material, product, recipe, stock_alert},
    errors::ServiceError,
    services::{
        bom_calculator::{self, classify_stock, StockStatus, StockThresholds},
        recipes::load_component_inputs,
    },
};

const MAX_WINDOW_DAYS: u32 = 366;
const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusCounts {
    pub critical: u64,
    pub low: u64,
    pub normal: u64,
    pub excess: u64,
}

impl StatusCounts {
    fn record(&mut self, status: StockStatus) {
        match status {
            StockStatus::Critical => self.critical += 1,
            StockStatus::Low => self.low += 1,
            StockStatus::Normal => self.normal += 1,
            StockStatus::Excess => self.excess += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MaterialStatusRow {
    pub material_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub stock_quantity: Decimal,
    pub reorder_level: Decimal,
    pub stock_value: Decimal,
    pub status: StockStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockStatusReport {
    pub counts: StatusCounts,
    pub materials: Vec<MaterialStatusRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CategoryRollup {
    pub category: String,
    pub material_count: u64,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendPeriod {
    #[default]
    Day,
    Week,
    Month,
}

impl TrendPeriod {
    /// First day of the bucket that contains `date`
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            TrendPeriod::Day => date,
            TrendPeriod::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            TrendPeriod::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UsageTrendQuery {
    /// Window length in days, ending now
    pub days: Option<u32>,
    pub period: Option<TrendPeriod>,
    pub material_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrendBucket {
    pub bucket_start: NaiveDate,
    pub transaction_count: u64,
    /// Sum of the negative changes, reported as a positive amount
    pub consumption: Decimal,
    pub replenishment: Decimal,
    pub net_change: Decimal,
    pub by_type: BTreeMap<String, Decimal>,
    pub by_reason: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UsageTrends {
    pub period: TrendPeriod,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_consumption: Decimal,
    pub total_replenishment: Decimal,
    pub buckets: Vec<TrendBucket>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TurnoverQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MaterialTurnover {
    pub material_id: Uuid,
    pub name: String,
    pub opening_stock: Decimal,
    pub closing_stock: Decimal,
    pub consumed: Decimal,
    pub average_stock: Decimal,
    /// `None` when the average stock over the window is zero
    pub turnover_rate: Option<Decimal>,
    /// `None` when nothing was consumed in the window
    pub days_of_supply: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TurnoverReport {
    pub days: u32,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub materials: Vec<MaterialTurnover>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductEfficiency {
    pub product_id: Uuid,
    pub product_name: String,
    pub recipe_id: Uuid,
    pub recipe_name: String,
    pub total_cost: Option<Decimal>,
    pub cost_per_unit: Option<Decimal>,
    /// Waste cost as a percentage of total material cost
    pub waste_cost_share: Option<Decimal>,
    pub max_producible: Option<Decimal>,
    pub bottleneck_material_id: Option<Uuid>,
    pub bottleneck_material_name: Option<String>,
    /// Why the figures above are missing, e.g. an empty recipe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MaterialDashboard {
    pub material_count: u64,
    pub status_counts: StatusCounts,
    pub total_stock_value: Decimal,
    pub pending_alerts: u64,
    pub open_alerts: u64,
    pub active_recipes: u64,
    pub generated_at: DateTime<Utc>,
}

/// Read-only reports over materials, the stock ledger and recipes
#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: Arc<DbPool>,
    thresholds: StockThresholds,
    default_window_days: u32,
}

impl AnalyticsService {
    pub fn new(db_pool: Arc<DbPool>, thresholds: StockThresholds, default_window_days: u32) -> Self {
        Self {
            db_pool,
            thresholds,
            default_window_days,
        }
    }

    async fn live_materials(&self, tenant_id: Uuid) -> Result<Vec<material::Model>, ServiceError> {
        material::Entity::find_in_tenant(tenant_id)
            .order_by_asc(material::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    fn window(&self, days: Option<u32>) -> Result<(u32, DateTime<Utc>, DateTime<Utc>), ServiceError> {
        let days = days.unwrap_or(self.default_window_days);
        if days == 0 || days > MAX_WINDOW_DAYS {
            return Err(ServiceError::ValidationError(format!(
                "days must be between 1 and {}",
                MAX_WINDOW_DAYS
            )));
        }
        let to = Utc::now();
        Ok((days, to - Duration::days(i64::from(days)), to))
    }

    #[instrument(skip(self))]
    pub async fn stock_status(&self, tenant_id: Uuid) -> Result<StockStatusReport, ServiceError> {
        let materials = self.live_materials(tenant_id).await?;
        let mut counts = StatusCounts::default();
        let rows = materials
            .into_iter()
            .map(|m| {
                let status = classify_stock(m.stock_quantity, m.reorder_level, self.thresholds);
                counts.record(status);
                MaterialStatusRow {
                    material_id: m.id,
                    stock_value: m.stock_value(),
                    name: m.name,
                    sku: m.sku,
                    category: m.category,
                    stock_quantity: m.stock_quantity,
                    reorder_level: m.reorder_level,
                    status,
                }
            })
            .collect();
        Ok(StockStatusReport {
            counts,
            materials: rows,
        })
    }

    #[instrument(skip(self))]
    pub async fn categories(&self, tenant_id: Uuid) -> Result<Vec<CategoryRollup>, ServiceError> {
        let materials = self.live_materials(tenant_id).await?;
        Ok(rollup_categories(&materials))
    }

    #[instrument(skip(self, query))]
    pub async fn usage_trends(
        &self,
        tenant_id: Uuid,
        query: UsageTrendQuery,
    ) -> Result<UsageTrends, ServiceError> {
        let (_, from, to) = self.window(query.days)?;
        let period = query.period.unwrap_or_default();

        let mut select = inventory_transaction::Entity::find_in_tenant(tenant_id)
            .filter(inventory_transaction::Column::CreatedAt.gte(from))
            .filter(inventory_transaction::Column::CreatedAt.lte(to));
        if let Some(material_id) = query.material_id {
            select = select.filter(inventory_transaction::Column::MaterialId.eq(material_id));
        }
        let rows = select
            .order_by_asc(inventory_transaction::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let buckets = bucket_usage(&rows, period);
        Ok(UsageTrends {
            period,
            from,
            to,
            total_consumption: buckets.iter().map(|b| b.consumption).sum(),
            total_replenishment: buckets.iter().map(|b| b.replenishment).sum(),
            buckets,
        })
    }

    #[instrument(skip(self, query))]
    pub async fn turnover(
        &self,
        tenant_id: Uuid,
        query: TurnoverQuery,
    ) -> Result<TurnoverReport, ServiceError> {
        let (days, from, to) = self.window(query.days)?;
        let materials = self.live_materials(tenant_id).await?;
        let rows = inventory_transaction::Entity::find_in_tenant(tenant_id)
            .filter(inventory_transaction::Column::CreatedAt.gte(from))
            .filter(inventory_transaction::Column::CreatedAt.lte(to))
            .order_by_asc(inventory_transaction::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let mut by_material: BTreeMap<Uuid, Vec<&inventory_transaction::Model>> = BTreeMap::new();
        for row in &rows {
            by_material.entry(row.material_id).or_default().push(row);
        }

        let report = materials
            .iter()
            .map(|m| {
                let ledger = by_material.get(&m.id).map(Vec::as_slice).unwrap_or(&[]);
                material_turnover(m, ledger, days)
            })
            .collect();

        Ok(TurnoverReport {
            days,
            from,
            to,
            materials: report,
        })
    }

    /// Cost and capacity of every product that has an active recipe
    #[instrument(skip(self))]
    pub async fn production_efficiency(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<ProductEfficiency>, ServiceError> {
        let db = self.db_pool.as_ref();
        let recipes = recipe::Entity::find_in_tenant(tenant_id)
            .filter(recipe::Column::IsActive.eq(true))
            .order_by_asc(recipe::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let products: BTreeMap<Uuid, String> = product::Entity::find_in_tenant(tenant_id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let mut report = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            // Recipes of soft-deleted products are not reported
            let Some(product_name) = products.get(&recipe.product_id) else {
                continue;
            };
            let components = load_component_inputs(db, tenant_id, recipe.id).await?;
            let mut row = ProductEfficiency {
                product_id: recipe.product_id,
                product_name: product_name.clone(),
                recipe_id: recipe.id,
                recipe_name: recipe.name.clone(),
                total_cost: None,
                cost_per_unit: None,
                waste_cost_share: None,
                max_producible: None,
                bottleneck_material_id: None,
                bottleneck_material_name: None,
                issue: None,
            };

            match bom_calculator::recipe_cost(&components, recipe.yield_quantity) {
                Ok(cost) => {
                    row.waste_cost_share = (cost.total_cost > Decimal::ZERO).then(|| {
                        (cost.total_waste_cost / cost.total_cost * Decimal::ONE_HUNDRED).round_dp(2)
                    });
                    row.total_cost = Some(cost.total_cost);
                    row.cost_per_unit = Some(cost.cost_per_unit);
                }
                Err(err) => row.issue = Some(err.to_string()),
            }
            match bom_calculator::available_quantity(&components) {
                Ok(availability) => {
                    row.max_producible = Some(availability.available_quantity);
                    row.bottleneck_material_id = Some(availability.bottleneck.material_id);
                    row.bottleneck_material_name = Some(availability.bottleneck.material_name);
                }
                Err(err) => row.issue = Some(err.to_string()),
            }
            report.push(row);
        }
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self, tenant_id: Uuid) -> Result<MaterialDashboard, ServiceError> {
        let db = self.db_pool.as_ref();
        let materials = self.live_materials(tenant_id).await?;

        let mut status_counts = StatusCounts::default();
        let mut total_stock_value = Decimal::ZERO;
        for m in &materials {
            status_counts.record(classify_stock(m.stock_quantity, m.reorder_level, self.thresholds));
            total_stock_value += m.stock_value();
        }

        let pending_alerts = stock_alert::Entity::find_in_tenant(tenant_id)
            .filter(stock_alert::Column::Status.eq(stock_alert::AlertStatus::Pending))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let open_alerts = stock_alert::Entity::find_in_tenant(tenant_id)
            .filter(stock_alert::Column::Status.is_in(stock_alert::AlertStatus::OPEN))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        // Same population as production_efficiency: live products only
        let live_products = product::Entity::find_in_tenant(tenant_id)
            .select_only()
            .column(product::Column::Id)
            .into_query();
        let active_recipes = recipe::Entity::find_in_tenant(tenant_id)
            .filter(recipe::Column::IsActive.eq(true))
            .filter(recipe::Column::ProductId.in_subquery(live_products))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        info!(%tenant_id, materials = materials.len(), "Dashboard generated");
        Ok(MaterialDashboard {
            material_count: materials.len() as u64,
            status_counts,
            total_stock_value,
            pending_alerts,
            open_alerts,
            active_recipes,
            generated_at: Utc::now(),
        })
    }
}

/// Groups materials by category, sorted by category name.
pub fn rollup_categories(materials: &[material::Model]) -> Vec<CategoryRollup> {
    let mut groups: BTreeMap<String, CategoryRollup> = BTreeMap::new();
    for m in materials {
        let key = m
            .category
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        let entry = groups.entry(key.clone()).or_insert_with(|| CategoryRollup {
            category: key,
            material_count: 0,
            total_quantity: Decimal::ZERO,
            total_value: Decimal::ZERO,
        });
        entry.material_count += 1;
        entry.total_quantity += m.stock_quantity;
        entry.total_value += m.stock_value();
    }
    groups.into_values().collect()
}

/// Buckets ledger rows by `period`, oldest bucket first.
pub fn bucket_usage(rows: &[inventory_transaction::Model], period: TrendPeriod) -> Vec<TrendBucket> {
    let mut buckets: BTreeMap<NaiveDate, TrendBucket> = BTreeMap::new();
    for row in rows {
        let start = period.bucket_start(row.created_at.date_naive());
        let bucket = buckets.entry(start).or_insert_with(|| TrendBucket {
            bucket_start: start,
            transaction_count: 0,
            consumption: Decimal::ZERO,
            replenishment: Decimal::ZERO,
            net_change: Decimal::ZERO,
            by_type: BTreeMap::new(),
            by_reason: BTreeMap::new(),
        });

        let change = row.quantity_change;
        bucket.transaction_count += 1;
        bucket.net_change += change;
        if change < Decimal::ZERO {
            bucket.consumption -= change;
        } else {
            bucket.replenishment += change;
        }
        *bucket
            .by_type
            .entry(row.transaction_type.to_string())
            .or_insert(Decimal::ZERO) += change;
        let reason = row
            .reason
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "unspecified".to_string());
        *bucket.by_reason.entry(reason).or_insert(Decimal::ZERO) += change;
    }
    buckets.into_values().collect()
}

/// Turnover of one material from its ledger rows inside the window,
/// oldest first. Opening stock is the level before the first row in the
/// window, or the current level when there was no movement.
pub fn material_turnover(
    material: &material::Model,
    ledger: &[&inventory_transaction::Model],
    days: u32,
) -> MaterialTurnover {
    let closing = material.stock_quantity;
    let opening = ledger.first().map(|t| t.quantity_before).unwrap_or(closing);
    let consumed: Decimal = ledger
        .iter()
        .filter(|t| t.quantity_change < Decimal::ZERO)
        .map(|t| -t.quantity_change)
        .sum();
    let average_stock = (opening + closing) / Decimal::TWO;

    let turnover_rate =
        (average_stock > Decimal::ZERO).then(|| (consumed / average_stock).round_dp(4));
    let days_of_supply = (consumed > Decimal::ZERO && days > 0).then(|| {
        let daily = consumed / Decimal::from(days);
        (closing / daily).round_dp(2)
    });

    MaterialTurnover {
        material_id: material.id,
        name: material.name.clone(),
        opening_stock: opening,
        closing_stock: closing,
        consumed,
        average_stock,
        turnover_rate,
        days_of_supply,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::inventory_transaction::TransactionType;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn material(category: Option<&str>, stock: Decimal, cost: Decimal) -> material::Model {
        let now = Utc::now();
        material::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            name: "Flour".to_string(),
            sku: "FL-1".to_string(),
            category: category.map(str::to_string),
            unit_of_measure: "kg".to_string(),
            stock_quantity: stock,
            reorder_level: dec!(10),
            unit_cost: cost,
            description: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn ledger_row(
        at: DateTime<Utc>,
        kind: TransactionType,
        before: Decimal,
        change: Decimal,
        reason: Option<&str>,
    ) -> inventory_transaction::Model {
        inventory_transaction::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            material_id: Uuid::nil(),
            transaction_type: kind,
            quantity_before: before,
            quantity_change: change,
            quantity_after: before + change,
            reason: reason.map(str::to_string),
            notes: None,
            reference_type: None,
            reference_id: None,
            created_by: None,
            created_at: at,
        }
    }

    #[rstest]
    #[case(TrendPeriod::Day, (2024, 3, 14), (2024, 3, 14))]
    #[case(TrendPeriod::Week, (2024, 3, 14), (2024, 3, 11))]
    #[case(TrendPeriod::Week, (2024, 3, 11), (2024, 3, 11))]
    #[case(TrendPeriod::Month, (2024, 3, 14), (2024, 3, 1))]
    fn bucket_start_aligns_to_period(
        #[case] period: TrendPeriod,
        #[case] date: (i32, u32, u32),
        #[case] expected: (i32, u32, u32),
    ) {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let expected = NaiveDate::from_ymd_opt(expected.0, expected.1, expected.2).unwrap();
        assert_eq!(period.bucket_start(date), expected);
    }

    #[test]
    fn categories_are_rolled_up_with_value() {
        let materials = vec![
            material(Some("dairy"), dec!(10), dec!(2)),
            material(Some("dairy"), dec!(5), dec!(1.5)),
            material(None, dec!(3), dec!(4)),
        ];
        let rollup = rollup_categories(&materials);
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].category, "dairy");
        assert_eq!(rollup[0].material_count, 2);
        assert_eq!(rollup[0].total_quantity, dec!(15));
        assert_eq!(rollup[0].total_value, dec!(27.5));
        assert_eq!(rollup[1].category, UNCATEGORIZED);
        assert_eq!(rollup[1].total_value, dec!(12));
    }

    #[test]
    fn usage_is_split_into_consumption_and_replenishment() {
        let day1 = Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let rows = vec![
            ledger_row(day1, TransactionType::Restock, dec!(0), dec!(100), None),
            ledger_row(day1, TransactionType::Deduction, dec!(100), dec!(-30), Some("production")),
            ledger_row(day2, TransactionType::Adjustment, dec!(70), dec!(-5), Some("spoilage")),
        ];

        let daily = bucket_usage(&rows, TrendPeriod::Day);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].consumption, dec!(30));
        assert_eq!(daily[0].replenishment, dec!(100));
        assert_eq!(daily[0].net_change, dec!(70));
        assert_eq!(daily[0].by_reason["production"], dec!(-30));
        assert_eq!(daily[0].by_reason["unspecified"], dec!(100));
        assert_eq!(daily[1].by_type["adjustment"], dec!(-5));

        let weekly = bucket_usage(&rows, TrendPeriod::Week);
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].transaction_count, 3);
        assert_eq!(weekly[0].consumption, dec!(35));
    }

    #[test]
    fn turnover_uses_ledger_opening_stock() {
        let m = material(None, dec!(60), dec!(1));
        let now = Utc::now();
        let first = ledger_row(now, TransactionType::Deduction, dec!(100), dec!(-50), None);
        let second = ledger_row(now, TransactionType::Restock, dec!(50), dec!(10), None);
        let t = material_turnover(&m, &[&first, &second], 10);

        assert_eq!(t.opening_stock, dec!(100));
        assert_eq!(t.closing_stock, dec!(60));
        assert_eq!(t.consumed, dec!(50));
        assert_eq!(t.average_stock, dec!(80));
        assert_eq!(t.turnover_rate, Some(dec!(0.625)));
        // 5 per day, 60 on hand
        assert_eq!(t.days_of_supply, Some(dec!(12)));
    }

    #[test]
    fn idle_material_has_no_days_of_supply() {
        let m = material(None, dec!(0), dec!(1));
        let t = material_turnover(&m, &[], 30);
        assert_eq!(t.opening_stock, dec!(0));
        assert_eq!(t.turnover_rate, None);
        assert_eq!(t.days_of_supply, None);
    }
}
