use crate::{
    db::{self, DbPool},
    entities::{
        inventory_transaction::{self, TransactionType},
        material, stock_alert,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        materials::find_material,
        stock_alerts::{self, AlertOutcome},
        validators::fits_storage,
    },
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Request to change the stock of one material
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdjustStockInput {
    pub transaction_type: TransactionType,
    /// Positive amount for `restock` and `deduction`, signed delta for `adjustment`
    #[validate(custom = "super::validators::non_zero_decimal")]
    pub quantity: Decimal,
    #[validate(length(max = 255))]
    pub reason: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 50))]
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub performed_by: Option<Uuid>,
}

impl AdjustStockInput {
    /// Signed change this request applies to the stock level
    pub fn signed_change(&self) -> Result<Decimal, ServiceError> {
        match self.transaction_type {
            TransactionType::Adjustment => Ok(self.quantity),
            TransactionType::Restock | TransactionType::Deduction
                if self.quantity < Decimal::ZERO =>
            {
                Err(ServiceError::ValidationError(format!(
                    "quantity for a {} must be positive",
                    self.transaction_type
                )))
            }
            TransactionType::Restock => Ok(self.quantity),
            TransactionType::Deduction => Ok(-self.quantity),
        }
    }
}

/// One stock change, as written to the ledger
#[derive(Debug, Clone)]
pub struct StockChange {
    pub transaction_type: TransactionType,
    pub change: Decimal,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub actor: Option<Uuid>,
}

/// Result of [`apply_stock_change`]
#[derive(Debug, Clone)]
pub struct AppliedChange {
    pub material: material::Model,
    pub transaction: inventory_transaction::Model,
    pub alerts: AlertOutcome,
}

impl AppliedChange {
    pub fn events(&self) -> Vec<Event> {
        let mut events = vec![Event::StockAdjusted {
            tenant_id: self.material.tenant_id,
            material_id: self.material.id,
            transaction_id: self.transaction.id,
            transaction_type: self.transaction.transaction_type,
            quantity_before: self.transaction.quantity_before,
            quantity_after: self.transaction.quantity_after,
        }];
        events.extend(self.alerts.events());
        events
    }
}

/// Why a stock change cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevelError {
    /// The change or the resulting level does not fit the stock columns
    OutOfRange,
    /// The resulting level would be below zero
    Negative,
}

/// Stock level after applying `change` to `before`.
pub fn next_stock_level(before: Decimal, change: Decimal) -> Result<Decimal, StockLevelError> {
    let after = before
        .checked_add(change)
        .filter(|after| fits_storage(change) && fits_storage(*after))
        .ok_or(StockLevelError::OutOfRange)?;
    if after < Decimal::ZERO {
        return Err(StockLevelError::Negative);
    }
    Ok(after)
}

/// Applies `change` to `material`, writes its ledger row and re-evaluates
/// alerts, all on `conn`.
///
/// Fails with `InsufficientStock` and writes nothing when the result would be
/// negative, and with `ValidationError` when the change or the result would
/// not be stored exactly. Callers run this inside a transaction.
pub async fn apply_stock_change<C: ConnectionTrait>(
    conn: &C,
    material: material::Model,
    change: StockChange,
) -> Result<AppliedChange, ServiceError> {
    let before = material.stock_quantity;
    let after = next_stock_level(before, change.change).map_err(|err| {
        counter!("stockline_stock.rejected", 1, "type" => change.transaction_type.to_string());
        match err {
            StockLevelError::OutOfRange => ServiceError::ValidationError(format!(
                "Changing {} by {} leaves the storable stock range",
                material.name,
                change.change.normalize()
            )),
            StockLevelError::Negative => ServiceError::insufficient_stock_with(
                format!(
                    "{} has {} {} on hand, cannot apply {}",
                    material.name,
                    before.normalize(),
                    material.unit_of_measure,
                    change.change.normalize()
                ),
                serde_json::json!({
                    "material_id": material.id,
                    "available": before,
                    "requested_change": change.change,
                }),
            ),
        }
    })?;

    let now = Utc::now();
    let tenant_id = material.tenant_id;
    let material_id = material.id;

    let mut active = material.into_active_model();
    active.stock_quantity = Set(after);
    active.updated_at = Set(now);
    let material = active.update(conn).await.map_err(ServiceError::db_error)?;

    let transaction = inventory_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        material_id: Set(material_id),
        transaction_type: Set(change.transaction_type),
        quantity_before: Set(before),
        quantity_change: Set(change.change),
        quantity_after: Set(after),
        reason: Set(change.reason),
        notes: Set(change.notes),
        reference_type: Set(change.reference_type),
        reference_id: Set(change.reference_id),
        created_by: Set(change.actor),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    let alerts = stock_alerts::evaluate_material(conn, &material, change.actor).await?;

    counter!("stockline_stock.mutations", 1, "type" => change.transaction_type.to_string());
    Ok(AppliedChange {
        material,
        transaction,
        alerts,
    })
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockAdjustmentResult {
    pub material: material::Model,
    pub transaction: inventory_transaction::Model,
    pub raised_alert: Option<stock_alert::Model>,
    pub resolved_alerts: Vec<Uuid>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LedgerFilter {
    pub material_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub reference_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Stock mutations and the append-only ledger behind them
#[derive(Clone)]
pub struct InventoryAdjustmentService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl InventoryAdjustmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(transaction_type = %input.transaction_type))]
    pub async fn adjust_stock(
        &self,
        tenant_id: Uuid,
        material_id: Uuid,
        input: AdjustStockInput,
    ) -> Result<StockAdjustmentResult, ServiceError> {
        input.validate()?;
        let change = StockChange {
            transaction_type: input.transaction_type,
            change: input.signed_change()?,
            reason: input.reason,
            notes: input.notes,
            reference_type: input.reference_type,
            reference_id: input.reference_id,
            actor: input.performed_by,
        };

        let applied = db::transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let material = find_material(txn, tenant_id, material_id).await?;
                apply_stock_change(txn, material, change).await
            })
        })
        .await
        .map_err(|e| {
            if matches!(e, ServiceError::InsufficientStock { .. }) {
                warn!(%tenant_id, %material_id, "Stock adjustment rejected: {}", e);
            }
            e
        })?;

        info!(
            %tenant_id,
            %material_id,
            before = %applied.transaction.quantity_before,
            after = %applied.transaction.quantity_after,
            "Stock adjusted"
        );
        self.event_sender.publish_all(applied.events()).await;

        Ok(StockAdjustmentResult {
            resolved_alerts: applied.alerts.resolved.iter().map(|r| r.alert.id).collect(),
            raised_alert: applied.alerts.raised,
            material: applied.material,
            transaction: applied.transaction,
        })
    }

    /// Tenant ledger, newest first
    pub async fn list_transactions(
        &self,
        tenant_id: Uuid,
        filter: LedgerFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_transaction::Model>, u64), ServiceError> {
        let mut query = inventory_transaction::Entity::find_in_tenant(tenant_id);
        if let Some(material_id) = filter.material_id {
            query = query.filter(inventory_transaction::Column::MaterialId.eq(material_id));
        }
        if let Some(kind) = filter.transaction_type {
            query = query.filter(inventory_transaction::Column::TransactionType.eq(kind));
        }
        if let Some(reference_type) = filter.reference_type {
            query = query.filter(inventory_transaction::Column::ReferenceType.eq(reference_type));
        }
        if let Some(from) = filter.from {
            query = query.filter(inventory_transaction::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(inventory_transaction::Column::CreatedAt.lte(to));
        }

        let paginator = query
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((items, total))
    }

    /// Ledger of one material, including materials that were soft-deleted
    pub async fn material_transactions(
        &self,
        tenant_id: Uuid,
        material_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_transaction::Model>, u64), ServiceError> {
        crate::services::materials::find_material_any(self.db_pool.as_ref(), tenant_id, material_id)
            .await?;
        self.list_transactions(
            tenant_id,
            LedgerFilter {
                material_id: Some(material_id),
                ..Default::default()
            },
            page,
            per_page,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn input(kind: TransactionType, quantity: Decimal) -> AdjustStockInput {
        AdjustStockInput {
            transaction_type: kind,
            quantity,
            reason: None,
            notes: None,
            reference_type: None,
            reference_id: None,
            performed_by: None,
        }
    }

    #[test]
    fn signed_change_follows_transaction_type() {
        assert_eq!(
            input(TransactionType::Restock, dec!(5)).signed_change().unwrap(),
            dec!(5)
        );
        assert_eq!(
            input(TransactionType::Deduction, dec!(5)).signed_change().unwrap(),
            dec!(-5)
        );
        assert_eq!(
            input(TransactionType::Adjustment, dec!(-3)).signed_change().unwrap(),
            dec!(-3)
        );
    }

    #[test]
    fn negative_restock_or_deduction_is_rejected() {
        assert_matches!(
            input(TransactionType::Restock, dec!(-1)).signed_change(),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            input(TransactionType::Deduction, dec!(-1)).signed_change(),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn zero_quantity_fails_validation() {
        assert!(input(TransactionType::Adjustment, dec!(0)).validate().is_err());
    }

    #[test]
    fn next_stock_level_guards_range_and_sign() {
        assert_eq!(next_stock_level(dec!(10), dec!(-10)), Ok(dec!(0)));
        assert_eq!(
            next_stock_level(dec!(10), dec!(-10.0001)),
            Err(StockLevelError::Negative)
        );
        assert_eq!(
            next_stock_level(dec!(99999999999), dec!(1)),
            Err(StockLevelError::OutOfRange)
        );
        assert_eq!(
            next_stock_level(Decimal::MAX, Decimal::MAX),
            Err(StockLevelError::OutOfRange)
        );
        assert_eq!(
            next_stock_level(dec!(1), dec!(0.00001)),
            Err(StockLevelError::OutOfRange)
        );
    }
}
