use crate::{
    db::{self, DbPool},
    entities::{inventory_transaction::TransactionType, material},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        bom_calculator::{classify_stock, StockStatus, StockThresholds},
        inventory_adjustment_service::{apply_stock_change, StockChange},
        stock_alerts,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMaterialInput {
    #[validate(length(min = 1, max = 255), custom = "super::validators::not_blank")]
    pub name: String,
    #[validate(length(min = 1, max = 100), custom = "super::validators::not_blank")]
    pub sku: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub unit_of_measure: String,
    /// Opening stock, recorded as a restock in the ledger
    #[serde(default)]
    #[validate(custom = "super::validators::non_negative_decimal")]
    pub stock_quantity: Decimal,
    #[serde(default)]
    #[validate(custom = "super::validators::non_negative_decimal")]
    pub reorder_level: Decimal,
    #[serde(default)]
    #[validate(custom = "super::validators::non_negative_decimal")]
    pub unit_cost: Decimal,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub performed_by: Option<Uuid>,
}

/// Partial update; stock levels only change through stock adjustments
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMaterialInput {
    #[validate(length(min = 1, max = 255), custom = "super::validators::not_blank")]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100), custom = "super::validators::not_blank")]
    pub sku: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub unit_of_measure: Option<String>,
    #[validate(custom = "super::validators::non_negative_decimal")]
    pub reorder_level: Option<Decimal>,
    #[validate(custom = "super::validators::non_negative_decimal")]
    pub unit_cost: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub performed_by: Option<Uuid>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MaterialFilter {
    pub category: Option<String>,
    /// Substring match on name or SKU
    pub search: Option<String>,
    pub status: Option<StockStatus>,
}

/// A material with its derived stock figures
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MaterialView {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub unit_of_measure: String,
    pub stock_quantity: Decimal,
    pub reorder_level: Decimal,
    pub unit_cost: Decimal,
    pub description: Option<String>,
    pub stock_status: StockStatus,
    pub stock_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MaterialView {
    pub fn new(model: material::Model, thresholds: StockThresholds) -> Self {
        Self {
            stock_status: classify_stock(model.stock_quantity, model.reorder_level, thresholds),
            stock_value: model.stock_value(),
            id: model.id,
            tenant_id: model.tenant_id,
            name: model.name,
            sku: model.sku,
            category: model.category,
            unit_of_measure: model.unit_of_measure,
            stock_quantity: model.stock_quantity,
            reorder_level: model.reorder_level,
            unit_cost: model.unit_cost,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

/// Live material of a tenant, or `NotFound`
pub async fn find_material<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    material_id: Uuid,
) -> Result<material::Model, ServiceError> {
    material::Entity::find_in_tenant(tenant_id)
        .filter(material::Column::Id.eq(material_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Material {} not found", material_id)))
}

/// Material of a tenant whether or not it was soft-deleted
pub async fn find_material_any<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    material_id: Uuid,
) -> Result<material::Model, ServiceError> {
    material::Entity::find()
        .filter(material::Column::TenantId.eq(tenant_id))
        .filter(material::Column::Id.eq(material_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Material {} not found", material_id)))
}

#[derive(Clone)]
pub struct MaterialService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    thresholds: StockThresholds,
}

impl MaterialService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, thresholds: StockThresholds) -> Self {
        Self {
            db_pool,
            event_sender,
            thresholds,
        }
    }

    pub fn view(&self, model: material::Model) -> MaterialView {
        MaterialView::new(model, self.thresholds)
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create(
        &self,
        tenant_id: Uuid,
        input: CreateMaterialInput,
    ) -> Result<MaterialView, ServiceError> {
        input.validate()?;

        let (model, events) = db::transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let now = Utc::now();
                let created = material::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    tenant_id: Set(tenant_id),
                    name: Set(input.name.trim().to_string()),
                    sku: Set(input.sku.trim().to_string()),
                    category: Set(input.category),
                    unit_of_measure: Set(input.unit_of_measure),
                    stock_quantity: Set(Decimal::ZERO),
                    reorder_level: Set(input.reorder_level),
                    unit_cost: Set(input.unit_cost),
                    description: Set(input.description),
                    created_at: Set(now),
                    updated_at: Set(now),
                    deleted_at: Set(None),
                }
                .insert(txn)
                .await
                .map_err(ServiceError::db_error)?;

                let mut events = vec![Event::MaterialCreated {
                    tenant_id,
                    material_id: created.id,
                }];

                if input.stock_quantity > Decimal::ZERO {
                    let applied = apply_stock_change(
                        txn,
                        created,
                        StockChange {
                            transaction_type: TransactionType::Restock,
                            change: input.stock_quantity,
                            reason: Some("Opening stock".to_string()),
                            notes: None,
                            reference_type: None,
                            reference_id: None,
                            actor: input.performed_by,
                        },
                    )
                    .await?;
                    events.extend(applied.events());
                    return Ok((applied.material, events));
                }

                Ok((created, events))
            })
        })
        .await?;

        info!(%tenant_id, material_id = %model.id, "Material created");
        self.event_sender.publish_all(events).await;
        Ok(self.view(model))
    }

    pub async fn get(&self, tenant_id: Uuid, material_id: Uuid) -> Result<MaterialView, ServiceError> {
        let model = find_material(self.db_pool.as_ref(), tenant_id, material_id).await?;
        Ok(self.view(model))
    }

    /// Filtered listing ordered by name. Stock status is derived, so the
    /// status filter and paging are applied after loading.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: MaterialFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<MaterialView>, u64), ServiceError> {
        let mut query = material::Entity::find_in_tenant(tenant_id);
        if let Some(category) = filter.category.filter(|c| !c.trim().is_empty()) {
            query = query.filter(material::Column::Category.eq(category));
        }
        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                Condition::any()
                    .add(material::Column::Name.like(pattern.clone()))
                    .add(material::Column::Sku.like(pattern)),
            );
        }

        let materials = query
            .order_by_asc(material::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let views: Vec<MaterialView> = materials
            .into_iter()
            .map(|m| self.view(m))
            .filter(|v| filter.status.map_or(true, |s| v.stock_status == s))
            .collect();

        let total = views.len() as u64;
        let offset = (page.saturating_sub(1) * per_page) as usize;
        let items = views
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();
        Ok((items, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        tenant_id: Uuid,
        material_id: Uuid,
        input: UpdateMaterialInput,
    ) -> Result<MaterialView, ServiceError> {
        input.validate()?;

        let (model, events) = db::transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let existing = find_material(txn, tenant_id, material_id).await?;
                let reorder_changed = input
                    .reorder_level
                    .map_or(false, |level| level != existing.reorder_level);

                let mut active = existing.into_active_model();
                if let Some(name) = input.name {
                    active.name = Set(name.trim().to_string());
                }
                if let Some(sku) = input.sku {
                    active.sku = Set(sku.trim().to_string());
                }
                if let Some(category) = input.category {
                    active.category = Set(Some(category));
                }
                if let Some(unit) = input.unit_of_measure {
                    active.unit_of_measure = Set(unit);
                }
                if let Some(level) = input.reorder_level {
                    active.reorder_level = Set(level);
                }
                if let Some(cost) = input.unit_cost {
                    active.unit_cost = Set(cost);
                }
                if let Some(description) = input.description {
                    active.description = Set(Some(description));
                }
                active.updated_at = Set(Utc::now());
                let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                let events = if reorder_changed {
                    stock_alerts::evaluate_material(txn, &updated, input.performed_by)
                        .await?
                        .events()
                } else {
                    Vec::new()
                };
                Ok((updated, events))
            })
        })
        .await?;

        info!(%tenant_id, %material_id, "Material updated");
        self.event_sender.publish_all(events).await;
        Ok(self.view(model))
    }

    /// Soft delete. Recipes that reference the material see zero stock for it.
    #[instrument(skip(self))]
    pub async fn delete(&self, tenant_id: Uuid, material_id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = find_material(db, tenant_id, material_id).await?;
        let mut active = existing.into_active_model();
        let now = Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await.map_err(ServiceError::db_error)?;
        info!(%tenant_id, %material_id, "Material deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn restore(&self, tenant_id: Uuid, material_id: Uuid) -> Result<MaterialView, ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = find_material_any(db, tenant_id, material_id).await?;
        if !existing.is_deleted() {
            return Err(ServiceError::InvalidOperation(format!(
                "Material {} is not deleted",
                material_id
            )));
        }
        let mut active = existing.into_active_model();
        active.deleted_at = Set(None);
        active.updated_at = Set(Utc::now());
        let restored = active.update(db).await.map_err(ServiceError::db_error)?;
        info!(%tenant_id, %material_id, "Material restored");
        Ok(self.view(restored))
    }
}
