use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::QueryFilter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A raw material held in stock. `stock_quantity` is only changed through the
/// stock ledger so that every change has a matching inventory transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Material)]
#[sea_orm(table_name = "materials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub unit_of_measure: String,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub stock_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub reorder_level: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub unit_cost: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_delete = "Cascade"
    )]
    Tenant,
    #[sea_orm(has_many = "super::recipe_material::Entity")]
    RecipeMaterials,
    #[sea_orm(has_many = "super::inventory_transaction::Entity")]
    InventoryTransactions,
    #[sea_orm(has_many = "super::stock_alert::Entity")]
    StockAlerts,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::recipe_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeMaterials.def()
    }
}

impl Related<super::inventory_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryTransactions.def()
    }
}

impl Related<super::stock_alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockAlerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// Live (not soft-deleted) materials of one tenant
    pub fn find_in_tenant(tenant_id: Uuid) -> Select<Entity> {
        Self::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::DeletedAt.is_null())
    }
}

impl Model {
    /// Total value of the stock on hand
    pub fn stock_value(&self) -> Decimal {
        self.stock_quantity * self.unit_cost
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
