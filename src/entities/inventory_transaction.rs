use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::QueryFilter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kinds of stock ledger entries
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionType {
    /// Signed correction of the counted stock
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    /// Stock consumed or written off
    #[sea_orm(string_value = "deduction")]
    Deduction,
    /// Stock received
    #[sea_orm(string_value = "restock")]
    Restock,
}

/// Immutable stock ledger row: `quantity_after = quantity_before + quantity_change`
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = InventoryTransaction)]
#[sea_orm(table_name = "inventory_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub material_id: Uuid,
    pub transaction_type: TransactionType,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub quantity_before: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub quantity_change: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub quantity_after: Decimal,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::material::Entity",
        from = "Column::MaterialId",
        to = "super::material::Column::Id",
        on_delete = "Cascade"
    )]
    Material,
}

impl Related<super::material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Material.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    pub fn find_in_tenant(tenant_id: Uuid) -> Select<Entity> {
        Self::find().filter(Column::TenantId.eq(tenant_id))
    }
}
