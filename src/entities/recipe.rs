use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::QueryFilter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Recipe: how one batch of `yield_quantity` units of a product is made.
/// At most one recipe per product is active.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Recipe)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub yield_quantity: Decimal,
    pub yield_unit: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
    #[sea_orm(has_many = "super::recipe_material::Entity")]
    RecipeMaterials,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::recipe_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeMaterials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    pub fn find_in_tenant(tenant_id: Uuid) -> Select<Entity> {
        Self::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::DeletedAt.is_null())
    }

    /// The active recipe of a product, if any
    pub fn find_active_for_product(tenant_id: Uuid, product_id: Uuid) -> Select<Entity> {
        Self::find_in_tenant(tenant_id)
            .filter(Column::ProductId.eq(product_id))
            .filter(Column::IsActive.eq(true))
    }
}
