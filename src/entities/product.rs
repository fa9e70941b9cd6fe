use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::QueryFilter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Product entity: the tenant-scoped owner of recipes
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Product)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning tenant
    pub tenant_id: Uuid,

    /// Product name
    pub name: String,

    /// SKU (Stock Keeping Unit), unique per tenant
    pub sku: String,

    /// Selling price
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub price: Decimal,

    /// Is the product active
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Soft delete marker
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
    #[sea_orm(has_many = "super::recipe::Entity")]
    Recipes,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// Live products of one tenant
    pub fn find_in_tenant(tenant_id: Uuid) -> Select<Entity> {
        Self::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::DeletedAt.is_null())
    }
}
