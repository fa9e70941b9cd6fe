use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One component line of a recipe
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = RecipeMaterial)]
#[sea_orm(table_name = "recipe_materials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub recipe_id: Uuid,
    pub material_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub quantity_required: Decimal,
    pub unit: String,
    /// Expected loss, 0 to 100
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub waste_percentage: Decimal,
    /// Position within the recipe; the bottleneck tie-break follows this order
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id",
        on_delete = "Cascade"
    )]
    Recipe,
    #[sea_orm(
        belongs_to = "super::material::Entity",
        from = "Column::MaterialId",
        to = "super::material::Column::Id",
        on_delete = "Restrict"
    )]
    Material,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl Related<super::material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Material.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// Components of a recipe in recipe order
    pub fn find_for_recipe(tenant_id: Uuid, recipe_id: Uuid) -> Select<Entity> {
        Self::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::RecipeId.eq(recipe_id))
            .order_by_asc(Column::SortOrder)
            .order_by_asc(Column::CreatedAt)
    }
}
