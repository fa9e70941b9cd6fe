use crate::{
    db::{self, DbPool},
    entities::{material, recipe, recipe_material},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        bom_calculator::{self, ComponentInput, RecipeCost},
        materials::find_material,
        products::find_product,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ComponentSpec {
    pub material_id: Uuid,
    #[validate(custom = "super::validators::positive_decimal")]
    pub quantity_required: Decimal,
    /// Defaults to the material's unit of measure
    #[validate(length(min = 1, max = 32))]
    pub unit: Option<String>,
    #[serde(default)]
    #[validate(custom = "super::validators::percentage")]
    pub waste_percentage: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRecipeInput {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 255), custom = "super::validators::not_blank")]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "super::validators::positive_decimal")]
    pub yield_quantity: Decimal,
    #[validate(length(min = 1, max = 32))]
    pub yield_unit: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    #[validate]
    pub components: Vec<ComponentSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateRecipeInput {
    #[validate(length(min = 1, max = 255), custom = "super::validators::not_blank")]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "super::validators::positive_decimal")]
    pub yield_quantity: Option<Decimal>,
    #[validate(length(min = 1, max = 32))]
    pub yield_unit: Option<String>,
    /// `true` makes this the product's only active recipe
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateComponentInput {
    #[validate(custom = "super::validators::positive_decimal")]
    pub quantity_required: Option<Decimal>,
    #[validate(length(min = 1, max = 32))]
    pub unit: Option<String>,
    #[validate(custom = "super::validators::percentage")]
    pub waste_percentage: Option<Decimal>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecipeFilter {
    pub product_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComponentView {
    pub id: Uuid,
    pub material_id: Uuid,
    pub material_name: String,
    pub material_sku: String,
    pub material_deleted: bool,
    pub quantity_required: Decimal,
    pub unit: String,
    pub waste_percentage: Decimal,
    pub effective_need: Decimal,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeDetail {
    pub recipe: recipe::Model,
    pub components: Vec<ComponentView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeCostReport {
    pub recipe_id: Uuid,
    pub product_id: Uuid,
    pub recipe_name: String,
    #[serde(flatten)]
    pub cost: RecipeCost,
}

/// Live recipe of a tenant, or `NotFound`
pub async fn find_recipe<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    recipe_id: Uuid,
) -> Result<recipe::Model, ServiceError> {
    recipe::Entity::find_in_tenant(tenant_id)
        .filter(recipe::Column::Id.eq(recipe_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Recipe {} not found", recipe_id)))
}

/// The product's active recipe, or `NotFound`
pub async fn find_active_recipe<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    product_id: Uuid,
) -> Result<recipe::Model, ServiceError> {
    recipe::Entity::find_active_for_product(tenant_id, product_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Product {} has no active recipe", product_id))
        })
}

async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    recipe_id: Uuid,
) -> Result<Vec<(recipe_material::Model, material::Model)>, ServiceError> {
    let lines = recipe_material::Entity::find_for_recipe(tenant_id, recipe_id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let ids: Vec<Uuid> = lines.iter().map(|l| l.material_id).collect();
    let materials: HashMap<Uuid, material::Model> = material::Entity::find()
        .filter(material::Column::TenantId.eq(tenant_id))
        .filter(material::Column::Id.is_in(ids))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    lines
        .into_iter()
        .map(|line| {
            let material = materials.get(&line.material_id).cloned().ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Recipe line {} references missing material {}",
                    line.id, line.material_id
                ))
            })?;
            Ok((line, material))
        })
        .collect()
}

/// Components of a recipe joined with current stock, in recipe order.
///
/// Soft-deleted materials contribute zero stock.
pub async fn load_component_inputs<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    recipe_id: Uuid,
) -> Result<Vec<ComponentInput>, ServiceError> {
    Ok(load_lines(conn, tenant_id, recipe_id)
        .await?
        .into_iter()
        .map(|(line, material)| ComponentInput {
            material_id: material.id,
            stock_quantity: if material.is_deleted() {
                Decimal::ZERO
            } else {
                material.stock_quantity
            },
            material_name: material.name,
            unit: line.unit,
            quantity_required: line.quantity_required,
            waste_percentage: line.waste_percentage,
            unit_cost: material.unit_cost,
        })
        .collect())
}

/// Deactivates every other recipe of the product
async fn deactivate_siblings<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    product_id: Uuid,
    keep: Uuid,
) -> Result<(), ServiceError> {
    recipe::Entity::update_many()
        .col_expr(recipe::Column::IsActive, Expr::value(false))
        .col_expr(recipe::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(recipe::Column::TenantId.eq(tenant_id))
        .filter(recipe::Column::ProductId.eq(product_id))
        .filter(recipe::Column::Id.ne(keep))
        .filter(recipe::Column::IsActive.eq(true))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(())
}

async fn insert_component<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    recipe_id: Uuid,
    spec: ComponentSpec,
    sort_order: i32,
) -> Result<recipe_material::Model, ServiceError> {
    let material = find_material(conn, tenant_id, spec.material_id).await?;
    let now = Utc::now();
    recipe_material::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        recipe_id: Set(recipe_id),
        material_id: Set(material.id),
        quantity_required: Set(spec.quantity_required),
        unit: Set(spec.unit.unwrap_or(material.unit_of_measure)),
        waste_percentage: Set(spec.waste_percentage),
        sort_order: Set(sort_order),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}

/// Recipes, their components, and the product/recipe relationship
#[derive(Clone)]
pub struct RecipeService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl RecipeService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn create(
        &self,
        tenant_id: Uuid,
        input: CreateRecipeInput,
    ) -> Result<RecipeDetail, ServiceError> {
        input.validate()?;

        let mut seen = HashSet::new();
        if let Some(dup) = input.components.iter().find(|c| !seen.insert(c.material_id)) {
            return Err(ServiceError::Conflict(format!(
                "Material {} appears more than once in the recipe",
                dup.material_id
            )));
        }

        let created = db::transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let product = find_product(txn, tenant_id, input.product_id).await?;
                let now = Utc::now();
                let created = recipe::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    tenant_id: Set(tenant_id),
                    product_id: Set(product.id),
                    name: Set(input.name.trim().to_string()),
                    description: Set(input.description),
                    yield_quantity: Set(input.yield_quantity),
                    yield_unit: Set(input.yield_unit),
                    is_active: Set(input.is_active),
                    created_at: Set(now),
                    updated_at: Set(now),
                    deleted_at: Set(None),
                }
                .insert(txn)
                .await
                .map_err(ServiceError::db_error)?;

                if created.is_active {
                    deactivate_siblings(txn, tenant_id, product.id, created.id).await?;
                }

                for (index, spec) in input.components.into_iter().enumerate() {
                    insert_component(txn, tenant_id, created.id, spec, index as i32).await?;
                }
                Ok(created)
            })
        })
        .await?;

        info!(%tenant_id, recipe_id = %created.id, "Recipe created");
        if created.is_active {
            self.publish_activated(&created).await;
        }
        self.get(tenant_id, created.id).await
    }

    pub async fn get(&self, tenant_id: Uuid, recipe_id: Uuid) -> Result<RecipeDetail, ServiceError> {
        let db = self.db_pool.as_ref();
        let recipe = find_recipe(db, tenant_id, recipe_id).await?;
        let components = load_lines(db, tenant_id, recipe_id)
            .await?
            .into_iter()
            .map(|(line, material)| ComponentView {
                id: line.id,
                material_id: material.id,
                material_deleted: material.is_deleted(),
                material_name: material.name,
                material_sku: material.sku,
                effective_need: bom_calculator::effective_need(
                    line.quantity_required,
                    line.waste_percentage,
                ),
                quantity_required: line.quantity_required,
                unit: line.unit,
                waste_percentage: line.waste_percentage,
                sort_order: line.sort_order,
            })
            .collect();
        Ok(RecipeDetail { recipe, components })
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: RecipeFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<recipe::Model>, u64), ServiceError> {
        let mut query = recipe::Entity::find_in_tenant(tenant_id);
        if let Some(product_id) = filter.product_id {
            query = query.filter(recipe::Column::ProductId.eq(product_id));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(recipe::Column::IsActive.eq(is_active));
        }
        let paginator = query
            .order_by_asc(recipe::Column::Name)
            .paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((items, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        tenant_id: Uuid,
        recipe_id: Uuid,
        input: UpdateRecipeInput,
    ) -> Result<RecipeDetail, ServiceError> {
        input.validate()?;

        let (updated, activated) = db::transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let existing = find_recipe(txn, tenant_id, recipe_id).await?;
                let activated = input.is_active == Some(true) && !existing.is_active;
                let product_id = existing.product_id;

                let mut active = existing.into_active_model();
                if let Some(name) = input.name {
                    active.name = Set(name.trim().to_string());
                }
                if let Some(description) = input.description {
                    active.description = Set(Some(description));
                }
                if let Some(yield_quantity) = input.yield_quantity {
                    active.yield_quantity = Set(yield_quantity);
                }
                if let Some(yield_unit) = input.yield_unit {
                    active.yield_unit = Set(yield_unit);
                }
                if let Some(is_active) = input.is_active {
                    active.is_active = Set(is_active);
                }
                active.updated_at = Set(Utc::now());
                let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                if updated.is_active {
                    deactivate_siblings(txn, tenant_id, product_id, updated.id).await?;
                }
                Ok((updated, activated))
            })
        })
        .await?;

        info!(%tenant_id, %recipe_id, "Recipe updated");
        if activated {
            self.publish_activated(&updated).await;
        }
        self.get(tenant_id, recipe_id).await
    }

    /// Soft delete; a deleted recipe is never active
    #[instrument(skip(self))]
    pub async fn delete(&self, tenant_id: Uuid, recipe_id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = find_recipe(db, tenant_id, recipe_id).await?;
        let now = Utc::now();
        let mut active = existing.into_active_model();
        active.is_active = Set(false);
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await.map_err(ServiceError::db_error)?;
        info!(%tenant_id, %recipe_id, "Recipe deleted");
        Ok(())
    }

    /// Makes the recipe its product's only active recipe
    #[instrument(skip(self))]
    pub async fn activate(&self, tenant_id: Uuid, recipe_id: Uuid) -> Result<recipe::Model, ServiceError> {
        let activated = db::transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let existing = find_recipe(txn, tenant_id, recipe_id).await?;
                deactivate_siblings(txn, tenant_id, existing.product_id, existing.id).await?;
                if existing.is_active {
                    return Ok(existing);
                }
                let mut active = existing.into_active_model();
                active.is_active = Set(true);
                active.updated_at = Set(Utc::now());
                active.update(txn).await.map_err(ServiceError::db_error)
            })
        })
        .await?;

        info!(%tenant_id, %recipe_id, product_id = %activated.product_id, "Recipe activated");
        self.publish_activated(&activated).await;
        Ok(activated)
    }

    #[instrument(skip(self, spec))]
    pub async fn add_component(
        &self,
        tenant_id: Uuid,
        recipe_id: Uuid,
        spec: ComponentSpec,
    ) -> Result<recipe_material::Model, ServiceError> {
        spec.validate()?;

        db::transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                find_recipe(txn, tenant_id, recipe_id).await?;
                let lines = recipe_material::Entity::find_for_recipe(tenant_id, recipe_id)
                    .all(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                if lines.iter().any(|l| l.material_id == spec.material_id) {
                    return Err(ServiceError::Conflict(format!(
                        "Material {} is already part of recipe {}",
                        spec.material_id, recipe_id
                    )));
                }
                let next = lines.iter().map(|l| l.sort_order).max().map_or(0, |m| m + 1);
                insert_component(txn, tenant_id, recipe_id, spec, next).await
            })
        })
        .await
    }

    pub async fn update_component(
        &self,
        tenant_id: Uuid,
        recipe_id: Uuid,
        component_id: Uuid,
        input: UpdateComponentInput,
    ) -> Result<recipe_material::Model, ServiceError> {
        input.validate()?;
        let db = self.db_pool.as_ref();
        let existing = self.find_component(tenant_id, recipe_id, component_id).await?;

        let mut active = existing.into_active_model();
        if let Some(quantity) = input.quantity_required {
            active.quantity_required = Set(quantity);
        }
        if let Some(unit) = input.unit {
            active.unit = Set(unit);
        }
        if let Some(waste) = input.waste_percentage {
            active.waste_percentage = Set(waste);
        }
        active.updated_at = Set(Utc::now());
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn remove_component(
        &self,
        tenant_id: Uuid,
        recipe_id: Uuid,
        component_id: Uuid,
    ) -> Result<(), ServiceError> {
        let existing = self.find_component(tenant_id, recipe_id, component_id).await?;
        recipe_material::Entity::delete_by_id(existing.id)
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        info!(%tenant_id, %recipe_id, %component_id, "Recipe component removed");
        Ok(())
    }

    /// Material cost of one batch of the recipe and of one yielded unit
    pub async fn cost(&self, tenant_id: Uuid, recipe_id: Uuid) -> Result<RecipeCostReport, ServiceError> {
        let db = self.db_pool.as_ref();
        let recipe = find_recipe(db, tenant_id, recipe_id).await?;
        let components = load_component_inputs(db, tenant_id, recipe_id).await?;
        let cost = bom_calculator::recipe_cost(&components, recipe.yield_quantity)?;
        Ok(RecipeCostReport {
            recipe_id: recipe.id,
            product_id: recipe.product_id,
            recipe_name: recipe.name,
            cost,
        })
    }

    async fn find_component(
        &self,
        tenant_id: Uuid,
        recipe_id: Uuid,
        component_id: Uuid,
    ) -> Result<recipe_material::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        find_recipe(db, tenant_id, recipe_id).await?;
        recipe_material::Entity::find_for_recipe(tenant_id, recipe_id)
            .filter(recipe_material::Column::Id.eq(component_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Recipe component {} not found", component_id))
            })
    }

    async fn publish_activated(&self, recipe: &recipe::Model) {
        self.event_sender
            .publish_all(vec![Event::RecipeActivated {
                tenant_id: recipe.tenant_id,
                product_id: recipe.product_id,
                recipe_id: recipe.id,
            }])
            .await;
    }
}
