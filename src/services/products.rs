use crate::{db::DbPool, entities::product, errors::ServiceError};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255), custom = "super::validators::not_blank")]
    pub name: String,
    #[validate(length(min = 1, max = 100), custom = "super::validators::not_blank")]
    pub sku: String,
    #[serde(default)]
    #[validate(custom = "super::validators::non_negative_decimal")]
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Live product of a tenant, or `NotFound`
pub async fn find_product<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    product_id: Uuid,
) -> Result<product::Model, ServiceError> {
    product::Entity::find_in_tenant(tenant_id)
        .filter(product::Column::Id.eq(product_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        tenant_id: Uuid,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set(input.name.trim().to_string()),
            sku: Set(input.sku.trim().to_string()),
            price: Set(input.price),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)?;

        info!(%tenant_id, product_id = %model.id, sku = %model.sku, "Product created");
        Ok(model)
    }

    pub async fn get(&self, tenant_id: Uuid, product_id: Uuid) -> Result<product::Model, ServiceError> {
        find_product(self.db_pool.as_ref(), tenant_id, product_id).await
    }

    /// Returns one page of products ordered by name, plus the total count
    pub async fn list(
        &self,
        tenant_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let paginator = product::Entity::find_in_tenant(tenant_id)
            .order_by_asc(product::Column::Name)
            .paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((items, total))
    }
}
