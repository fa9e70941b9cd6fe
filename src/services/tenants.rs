use crate::{db::DbPool, entities::tenant, errors::ServiceError};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTenantInput {
    #[validate(length(min = 1, max = 255), custom = "super::validators::not_blank")]
    pub name: String,
    #[validate(length(min = 1, max = 100), custom = "super::validators::slug")]
    pub slug: String,
}

/// Registry of tenants
#[derive(Clone)]
pub struct TenantService {
    db_pool: Arc<DbPool>,
}

impl TenantService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: CreateTenantInput) -> Result<tenant::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let model = tenant::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            slug: Set(input.slug),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)?;

        info!(tenant_id = %model.id, "Tenant created");
        Ok(model)
    }

    pub async fn get(&self, tenant_id: Uuid) -> Result<tenant::Model, ServiceError> {
        tenant::Entity::find_by_id(tenant_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Tenant {} not found", tenant_id)))
    }

    pub async fn exists(&self, tenant_id: Uuid) -> Result<bool, ServiceError> {
        let count = tenant::Entity::find_by_id(tenant_id)
            .count(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(count > 0)
    }
}
