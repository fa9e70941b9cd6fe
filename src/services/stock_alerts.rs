use crate::{
    db::{self, DbPool},
    entities::{
        material,
        stock_alert::{self, AlertStatus, AlertType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone)]
pub struct ResolvedAlert {
    pub previous: AlertStatus,
    pub alert: stock_alert::Model,
}

/// What a stock evaluation changed for one material
#[derive(Debug, Default, Clone)]
pub struct AlertOutcome {
    pub raised: Option<stock_alert::Model>,
    pub resolved: Vec<ResolvedAlert>,
}

impl AlertOutcome {
    pub fn events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        if let Some(alert) = &self.raised {
            events.push(Event::StockAlertRaised {
                tenant_id: alert.tenant_id,
                alert_id: alert.id,
                material_id: alert.material_id,
                alert_type: alert.alert_type,
            });
        }
        for resolved in &self.resolved {
            events.push(Event::StockAlertStatusChanged {
                tenant_id: resolved.alert.tenant_id,
                alert_id: resolved.alert.id,
                old_status: resolved.previous,
                new_status: resolved.alert.status,
                changed_at: resolved.alert.updated_at,
            });
        }
        events
    }
}

fn alert_type_for(stock: Decimal) -> AlertType {
    if stock <= Decimal::ZERO {
        AlertType::OutOfStock
    } else {
        AlertType::LowStock
    }
}

fn alert_message(material: &material::Model, alert_type: AlertType) -> String {
    match alert_type {
        AlertType::OutOfStock => format!("{} ({}) is out of stock", material.name, material.sku),
        AlertType::LowStock => format!(
            "{} ({}) is at {} {}, at or below its reorder level of {}",
            material.name,
            material.sku,
            material.stock_quantity.normalize(),
            material.unit_of_measure,
            material.reorder_level.normalize()
        ),
    }
}

/// Raises or resolves alerts for `material` after its stock changed.
///
/// Runs on the caller's connection so that it commits or rolls back with the
/// stock mutation. A material at or below its reorder level gets one pending
/// alert unless an open one already exists; a material above it has its open
/// alerts resolved by `actor`.
pub async fn evaluate_material<C: ConnectionTrait>(
    conn: &C,
    material: &material::Model,
    actor: Option<Uuid>,
) -> Result<AlertOutcome, ServiceError> {
    let open = stock_alert::Entity::find_open_for_material(material.tenant_id, material.id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let mut outcome = AlertOutcome::default();
    let now = Utc::now();

    if material.stock_quantity <= material.reorder_level {
        if open.is_empty() {
            let alert_type = alert_type_for(material.stock_quantity);
            let alert = stock_alert::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(material.tenant_id),
                material_id: Set(material.id),
                alert_type: Set(alert_type),
                status: Set(AlertStatus::Pending),
                stock_level: Set(material.stock_quantity),
                reorder_level: Set(material.reorder_level),
                message: Set(alert_message(material, alert_type)),
                acknowledged_by: Set(None),
                acknowledged_at: Set(None),
                resolved_by: Set(None),
                resolved_at: Set(None),
                dismissed_by: Set(None),
                dismissed_at: Set(None),
                notes: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(conn)
            .await
            .map_err(ServiceError::db_error)?;

            counter!("stockline_alerts.raised", 1, "type" => alert_type.to_string());
            warn!(
                tenant_id = %material.tenant_id,
                material_id = %material.id,
                alert_id = %alert.id,
                %alert_type,
                "Stock alert raised"
            );
            outcome.raised = Some(alert);
        }
    } else {
        for alert in open {
            let previous = alert.status;
            let mut active = alert.into_active_model();
            active.status = Set(AlertStatus::Resolved);
            active.resolved_by = Set(actor);
            active.resolved_at = Set(Some(now));
            active.updated_at = Set(now);
            let resolved = active.update(conn).await.map_err(ServiceError::db_error)?;
            info!(alert_id = %resolved.id, "Stock alert auto-resolved");
            outcome.resolved.push(ResolvedAlert {
                previous,
                alert: resolved,
            });
        }
    }

    Ok(outcome)
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    pub material_id: Option<Uuid>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate, ToSchema)]
pub struct AlertActionInput {
    pub acted_by: Option<Uuid>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertSummary {
    pub pending: u64,
    pub acknowledged: u64,
    pub resolved: u64,
    pub dismissed: u64,
    pub open_low_stock: u64,
    pub open_out_of_stock: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertScanResult {
    pub materials_checked: usize,
    pub raised: Vec<stock_alert::Model>,
    pub resolved: usize,
}

#[derive(Clone)]
pub struct StockAlertService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl StockAlertService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    pub async fn get(&self, tenant_id: Uuid, alert_id: Uuid) -> Result<stock_alert::Model, ServiceError> {
        find_alert(self.db_pool.as_ref(), tenant_id, alert_id).await
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: AlertFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_alert::Model>, u64), ServiceError> {
        let mut query = stock_alert::Entity::find_in_tenant(tenant_id);
        if let Some(status) = filter.status {
            query = query.filter(stock_alert::Column::Status.eq(status));
        }
        if let Some(alert_type) = filter.alert_type {
            query = query.filter(stock_alert::Column::AlertType.eq(alert_type));
        }
        if let Some(material_id) = filter.material_id {
            query = query.filter(stock_alert::Column::MaterialId.eq(material_id));
        }

        let paginator = query
            .order_by_desc(stock_alert::Column::CreatedAt)
            .paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((items, total))
    }

    pub async fn summary(&self, tenant_id: Uuid) -> Result<AlertSummary, ServiceError> {
        let alerts = stock_alert::Entity::find_in_tenant(tenant_id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let mut summary = AlertSummary {
            pending: 0,
            acknowledged: 0,
            resolved: 0,
            dismissed: 0,
            open_low_stock: 0,
            open_out_of_stock: 0,
        };
        for alert in &alerts {
            match alert.status {
                AlertStatus::Pending => summary.pending += 1,
                AlertStatus::Acknowledged => summary.acknowledged += 1,
                AlertStatus::Resolved => summary.resolved += 1,
                AlertStatus::Dismissed => summary.dismissed += 1,
            }
            if alert.status.is_open() {
                match alert.alert_type {
                    AlertType::LowStock => summary.open_low_stock += 1,
                    AlertType::OutOfStock => summary.open_out_of_stock += 1,
                }
            }
        }
        Ok(summary)
    }

    /// Evaluates every live material of the tenant in one transaction
    #[instrument(skip(self))]
    pub async fn scan(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<AlertScanResult, ServiceError> {
        let outcomes = db::transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let materials = material::Entity::find_in_tenant(tenant_id)
                    .order_by_asc(material::Column::Name)
                    .all(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                let mut outcomes = Vec::with_capacity(materials.len());
                for material in &materials {
                    outcomes.push(evaluate_material(txn, material, actor).await?);
                }
                Ok(outcomes)
            })
        })
        .await?;

        let mut events = Vec::new();
        for outcome in &outcomes {
            events.extend(outcome.events());
        }
        self.event_sender.publish_all(events).await;

        let result = AlertScanResult {
            materials_checked: outcomes.len(),
            resolved: outcomes.iter().map(|o| o.resolved.len()).sum(),
            raised: outcomes.into_iter().filter_map(|o| o.raised).collect(),
        };
        info!(
            %tenant_id,
            checked = result.materials_checked,
            raised = result.raised.len(),
            "Stock alert scan completed"
        );
        Ok(result)
    }

    pub async fn acknowledge(
        &self,
        tenant_id: Uuid,
        alert_id: Uuid,
        input: AlertActionInput,
    ) -> Result<stock_alert::Model, ServiceError> {
        self.transition(tenant_id, alert_id, AlertStatus::Acknowledged, input)
            .await
    }

    pub async fn resolve(
        &self,
        tenant_id: Uuid,
        alert_id: Uuid,
        input: AlertActionInput,
    ) -> Result<stock_alert::Model, ServiceError> {
        self.transition(tenant_id, alert_id, AlertStatus::Resolved, input)
            .await
    }

    pub async fn dismiss(
        &self,
        tenant_id: Uuid,
        alert_id: Uuid,
        input: AlertActionInput,
    ) -> Result<stock_alert::Model, ServiceError> {
        self.transition(tenant_id, alert_id, AlertStatus::Dismissed, input)
            .await
    }

    #[instrument(skip(self, input))]
    async fn transition(
        &self,
        tenant_id: Uuid,
        alert_id: Uuid,
        next: AlertStatus,
        input: AlertActionInput,
    ) -> Result<stock_alert::Model, ServiceError> {
        input.validate()?;

        let (previous, updated) = db::transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let alert = find_alert(txn, tenant_id, alert_id).await?;
                let previous = alert.status;
                if !previous.can_transition_to(next) {
                    return Err(ServiceError::InvalidStatus(format!(
                        "Alert {} cannot move from {} to {}",
                        alert_id, previous, next
                    )));
                }

                let now = Utc::now();
                let mut active = alert.into_active_model();
                active.status = Set(next);
                active.updated_at = Set(now);
                match next {
                    AlertStatus::Acknowledged => {
                        active.acknowledged_by = Set(input.acted_by);
                        active.acknowledged_at = Set(Some(now));
                    }
                    AlertStatus::Resolved => {
                        active.resolved_by = Set(input.acted_by);
                        active.resolved_at = Set(Some(now));
                    }
                    AlertStatus::Dismissed => {
                        active.dismissed_by = Set(input.acted_by);
                        active.dismissed_at = Set(Some(now));
                    }
                    AlertStatus::Pending => {}
                }
                if input.notes.is_some() {
                    active.notes = Set(input.notes);
                }

                let updated = active.update(txn).await.map_err(ServiceError::db_error)?;
                Ok((previous, updated))
            })
        })
        .await?;

        info!(%tenant_id, %alert_id, from = %previous, to = %next, "Stock alert status changed");
        self.event_sender
            .publish_all(vec![Event::StockAlertStatusChanged {
                tenant_id,
                alert_id,
                old_status: previous,
                new_status: updated.status,
                changed_at: updated.updated_at,
            }])
            .await;

        Ok(updated)
    }
}

async fn find_alert<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    alert_id: Uuid,
) -> Result<stock_alert::Model, ServiceError> {
    stock_alert::Entity::find_in_tenant(tenant_id)
        .filter(stock_alert::Column::Id.eq(alert_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Stock alert {} not found", alert_id)))
}
