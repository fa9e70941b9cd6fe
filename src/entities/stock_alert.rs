use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::QueryFilter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

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
pub enum AlertType {
    #[sea_orm(string_value = "low_stock")]
    LowStock,
    #[sea_orm(string_value = "out_of_stock")]
    OutOfStock,
}

/// Alert lifecycle. `Resolved` and `Dismissed` are terminal.
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
pub enum AlertStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "acknowledged")]
    Acknowledged,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}

impl AlertStatus {
    /// Statuses that still need attention
    pub const OPEN: [AlertStatus; 2] = [AlertStatus::Pending, AlertStatus::Acknowledged];

    pub fn is_open(self) -> bool {
        Self::OPEN.contains(&self)
    }

    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Pending, AlertStatus::Acknowledged)
                | (AlertStatus::Pending, AlertStatus::Resolved)
                | (AlertStatus::Pending, AlertStatus::Dismissed)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Dismissed)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = StockAlert)]
#[sea_orm(table_name = "stock_alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub material_id: Uuid,
    pub alert_type: AlertType,
    pub status: AlertStatus,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub stock_level: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub reorder_level: Decimal,
    pub message: String,
    pub acknowledged_by: Option<Uuid>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub dismissed_by: Option<Uuid>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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

    /// Pending or acknowledged alerts of one material
    pub fn find_open_for_material(tenant_id: Uuid, material_id: Uuid) -> Select<Entity> {
        Self::find_in_tenant(tenant_id)
            .filter(Column::MaterialId.eq(material_id))
            .filter(Column::Status.is_in(AlertStatus::OPEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AlertStatus::Pending, AlertStatus::Acknowledged, true)]
    #[case(AlertStatus::Pending, AlertStatus::Resolved, true)]
    #[case(AlertStatus::Pending, AlertStatus::Dismissed, true)]
    #[case(AlertStatus::Acknowledged, AlertStatus::Resolved, true)]
    #[case(AlertStatus::Acknowledged, AlertStatus::Dismissed, true)]
    #[case(AlertStatus::Acknowledged, AlertStatus::Pending, false)]
    #[case(AlertStatus::Acknowledged, AlertStatus::Acknowledged, false)]
    #[case(AlertStatus::Resolved, AlertStatus::Dismissed, false)]
    #[case(AlertStatus::Dismissed, AlertStatus::Acknowledged, false)]
    #[case(AlertStatus::Resolved, AlertStatus::Pending, false)]
    fn alert_transitions(
        #[case] from: AlertStatus,
        #[case] to: AlertStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn statuses_render_snake_case() {
        assert_eq!(AlertStatus::Acknowledged.to_string(), "acknowledged");
        assert_eq!(AlertType::OutOfStock.to_string(), "out_of_stock");
        assert_eq!(
            serde_json::to_value(AlertType::LowStock).unwrap(),
            serde_json::json!("low_stock")
        );
    }
}
