use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::Department;

/// Workflow labels an order moves through, from intake to hand-over.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum OrderStatus {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "pending_payment")]
    PendingPayment,
    #[sea_orm(string_value = "pending_design")]
    PendingDesign,
    #[sea_orm(string_value = "in_design")]
    InDesign,
    #[sea_orm(string_value = "design_review")]
    DesignReview,
    #[sea_orm(string_value = "awaiting_client_approval")]
    AwaitingClientApproval,
    #[sea_orm(string_value = "design_revision")]
    DesignRevision,
    #[sea_orm(string_value = "design_approved")]
    DesignApproved,
    #[sea_orm(string_value = "pending_printing")]
    PendingPrinting,
    #[sea_orm(string_value = "in_printing")]
    InPrinting,
    #[sea_orm(string_value = "printing_complete")]
    PrintingComplete,
    #[sea_orm(string_value = "quality_check")]
    QualityCheck,
    #[sea_orm(string_value = "in_finishing")]
    InFinishing,
    #[sea_orm(string_value = "ready_for_delivery")]
    ReadyForDelivery,
    #[sea_orm(string_value = "out_for_delivery")]
    OutForDelivery,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "returned")]
    Returned,
}

impl OrderStatus {
    /// Department responsible for work while an order sits in this status.
    pub fn department(&self) -> Department {
        use OrderStatus::*;
        match self {
            New | AwaitingClientApproval | OnHold | Cancelled => Department::Sales,
            PendingPayment => Department::Accounting,
            PendingDesign | InDesign | DesignReview | DesignRevision | DesignApproved => {
                Department::Design
            }
            PendingPrinting | InPrinting | PrintingComplete | QualityCheck => {
                Department::Printing
            }
            InFinishing => Department::Finishing,
            ReadyForDelivery | OutForDelivery | Delivered | Completed | Returned => {
                Department::Delivery
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Still on the shop floor: neither terminal nor returned.
    pub fn is_active(&self) -> bool {
        !self.is_terminal() && *self != OrderStatus::Returned
    }

    /// Every status owned by `department`.
    pub fn owned_by(department: Department) -> Vec<OrderStatus> {
        OrderStatus::iter()
            .filter(|s| s.department() == department)
            .collect()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
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
pub enum OrderType {
    #[sea_orm(string_value = "design")]
    Design,
    #[sea_orm(string_value = "printing")]
    Printing,
    #[sea_orm(string_value = "design_and_printing")]
    DesignAndPrinting,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    #[default]
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "orders")]
#[schema(as = Order)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub quotation_id: Option<Uuid>,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub order_type: OrderType,
    pub quantity: i32,
    pub dimensions: Option<String>,
    pub priority: Priority,
    pub status: OrderStatus,
    pub assigned_designer_id: Option<Uuid>,
    pub assigned_printer_id: Option<Uuid>,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::order_timeline::Entity")]
    Timeline,
    #[sea_orm(has_many = "super::order_attachment::Entity")]
    Attachments,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::order_timeline::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timeline.def()
    }
}

impl Related<super::order_attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_department_with_work_owns_a_status() {
        for dept in [
            Department::Sales,
            Department::Accounting,
            Department::Design,
            Department::Printing,
            Department::Finishing,
            Department::Delivery,
        ] {
            assert!(!OrderStatus::owned_by(dept).is_empty(), "{dept}");
        }
        assert!(OrderStatus::owned_by(Department::Management).is_empty());
        assert_eq!(OrderStatus::iter().count(), 20);
    }

    #[test]
    fn serde_and_db_labels_agree() {
        for status in OrderStatus::iter() {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json.as_str().unwrap(), status.to_value());
            assert_eq!(status.to_string(), status.to_value());
        }
    }
}
