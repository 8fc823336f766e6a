use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Staff roles. Each role maps to a permission set in `auth::permissions`.
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
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "ceo")]
    Ceo,
    #[sea_orm(string_value = "accountant")]
    Accountant,
    #[sea_orm(string_value = "sales")]
    Sales,
    #[sea_orm(string_value = "designer")]
    Designer,
    #[sea_orm(string_value = "printing")]
    Printing,
    #[sea_orm(string_value = "inventory")]
    Inventory,
}

impl UserRole {
    /// Department a new user of this role belongs to unless told otherwise
    pub fn default_department(&self) -> Department {
        match self {
            UserRole::Admin | UserRole::Ceo => Department::Management,
            UserRole::Accountant => Department::Accounting,
            UserRole::Sales => Department::Sales,
            UserRole::Designer => Department::Design,
            UserRole::Printing => Department::Printing,
            UserRole::Inventory => Department::Inventory,
        }
    }

    /// Roles that see and approve everything
    pub fn is_management(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Ceo)
    }
}

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
pub enum Department {
    #[sea_orm(string_value = "management")]
    Management,
    #[sea_orm(string_value = "sales")]
    Sales,
    #[sea_orm(string_value = "accounting")]
    Accounting,
    #[sea_orm(string_value = "design")]
    Design,
    #[sea_orm(string_value = "printing")]
    Printing,
    #[sea_orm(string_value = "finishing")]
    Finishing,
    #[sea_orm(string_value = "delivery")]
    Delivery,
    #[sea_orm(string_value = "inventory")]
    Inventory,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub department: Department,
    pub phone: Option<String>,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
