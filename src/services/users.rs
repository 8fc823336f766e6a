use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, validate_password_strength, verify_password};
use crate::db::DbPool;
use crate::entities::user::{self, Department, UserRole};
use crate::errors::ServiceError;
use crate::i18n::AuthErrorCode;
use crate::PaginatedResponse;

/// Public view of a staff account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub department: Department,
    pub phone: Option<String>,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            department: model.department,
            phone: model.phone,
            active: model.active,
            last_login_at: model.last_login_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
    pub role: UserRole,
    /// Defaults to the role's home department
    pub department: Option<Department>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    pub department: Option<Department>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

/// Service for staff accounts
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn find(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", id))
    }

    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        validate_password_strength(&request.password)?;

        let email = request.email.trim().to_lowercase();
        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db_pool)
            .await?
            .is_some();
        if taken {
            return Err(ServiceError::Auth(AuthErrorCode::EmailInUse));
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(hash_password(&request.password)?),
            role: Set(request.role),
            department: Set(request
                .department
                .unwrap_or_else(|| request.role.default_department())),
            phone: Set(super::clean(request.phone)),
            active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(user_id = %model.id, "User created");
        Ok(model.into())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserProfile, ServiceError> {
        self.find(id).await.map(Into::into)
    }

    pub async fn list_users(
        &self,
        filter: UserFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<UserProfile>, ServiceError> {
        let mut select = user::Entity::find().order_by_asc(user::Column::Name);
        if let Some(role) = filter.role {
            select = select.filter(user::Column::Role.eq(role));
        }
        if let Some(active) = filter.active {
            select = select.filter(user::Column::Active.eq(active));
        }
        if let Some(search) = super::clean(filter.search) {
            select = select.filter(
                Condition::any()
                    .add(user::Column::Name.contains(search.as_str()))
                    .add(user::Column::Email.contains(search.to_lowercase().as_str())),
            );
        }

        let page_result = super::fetch_page(select, &self.db_pool, page, limit).await?;
        Ok(page_result.map(UserProfile::from))
    }

    /// Active users holding one of `roles`
    pub async fn active_ids_with_roles(&self, roles: &[UserRole]) -> Result<Vec<Uuid>, ServiceError> {
        let users = user::Entity::find()
            .filter(user::Column::Role.is_in(roles.iter().copied()))
            .filter(user::Column::Active.eq(true))
            .all(&*self.db_pool)
            .await?;
        Ok(users.into_iter().map(|u| u.id).collect())
    }

    #[instrument(skip(self, request))]
    pub async fn update_user(
        &self,
        actor_id: Uuid,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let existing = self.find(id).await?;

        if actor_id == id && request.active == Some(false) {
            return Err(ServiceError::InvalidOperation(
                "You cannot deactivate your own account".to_string(),
            ));
        }
        if actor_id == id && request.role.map_or(false, |r| r != existing.role) {
            return Err(ServiceError::InvalidOperation(
                "You cannot change your own role".to_string(),
            ));
        }

        let mut active: user::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if request.phone.is_some() {
            active.phone = Set(super::clean(request.phone));
        }
        if let Some(role) = request.role {
            active.role = Set(role);
        }
        if let Some(department) = request.department {
            active.department = Set(department);
        }
        if let Some(flag) = request.active {
            active.active = Set(flag);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db_pool).await?;
        info!(user_id = %id, "User updated");
        Ok(model.into())
    }

    pub async fn reset_password(&self, id: Uuid, new_password: &str) -> Result<(), ServiceError> {
        validate_password_strength(new_password)?;
        let existing = self.find(id).await?;
        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(hash_password(new_password)?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db_pool).await?;
        info!(user_id = %id, "Password reset");
        Ok(())
    }

    pub async fn change_password(
        &self,
        id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let existing = self.find(id).await?;
        if !verify_password(current_password, &existing.password_hash)? {
            warn!(user_id = %id, "Password change refused: wrong current password");
            return Err(ServiceError::Auth(AuthErrorCode::InvalidCredentials));
        }
        self.reset_password(id, new_password).await
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, actor_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        if actor_id == id {
            return Err(ServiceError::InvalidOperation(
                "You cannot delete your own account".to_string(),
            ));
        }
        let result = user::Entity::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("user", id));
        }
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}
