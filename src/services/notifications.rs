use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::notification;
use crate::entities::user::UserRole;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::users::UserService;
use crate::PaginatedResponse;

/// What to tell a user, before it is addressed and stored.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: &'static str,
    pub title: String,
    pub body: String,
    pub link_type: Option<&'static str>,
    pub link_id: Option<Uuid>,
}

impl NewNotification {
    pub fn new(kind: &'static str, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            link_type: None,
            link_id: None,
        }
    }

    pub fn link(mut self, link_type: &'static str, id: Uuid) -> Self {
        self.link_type = Some(link_type);
        self.link_id = Some(id);
        self
    }
}

#[derive(Clone)]
pub struct NotificationService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    users: UserService,
}

impl NotificationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        let users = UserService::new(db_pool.clone());
        Self {
            db_pool,
            event_sender,
            users,
        }
    }

    #[instrument(skip(self, note), fields(kind = note.kind))]
    pub async fn notify_user(
        &self,
        user_id: Uuid,
        note: NewNotification,
    ) -> Result<notification::Model, ServiceError> {
        let model = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            kind: Set(note.kind.to_string()),
            title: Set(note.title),
            body: Set(note.body),
            link_type: Set(note.link_type.map(str::to_string)),
            link_id: Set(note.link_id),
            read_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;

        debug!(notification_id = %model.id, user_id = %user_id, "Notification stored");
        self.event_sender
            .publish(Event::NotificationCreated {
                notification_id: model.id,
                user_id,
            })
            .await;
        Ok(model)
    }

    /// Sends `note` to every active user holding one of `roles`.
    pub async fn notify_roles(
        &self,
        roles: &[UserRole],
        note: NewNotification,
    ) -> Result<usize, ServiceError> {
        let recipients = self.users.active_ids_with_roles(roles).await?;
        for user_id in &recipients {
            self.notify_user(*user_id, note.clone()).await?;
        }
        Ok(recipients.len())
    }

    pub async fn list_mine(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<notification::Model>, ServiceError> {
        let mut select = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt);
        if unread_only {
            select = select.filter(notification::Column::ReadAt.is_null());
        }
        super::fetch_page(select, &self.db_pool, page, limit).await
    }

    pub async fn mark_read(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<notification::Model, ServiceError> {
        let existing = notification::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .filter(|n| n.user_id == user_id)
            .ok_or_else(|| ServiceError::not_found("notification", id))?;
        if existing.read_at.is_some() {
            return Ok(existing);
        }

        let mut active: notification::ActiveModel = existing.into();
        active.read_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Returns how many notifications changed.
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::ReadAt, Expr::value(Some(Utc::now())))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::ReadAt.is_null())
            .exec(&*self.db_pool)
            .await?;
        Ok(result.rows_affected)
    }
}
