use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::chat::{self, ChatKind};
use crate::entities::message::{self, MessageKind};
use crate::entities::{chat_participant, user};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::storage::validate_key;

const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Group name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "A group needs at least one other member"))]
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    #[serde(default = "default_kind")]
    pub kind: MessageKind,
    pub body: Option<String>,
    /// Storage key of an uploaded voice note, image or file
    pub attachment_key: Option<String>,
    pub duration_secs: Option<i32>,
}

fn default_kind() -> MessageKind {
    MessageKind::Text
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageQuery {
    /// Only messages older than this instant
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

/// A chat as seen by one participant
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatSummary {
    pub chat: chat::Model,
    pub participant_ids: Vec<Uuid>,
    pub unread_count: u64,
}

/// Canonical key for the direct chat between two users.
pub fn direct_key(a: Uuid, b: Uuid) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{}:{}", low, high)
}

fn preview(kind: MessageKind, body: Option<&str>) -> String {
    match kind {
        MessageKind::Text => body.unwrap_or_default().chars().take(PREVIEW_CHARS).collect(),
        MessageKind::Voice => "Voice message".to_string(),
        MessageKind::Image => "Image".to_string(),
        MessageKind::File => "File".to_string(),
    }
}

#[derive(Clone)]
pub struct ChatService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl ChatService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn participant_ids(&self, chat_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        Ok(chat_participant::Entity::find()
            .filter(chat_participant::Column::ChatId.eq(chat_id))
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .map(|p| p.user_id)
            .collect())
    }

    /// Loads the chat and the caller's membership, `Forbidden` for outsiders.
    async fn membership(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<(chat::Model, chat_participant::Model), ServiceError> {
        let chat = chat::Entity::find_by_id(chat_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("chat", chat_id))?;
        let participant = chat_participant::Entity::find_by_id((chat_id, user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::Forbidden("You are not in this chat".to_string()))?;
        Ok((chat, participant))
    }

    async fn summarize(&self, chat: chat::Model, me: &chat_participant::Model) -> Result<ChatSummary, ServiceError> {
        let participant_ids = self.participant_ids(chat.id).await?;
        let mut unread = message::Entity::find()
            .filter(message::Column::ChatId.eq(chat.id))
            .filter(message::Column::SenderId.ne(me.user_id))
            .filter(message::Column::Deleted.eq(false));
        if let Some(read_at) = me.last_read_at {
            unread = unread.filter(message::Column::CreatedAt.gt(read_at));
        }
        let unread_count = unread.count(&*self.db_pool).await?;
        Ok(ChatSummary {
            chat,
            participant_ids,
            unread_count,
        })
    }

    async fn ensure_active_users(&self, ids: &[Uuid]) -> Result<(), ServiceError> {
        let found = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .filter(user::Column::Active.eq(true))
            .count(&*self.db_pool)
            .await?;
        if found as usize != ids.len() {
            return Err(ServiceError::ValidationError(
                "Every member must be an active user".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the existing direct chat with `other` or opens one.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn open_direct(&self, actor: &AuthUser, other: Uuid) -> Result<ChatSummary, ServiceError> {
        if other == actor.user_id {
            return Err(ServiceError::InvalidOperation(
                "You cannot start a chat with yourself".to_string(),
            ));
        }
        self.ensure_active_users(&[other]).await?;

        let key = direct_key(actor.user_id, other);
        let existing = chat::Entity::find()
            .filter(chat::Column::DirectKey.eq(key.as_str()))
            .one(&*self.db_pool)
            .await?;
        let chat = match existing {
            Some(chat) => chat,
            None => {
                let now = Utc::now();
                let txn = self.db_pool.begin().await?;
                let chat = chat::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    kind: Set(ChatKind::Direct),
                    name: Set(None),
                    direct_key: Set(Some(key)),
                    created_by: Set(actor.user_id),
                    last_message_at: Set(None),
                    last_message_preview: Set(None),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await?;
                for user_id in [actor.user_id, other] {
                    chat_participant::ActiveModel {
                        chat_id: Set(chat.id),
                        user_id: Set(user_id),
                        last_read_at: Set(None),
                        joined_at: Set(now),
                    }
                    .insert(&txn)
                    .await?;
                }
                txn.commit().await?;
                info!(chat_id = %chat.id, "Direct chat opened");
                chat
            }
        };

        let (chat, me) = self.membership(chat.id, actor.user_id).await?;
        self.summarize(chat, &me).await
    }

    #[instrument(skip(self, actor, request), fields(name = %request.name))]
    pub async fn create_group(
        &self,
        actor: &AuthUser,
        request: CreateGroupRequest,
    ) -> Result<ChatSummary, ServiceError> {
        request.validate()?;
        let mut members: BTreeSet<Uuid> = request.member_ids.into_iter().collect();
        members.remove(&actor.user_id);
        if members.is_empty() {
            return Err(ServiceError::ValidationError(
                "A group needs at least one other member".to_string(),
            ));
        }
        let members: Vec<Uuid> = members.into_iter().collect();
        self.ensure_active_users(&members).await?;

        let now = Utc::now();
        let txn = self.db_pool.begin().await?;
        let chat = chat::ActiveModel {
            id: Set(Uuid::new_v4()),
            kind: Set(ChatKind::Group),
            name: Set(Some(request.name.trim().to_string())),
            direct_key: Set(None),
            created_by: Set(actor.user_id),
            last_message_at: Set(None),
            last_message_preview: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;
        for user_id in std::iter::once(actor.user_id).chain(members) {
            chat_participant::ActiveModel {
                chat_id: Set(chat.id),
                user_id: Set(user_id),
                last_read_at: Set(None),
                joined_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!(chat_id = %chat.id, "Group chat created");
        let (chat, me) = self.membership(chat.id, actor.user_id).await?;
        self.summarize(chat, &me).await
    }

    /// The caller's chats, most recently active first.
    pub async fn list_my_chats(&self, user_id: Uuid) -> Result<Vec<ChatSummary>, ServiceError> {
        let memberships = chat_participant::Entity::find()
            .filter(chat_participant::Column::UserId.eq(user_id))
            .all(&*self.db_pool)
            .await?;

        let mut summaries = Vec::with_capacity(memberships.len());
        for me in memberships {
            if let Some(chat) = chat::Entity::find_by_id(me.chat_id)
                .one(&*self.db_pool)
                .await?
            {
                summaries.push(self.summarize(chat, &me).await?);
            }
        }
        summaries.sort_by(|a, b| {
            let a_at = a.chat.last_message_at.unwrap_or(a.chat.created_at);
            let b_at = b.chat.last_message_at.unwrap_or(b.chat.created_at);
            b_at.cmp(&a_at)
        });
        Ok(summaries)
    }

    #[instrument(skip(self, actor, request), fields(chat_id = %chat_id, kind = %request.kind))]
    pub async fn send_message(
        &self,
        actor: &AuthUser,
        chat_id: Uuid,
        request: SendMessageRequest,
    ) -> Result<message::Model, ServiceError> {
        let (chat, _) = self.membership(chat_id, actor.user_id).await?;

        let body = super::clean(request.body);
        let attachment_key = super::clean(request.attachment_key);
        match request.kind {
            MessageKind::Text if body.is_none() => {
                return Err(ServiceError::ValidationError(
                    "Message text cannot be empty".to_string(),
                ))
            }
            MessageKind::Voice | MessageKind::Image | MessageKind::File => match &attachment_key {
                Some(key) => validate_key(key)?,
                None => {
                    return Err(ServiceError::ValidationError(format!(
                        "A {} message needs an attachment",
                        request.kind
                    )))
                }
            },
            _ => {}
        }
        if request.duration_secs.map_or(false, |d| d < 0) {
            return Err(ServiceError::ValidationError(
                "Duration cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let txn = self.db_pool.begin().await?;
        let model = message::ActiveModel {
            id: Set(Uuid::new_v4()),
            chat_id: Set(chat_id),
            sender_id: Set(actor.user_id),
            kind: Set(request.kind),
            body: Set(body.clone()),
            attachment_key: Set(attachment_key),
            duration_secs: Set(request.duration_secs),
            deleted: Set(false),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut chat_active: chat::ActiveModel = chat.into();
        chat_active.last_message_at = Set(Some(now));
        chat_active.last_message_preview = Set(Some(preview(request.kind, body.as_deref())));
        chat_active.update(&txn).await?;

        // the sender has read everything up to their own message
        let mut me = chat_participant::ActiveModel {
            chat_id: Set(chat_id),
            user_id: Set(actor.user_id),
            ..Default::default()
        };
        me.last_read_at = Set(Some(now));
        me.update(&txn).await?;
        txn.commit().await?;

        let recipients = self.participant_ids(chat_id).await?;
        debug!(message_id = %model.id, recipients = recipients.len(), "Message stored");
        self.event_sender
            .publish(Event::MessageSent {
                chat_id,
                message_id: model.id,
                sender_id: actor.user_id,
                recipients,
            })
            .await;
        Ok(model)
    }

    /// Newest first; pass the oldest `created_at` seen as `before` for the next page.
    pub async fn list_messages(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        query: MessageQuery,
        max_limit: u64,
    ) -> Result<Vec<message::Model>, ServiceError> {
        self.membership(chat_id, user_id).await?;
        let mut select = message::Entity::find()
            .filter(message::Column::ChatId.eq(chat_id))
            .order_by_desc(message::Column::CreatedAt)
            .limit(query.limit.unwrap_or(max_limit).clamp(1, max_limit));
        if let Some(before) = query.before {
            select = select.filter(message::Column::CreatedAt.lt(before));
        }

        let mut messages = select.all(&*self.db_pool).await?;
        for m in messages.iter_mut().filter(|m| m.deleted) {
            m.body = None;
            m.attachment_key = None;
        }
        Ok(messages)
    }

    pub async fn mark_read(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), ServiceError> {
        let (_, me) = self.membership(chat_id, user_id).await?;
        let mut active: chat_participant::ActiveModel = me.into();
        active.last_read_at = Set(Some(Utc::now()));
        active.update(&*self.db_pool).await?;
        Ok(())
    }

    /// Soft delete; the row stays so history keeps its shape.
    #[instrument(skip(self, actor))]
    pub async fn delete_message(
        &self,
        actor: &AuthUser,
        chat_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.membership(chat_id, actor.user_id).await?;
        let existing = message::Entity::find_by_id(message_id)
            .one(&*self.db_pool)
            .await?
            .filter(|m| m.chat_id == chat_id)
            .ok_or_else(|| ServiceError::not_found("message", message_id))?;
        if existing.sender_id != actor.user_id {
            return Err(ServiceError::Forbidden(
                "Only the sender can delete a message".to_string(),
            ));
        }
        if existing.deleted {
            return Ok(());
        }

        let txn = self.db_pool.begin().await?;
        let mut active: message::ActiveModel = existing.into();
        active.deleted = Set(true);
        active.update(&txn).await?;

        // the chat list preview follows the newest message still visible
        let latest = message::Entity::find()
            .filter(message::Column::ChatId.eq(chat_id))
            .filter(message::Column::Deleted.eq(false))
            .order_by_desc(message::Column::CreatedAt)
            .one(&txn)
            .await?;
        let chat_active = chat::ActiveModel {
            id: Set(chat_id),
            last_message_preview: Set(latest.map(|m| preview(m.kind, m.body.as_deref()))),
            ..Default::default()
        };
        chat_active.update(&txn).await?;
        txn.commit().await?;
        debug!(%message_id, "Message deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_key_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(direct_key(a, b), direct_key(b, a));
        assert_ne!(direct_key(a, b), direct_key(a, Uuid::new_v4()));
    }

    #[test]
    fn previews_hide_media_and_truncate_text() {
        assert_eq!(preview(MessageKind::Voice, None), "Voice message");
        let long = "x".repeat(200);
        assert_eq!(preview(MessageKind::Text, Some(&long)).chars().count(), PREVIEW_CHARS);
    }
}
