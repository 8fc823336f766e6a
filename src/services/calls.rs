//! Voice call signaling. The server stores the offer, answer and ICE
//! candidates; media flows peer to peer.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::call::{self, CallStatus};
use crate::entities::{call_candidate, user};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::PaginatedResponse;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StartCallRequest {
    pub receiver_id: Uuid,
    #[validate(length(min = 1, message = "An SDP offer is required"))]
    pub offer_sdp: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AnswerCallRequest {
    #[validate(length(min = 1, message = "An SDP answer is required"))]
    pub answer_sdp: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddCandidateRequest {
    #[validate(length(min = 1, message = "Candidate cannot be empty"))]
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<i32>,
}

#[derive(Clone)]
pub struct CallService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl CallService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn find(&self, id: Uuid) -> Result<call::Model, ServiceError> {
        call::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("call", id))
    }

    async fn find_for(&self, id: Uuid, user_id: Uuid) -> Result<call::Model, ServiceError> {
        let call = self.find(id).await?;
        if !call.involves(user_id) {
            return Err(ServiceError::Forbidden(
                "You are not part of this call".to_string(),
            ));
        }
        Ok(call)
    }

    async fn in_live_call(&self, user_id: Uuid) -> Result<bool, ServiceError> {
        let live = call::Entity::find()
            .filter(call::Column::Status.is_in([CallStatus::Ringing, CallStatus::Ongoing]))
            .filter(
                Condition::any()
                    .add(call::Column::CallerId.eq(user_id))
                    .add(call::Column::ReceiverId.eq(user_id)),
            )
            .one(&*self.db_pool)
            .await?;
        Ok(live.is_some())
    }

    async fn publish(&self, call: &call::Model) {
        self.event_sender
            .publish(Event::CallUpdated {
                call_id: call.id,
                status: call.status,
                caller_id: call.caller_id,
                receiver_id: call.receiver_id,
            })
            .await;
    }

    /// Writes `active` only while the call is still in `expected`, so a
    /// concurrent answer, hang-up or expiry is never overwritten.
    async fn transition(
        &self,
        id: Uuid,
        expected: CallStatus,
        active: call::ActiveModel,
    ) -> Result<call::Model, ServiceError> {
        call::Entity::update(active)
            .filter(call::Column::Status.eq(expected))
            .exec(&*self.db_pool)
            .await
            .map_err(|err| match err {
                DbErr::RecordNotUpdated => ServiceError::InvalidStatus(format!(
                    "Call {id} is no longer {expected}"
                )),
                other => ServiceError::DatabaseError(other),
            })
    }

    #[instrument(skip(self, actor, request), fields(caller = %actor.user_id, receiver = %request.receiver_id))]
    pub async fn start(
        &self,
        actor: &AuthUser,
        request: StartCallRequest,
    ) -> Result<call::Model, ServiceError> {
        request.validate()?;
        if request.receiver_id == actor.user_id {
            return Err(ServiceError::InvalidOperation(
                "You cannot call yourself".to_string(),
            ));
        }
        let receiver = user::Entity::find_by_id(request.receiver_id)
            .one(&*self.db_pool)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| ServiceError::not_found("user", request.receiver_id))?;

        if self.in_live_call(actor.user_id).await? {
            return Err(ServiceError::Conflict(
                "You are already in a call".to_string(),
            ));
        }
        if self.in_live_call(receiver.id).await? {
            return Err(ServiceError::Conflict(format!("{} is busy", receiver.name)));
        }

        let model = call::ActiveModel {
            id: Set(Uuid::new_v4()),
            caller_id: Set(actor.user_id),
            receiver_id: Set(receiver.id),
            status: Set(CallStatus::Ringing),
            offer_sdp: Set(request.offer_sdp),
            answer_sdp: Set(None),
            end_reason: Set(None),
            started_at: Set(Utc::now()),
            answered_at: Set(None),
            ended_at: Set(None),
        }
        .insert(&*self.db_pool)
        .await?;

        crate::metrics::record_call_started();
        info!(call_id = %model.id, "Call ringing");
        self.publish(&model).await;
        Ok(model)
    }

    #[instrument(skip(self, actor, request))]
    pub async fn accept(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: AnswerCallRequest,
    ) -> Result<call::Model, ServiceError> {
        request.validate()?;
        let existing = self.find_for(id, actor.user_id).await?;
        if existing.receiver_id != actor.user_id {
            return Err(ServiceError::Forbidden(
                "Only the receiver can answer a call".to_string(),
            ));
        }
        if existing.status != CallStatus::Ringing {
            return Err(ServiceError::InvalidStatus(format!(
                "Call is {}, not ringing",
                existing.status
            )));
        }

        let mut active: call::ActiveModel = existing.into();
        active.status = Set(CallStatus::Ongoing);
        active.answer_sdp = Set(Some(request.answer_sdp));
        active.answered_at = Set(Some(Utc::now()));
        let model = self.transition(id, CallStatus::Ringing, active).await?;

        info!(call_id = %id, "Call answered");
        self.publish(&model).await;
        Ok(model)
    }

    #[instrument(skip(self, actor))]
    pub async fn reject(&self, actor: &AuthUser, id: Uuid) -> Result<call::Model, ServiceError> {
        let existing = self.find_for(id, actor.user_id).await?;
        if existing.receiver_id != actor.user_id {
            return Err(ServiceError::Forbidden(
                "Only the receiver can reject a call".to_string(),
            ));
        }
        if existing.status != CallStatus::Ringing {
            return Err(ServiceError::InvalidStatus(format!(
                "Call is {}, not ringing",
                existing.status
            )));
        }

        let mut active: call::ActiveModel = existing.into();
        active.status = Set(CallStatus::Rejected);
        active.end_reason = Set(Some("rejected".to_string()));
        active.ended_at = Set(Some(Utc::now()));
        let model = self.transition(id, CallStatus::Ringing, active).await?;

        self.publish(&model).await;
        Ok(model)
    }

    /// Either party hangs up. A call that never connected ends as `cancelled`.
    #[instrument(skip(self, actor))]
    pub async fn end(&self, actor: &AuthUser, id: Uuid) -> Result<call::Model, ServiceError> {
        let existing = self.find_for(id, actor.user_id).await?;
        let from = existing.status;
        let reason = match from {
            CallStatus::Ringing => "cancelled",
            CallStatus::Ongoing => "hangup",
            other => {
                return Err(ServiceError::InvalidStatus(format!(
                    "Call already finished ({})",
                    other
                )))
            }
        };

        let mut active: call::ActiveModel = existing.into();
        active.status = Set(CallStatus::Ended);
        active.end_reason = Set(Some(reason.to_string()));
        active.ended_at = Set(Some(Utc::now()));
        let model = self.transition(id, from, active).await?;

        info!(call_id = %id, reason, "Call ended");
        self.publish(&model).await;
        Ok(model)
    }

    pub async fn add_candidate(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: AddCandidateRequest,
    ) -> Result<call_candidate::Model, ServiceError> {
        request.validate()?;
        let existing = self.find_for(id, actor.user_id).await?;
        if !existing.status.is_live() {
            return Err(ServiceError::InvalidStatus(format!(
                "Call is {}",
                existing.status
            )));
        }

        let model = call_candidate::ActiveModel {
            id: Set(Uuid::new_v4()),
            call_id: Set(id),
            sender_id: Set(actor.user_id),
            candidate: Set(request.candidate),
            sdp_mid: Set(request.sdp_mid),
            sdp_mline_index: Set(request.sdp_mline_index),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;

        self.event_sender
            .publish(Event::CallCandidateAdded {
                call_id: id,
                recipient_id: existing.peer_of(actor.user_id),
            })
            .await;
        Ok(model)
    }

    /// Candidates sent by the other party, oldest first.
    pub async fn candidates(
        &self,
        user_id: Uuid,
        id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<call_candidate::Model>, ServiceError> {
        let call = self.find_for(id, user_id).await?;
        let mut select = call_candidate::Entity::find()
            .filter(call_candidate::Column::CallId.eq(id))
            .filter(call_candidate::Column::SenderId.eq(call.peer_of(user_id)))
            .order_by_asc(call_candidate::Column::CreatedAt);
        if let Some(since) = since {
            select = select.filter(call_candidate::Column::CreatedAt.gt(since));
        }
        Ok(select.all(&*self.db_pool).await?)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<call::Model, ServiceError> {
        self.find_for(id, user_id).await
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<call::Model>, ServiceError> {
        let select = call::Entity::find()
            .filter(
                Condition::any()
                    .add(call::Column::CallerId.eq(user_id))
                    .add(call::Column::ReceiverId.eq(user_id)),
            )
            .order_by_desc(call::Column::StartedAt);
        super::fetch_page(select, &self.db_pool, page, limit).await
    }

    /// Marks calls still ringing after `timeout` as missed.
    #[instrument(skip(self))]
    pub async fn expire_unanswered(
        &self,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<u64, ServiceError> {
        let stale = call::Entity::find()
            .filter(call::Column::Status.eq(CallStatus::Ringing))
            .filter(call::Column::StartedAt.lt(now - timeout))
            .all(&*self.db_pool)
            .await?;

        let mut expired = 0;
        for existing in stale {
            if self.mark_missed(existing, now).await?.is_some() {
                expired += 1;
            }
        }

        if expired > 0 {
            info!(count = expired, "Unanswered calls marked missed");
        }
        Ok(expired)
    }

    /// Marks a call read as ringing as missed. Returns `None` when it was
    /// answered, rejected or hung up after it was read.
    pub async fn mark_missed(
        &self,
        ringing: call::Model,
        now: DateTime<Utc>,
    ) -> Result<Option<call::Model>, ServiceError> {
        let id = ringing.id;
        let mut active: call::ActiveModel = ringing.into();
        active.status = Set(CallStatus::Missed);
        active.end_reason = Set(Some("no_answer".to_string()));
        active.ended_at = Set(Some(now));

        match self.transition(id, CallStatus::Ringing, active).await {
            Ok(model) => {
                self.publish(&model).await;
                Ok(Some(model))
            }
            Err(ServiceError::InvalidStatus(_)) => {
                debug!(call_id = %id, "Call left ringing before it could expire");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}
