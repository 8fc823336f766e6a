use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallStatus {
    #[sea_orm(string_value = "ringing")]
    Ringing,
    #[sea_orm(string_value = "ongoing")]
    Ongoing,
    #[sea_orm(string_value = "ended")]
    Ended,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "missed")]
    Missed,
}

impl CallStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, CallStatus::Ringing | CallStatus::Ongoing)
    }
}

/// A voice call between two staff members. The server only relays the
/// WebRTC session descriptions and ICE candidates; media flows peer to peer.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "calls")]
#[schema(as = Call)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub caller_id: Uuid,
    pub receiver_id: Uuid,
    pub status: CallStatus,
    #[sea_orm(column_type = "Text")]
    pub offer_sdp: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub answer_sdp: Option<String>,
    pub end_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.caller_id == user_id || self.receiver_id == user_id
    }

    /// The participant on the other end from `user_id`.
    pub fn peer_of(&self, user_id: Uuid) -> Uuid {
        if self.caller_id == user_id {
            self.receiver_id
        } else {
            self.caller_id
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::call_candidate::Entity")]
    Candidates,
}

impl Related<super::call_candidate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Candidates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
