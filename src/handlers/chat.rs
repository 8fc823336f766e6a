use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::message;
use crate::errors::ServiceError;
use crate::services::chat::{ChatSummary, CreateGroupRequest, MessageQuery, SendMessageRequest};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenDirectRequest {
    pub user_id: Uuid,
}

/// Chats the caller takes part in, most recent activity first
#[utoipa::path(
    get,
    path = "/api/v1/chats",
    responses((status = 200, description = "Chats with unread counts", body = ApiResponse<Vec<ChatSummary>>)),
    security(("Bearer" = [])),
    tag = "chat"
)]
pub async fn list_chats(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<ChatSummary>>>, ServiceError> {
    let chats = state.services.chat.list_my_chats(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(chats)))
}

/// Open (or reuse) the one-to-one chat with another user
#[utoipa::path(
    post,
    path = "/api/v1/chats/direct",
    request_body = OpenDirectRequest,
    responses(
        (status = 200, description = "Direct chat", body = ApiResponse<ChatSummary>),
        (status = 400, description = "Cannot chat with yourself", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "chat"
)]
pub async fn open_direct(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<OpenDirectRequest>,
) -> Result<Json<ApiResponse<ChatSummary>>, ServiceError> {
    let chat = state
        .services
        .chat
        .open_direct(&auth_user, request.user_id)
        .await?;
    Ok(Json(ApiResponse::success(chat)))
}

#[utoipa::path(
    post,
    path = "/api/v1/chats/groups",
    request_body = CreateGroupRequest,
    responses((status = 201, description = "Group created", body = ApiResponse<ChatSummary>)),
    security(("Bearer" = [])),
    tag = "chat"
)]
pub async fn create_group(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChatSummary>>), ServiceError> {
    let chat = state
        .services
        .chat
        .create_group(&auth_user, request)
        .await?;
    Ok(super::created(chat))
}

#[utoipa::path(
    get,
    path = "/api/v1/chats/{id}/messages",
    params(
        ("id" = Uuid, Path, description = "Chat id"),
        ("before" = Option<String>, Query, description = "RFC 3339 cursor; only older messages"),
        ("limit" = Option<u64>, Query, description = "Maximum messages to return"),
    ),
    responses(
        (status = 200, description = "Messages, newest first", body = ApiResponse<Vec<message::Model>>),
        (status = 403, description = "Not a participant", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "chat"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<message::Model>>>, ServiceError> {
    let messages = state
        .services
        .chat
        .list_messages(auth_user.user_id, id, query, state.config.max_page_size)
        .await?;
    Ok(Json(ApiResponse::success(messages)))
}

#[utoipa::path(
    post,
    path = "/api/v1/chats/{id}/messages",
    params(("id" = Uuid, Path, description = "Chat id")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = ApiResponse<message::Model>),
        (status = 400, description = "Empty text or missing attachment", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not a participant", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "chat"
)]
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<message::Model>>), ServiceError> {
    let message = state
        .services
        .chat
        .send_message(&auth_user, id, request)
        .await?;
    Ok(super::created(message))
}

#[utoipa::path(
    post,
    path = "/api/v1/chats/{id}/read",
    params(("id" = Uuid, Path, description = "Chat id")),
    responses((status = 204, description = "Chat marked read")),
    security(("Bearer" = [])),
    tag = "chat"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<StatusCode, ServiceError> {
    state.services.chat.mark_read(auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v1/chats/{id}/messages/{message_id}",
    params(
        ("id" = Uuid, Path, description = "Chat id"),
        ("message_id" = Uuid, Path, description = "Message id"),
    ),
    responses(
        (status = 204, description = "Message deleted"),
        (status = 403, description = "Only the sender can delete a message", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "chat"
)]
pub async fn delete_message(
    State(state): State<AppState>,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
    auth_user: AuthUser,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .chat
        .delete_message(&auth_user, id, message_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
