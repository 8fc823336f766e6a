use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::notification;
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkedRead {
    pub updated: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("unread_only" = Option<bool>, Query, description = "Skip notifications already read"),
    ),
    responses((status = 200, description = "Notifications, newest first", body = ApiResponse<PaginatedResponse<notification::Model>>)),
    security(("Bearer" = [])),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(page): Query<ListQuery>,
    Query(query): Query<NotificationQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<notification::Model>>>, ServiceError> {
    let (page, limit) = page.resolve(&state.config);
    let notes = state
        .services
        .notifications
        .list_mine(auth_user.user_id, query.unread_only, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(notes)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses((status = 200, description = "Notification marked read", body = ApiResponse<notification::Model>)),
    security(("Bearer" = [])),
    tag = "notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<notification::Model>>, ServiceError> {
    let note = state
        .services
        .notifications
        .mark_read(auth_user.user_id, id)
        .await?;
    Ok(Json(ApiResponse::success(note)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/read-all",
    responses((status = 200, description = "All notifications marked read", body = ApiResponse<MarkedRead>)),
    security(("Bearer" = [])),
    tag = "notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<MarkedRead>>, ServiceError> {
    let updated = state
        .services
        .notifications
        .mark_all_read(auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(MarkedRead { updated })))
}
