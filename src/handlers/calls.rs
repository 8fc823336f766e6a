//! Call signaling endpoints. Clients exchange SDP and ICE candidates through
//! these routes and learn about changes from the live event feed.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::{call, call_candidate};
use crate::errors::ServiceError;
use crate::services::calls::{AddCandidateRequest, AnswerCallRequest, StartCallRequest};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Default, Deserialize)]
pub struct CandidateQuery {
    pub since: Option<DateTime<Utc>>,
}

#[utoipa::path(
    post,
    path = "/api/v1/calls",
    request_body = StartCallRequest,
    responses(
        (status = 201, description = "Call ringing", body = ApiResponse<call::Model>),
        (status = 409, description = "Caller or receiver is busy", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "calls"
)]
pub async fn start_call(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<StartCallRequest>,
) -> Result<(StatusCode, Json<ApiResponse<call::Model>>), ServiceError> {
    let call = state.services.calls.start(&auth_user, request).await?;
    Ok(super::created(call))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
    ),
    responses((status = 200, description = "Call history", body = ApiResponse<PaginatedResponse<call::Model>>)),
    security(("Bearer" = [])),
    tag = "calls"
)]
pub async fn call_history(
    State(state): State<AppState>,
    Query(page): Query<ListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<call::Model>>>, ServiceError> {
    let (page, limit) = page.resolve(&state.config);
    let calls = state
        .services
        .calls
        .history(auth_user.user_id, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(calls)))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls/{id}",
    params(("id" = Uuid, Path, description = "Call id")),
    responses((status = 200, description = "Call", body = ApiResponse<call::Model>)),
    security(("Bearer" = [])),
    tag = "calls"
)]
pub async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<call::Model>>, ServiceError> {
    let call = state.services.calls.get(auth_user.user_id, id).await?;
    Ok(Json(ApiResponse::success(call)))
}

#[utoipa::path(
    post,
    path = "/api/v1/calls/{id}/accept",
    params(("id" = Uuid, Path, description = "Call id")),
    request_body = AnswerCallRequest,
    responses((status = 200, description = "Call connected", body = ApiResponse<call::Model>)),
    security(("Bearer" = [])),
    tag = "calls"
)]
pub async fn accept_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<AnswerCallRequest>,
) -> Result<Json<ApiResponse<call::Model>>, ServiceError> {
    let call = state
        .services
        .calls
        .accept(&auth_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(call)))
}

#[utoipa::path(
    post,
    path = "/api/v1/calls/{id}/reject",
    params(("id" = Uuid, Path, description = "Call id")),
    responses((status = 200, description = "Call rejected", body = ApiResponse<call::Model>)),
    security(("Bearer" = [])),
    tag = "calls"
)]
pub async fn reject_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<call::Model>>, ServiceError> {
    let call = state.services.calls.reject(&auth_user, id).await?;
    Ok(Json(ApiResponse::success(call)))
}

#[utoipa::path(
    post,
    path = "/api/v1/calls/{id}/end",
    params(("id" = Uuid, Path, description = "Call id")),
    responses((status = 200, description = "Call ended", body = ApiResponse<call::Model>)),
    security(("Bearer" = [])),
    tag = "calls"
)]
pub async fn end_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<call::Model>>, ServiceError> {
    let call = state.services.calls.end(&auth_user, id).await?;
    Ok(Json(ApiResponse::success(call)))
}

#[utoipa::path(
    post,
    path = "/api/v1/calls/{id}/candidates",
    params(("id" = Uuid, Path, description = "Call id")),
    request_body = AddCandidateRequest,
    responses((status = 201, description = "Candidate stored", body = ApiResponse<call_candidate::Model>)),
    security(("Bearer" = [])),
    tag = "calls"
)]
pub async fn add_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<AddCandidateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<call_candidate::Model>>), ServiceError> {
    let candidate = state
        .services
        .calls
        .add_candidate(&auth_user, id, request)
        .await?;
    Ok(super::created(candidate))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls/{id}/candidates",
    params(
        ("id" = Uuid, Path, description = "Call id"),
        ("since" = Option<String>, Query, description = "RFC 3339; only newer candidates"),
    ),
    responses((status = 200, description = "The peer's candidates", body = ApiResponse<Vec<call_candidate::Model>>)),
    security(("Bearer" = [])),
    tag = "calls"
)]
pub async fn list_candidates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CandidateQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<call_candidate::Model>>>, ServiceError> {
    let candidates = state
        .services
        .calls
        .candidates(auth_user.user_id, id, query.since)
        .await?;
    Ok(Json(ApiResponse::success(candidates)))
}
