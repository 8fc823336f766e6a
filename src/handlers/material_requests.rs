use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::material_request;
use crate::errors::ServiceError;
use crate::services::material_requests::{
    CreateMaterialRequest, MaterialRequestFilter, ReviewRequest,
};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[utoipa::path(
    get,
    path = "/api/v1/material-requests",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("department" = Option<String>, Query, description = "Filter by department (managers only)"),
    ),
    responses((status = 200, description = "Material requests", body = ApiResponse<PaginatedResponse<material_request::Model>>)),
    security(("Bearer" = [])),
    tag = "material-requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(page): Query<ListQuery>,
    Query(filter): Query<MaterialRequestFilter>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<material_request::Model>>>, ServiceError> {
    let (page, limit) = page.resolve(&state.config);
    let requests = state
        .services
        .material_requests
        .list(&auth_user, filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(requests)))
}

#[utoipa::path(
    get,
    path = "/api/v1/material-requests/{id}",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Material request", body = ApiResponse<material_request::Model>),
        (status = 403, description = "Belongs to another department", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "material-requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<material_request::Model>>, ServiceError> {
    let request = state
        .services
        .material_requests
        .get(&auth_user, id)
        .await?;
    Ok(Json(ApiResponse::success(request)))
}

/// Ask for materials on behalf of the caller's department
#[utoipa::path(
    post,
    path = "/api/v1/material-requests",
    request_body = CreateMaterialRequest,
    responses((status = 201, description = "Request filed", body = ApiResponse<material_request::Model>)),
    security(("Bearer" = [])),
    tag = "material-requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateMaterialRequest>,
) -> Result<(StatusCode, Json<ApiResponse<material_request::Model>>), ServiceError> {
    let created = state
        .services
        .material_requests
        .create(&auth_user, request)
        .await?;
    Ok(super::created(created))
}

#[utoipa::path(
    post,
    path = "/api/v1/material-requests/{id}/approve",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = ReviewRequest,
    responses((status = 200, description = "Request approved", body = ApiResponse<material_request::Model>)),
    security(("Bearer" = [])),
    tag = "material-requests"
)]
pub async fn approve_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(review): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<material_request::Model>>, ServiceError> {
    let reviewed = state
        .services
        .material_requests
        .approve(&auth_user, id, review.note)
        .await?;
    Ok(Json(ApiResponse::success(reviewed)))
}

#[utoipa::path(
    post,
    path = "/api/v1/material-requests/{id}/reject",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<material_request::Model>),
        (status = 400, description = "A note is required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "material-requests"
)]
pub async fn reject_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(review): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<material_request::Model>>, ServiceError> {
    let reviewed = state
        .services
        .material_requests
        .reject(&auth_user, id, review.note)
        .await?;
    Ok(Json(ApiResponse::success(reviewed)))
}

/// Deliver an approved request, restocking the linked item
#[utoipa::path(
    post,
    path = "/api/v1/material-requests/{id}/fulfil",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request fulfilled", body = ApiResponse<material_request::Model>),
        (status = 400, description = "Request is not approved", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "material-requests"
)]
pub async fn fulfil_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<material_request::Model>>, ServiceError> {
    let fulfilled = state
        .services
        .material_requests
        .fulfil(&auth_user, id)
        .await?;
    Ok(Json(ApiResponse::success(fulfilled)))
}

#[utoipa::path(
    post,
    path = "/api/v1/material-requests/{id}/cancel",
    params(("id" = Uuid, Path, description = "Request id")),
    responses((status = 200, description = "Request cancelled", body = ApiResponse<material_request::Model>)),
    security(("Bearer" = [])),
    tag = "material-requests"
)]
pub async fn cancel_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<material_request::Model>>, ServiceError> {
    let cancelled = state
        .services
        .material_requests
        .cancel(&auth_user, id)
        .await?;
    Ok(Json(ApiResponse::success(cancelled)))
}
