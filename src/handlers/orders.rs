use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::{order, order_attachment, order_timeline};
use crate::errors::ServiceError;
use crate::services::orders::{
    AssignOrderRequest, AttachFileRequest, CreateOrderRequest, OrderDetail, OrderFilter,
    UpdateOrderRequest, UpdateStatusRequest,
};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NoteRequest {
    #[validate(length(min = 1, max = 2000, message = "Note cannot be empty"))]
    pub note: String,
}

/// List orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Paginated orders, newest first. Designers and printing staff only see orders assigned to them.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("department" = Option<String>, Query, description = "Filter by owning department"),
        ("assignee_id" = Option<Uuid>, Query, description = "Filter by assigned designer or printer"),
        ("customer_id" = Option<Uuid>, Query, description = "Filter by customer"),
        ("priority" = Option<String>, Query, description = "normal or urgent"),
        ("search" = Option<String>, Query, description = "Matches number, title or customer"),
    ),
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<PaginatedResponse<order::Model>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(page): Query<ListQuery>,
    Query(filter): Query<OrderFilter>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<order::Model>>>, ServiceError> {
    let (page, limit) = page.resolve(&state.config);
    let orders = state
        .services
        .orders
        .list_orders(&auth_user, filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Create a new order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = ApiResponse<order::Model>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<order::Model>>), ServiceError> {
    let order = state
        .services
        .orders
        .create_order(&auth_user, request)
        .await?;
    Ok(super::created(order))
}

/// Get an order with its timeline and attachments
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Order is not assigned to you", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderDetail>>, ServiceError> {
    let detail = state.services.orders.get_order(&auth_user, id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<order::Model>),
        (status = 409, description = "Order was modified concurrently", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let order = state
        .services
        .orders
        .update_order(&auth_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Move an order to another workflow status
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<order::Model>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Status belongs to another department", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order was modified concurrently", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let order = state
        .services
        .orders
        .update_status(&auth_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/assign",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = AssignOrderRequest,
    responses(
        (status = 200, description = "Order assigned", body = ApiResponse<order::Model>),
        (status = 400, description = "Assignee has the wrong role or is inactive", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn assign_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<AssignOrderRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let order = state.services.orders.assign(&auth_user, id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/notes",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = NoteRequest,
    responses((status = 201, description = "Note added", body = ApiResponse<order_timeline::Model>)),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn add_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<NoteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<order_timeline::Model>>), ServiceError> {
    request.validate()?;
    let entry = state
        .services
        .orders
        .add_timeline_note(&auth_user, id, request.note)
        .await?;
    Ok(super::created(entry))
}

/// Link an uploaded file to an order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/attachments",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = AttachFileRequest,
    responses(
        (status = 201, description = "Attachment recorded", body = ApiResponse<order_attachment::Model>),
        (status = 400, description = "Unknown storage key", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn attach_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<AttachFileRequest>,
) -> Result<(StatusCode, Json<ApiResponse<order_attachment::Model>>), ServiceError> {
    let attachment = state
        .services
        .orders
        .attach_file(&auth_user, id, request)
        .await?;
    Ok(super::created(attachment))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/attachments",
    params(("id" = Uuid, Path, description = "Order id")),
    responses((status = 200, description = "Attachments", body = ApiResponse<Vec<order_attachment::Model>>)),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_attachments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<order_attachment::Model>>>, ServiceError> {
    let attachments = state
        .services
        .orders
        .list_attachments(&auth_user, id)
        .await?;
    Ok(Json(ApiResponse::success(attachments)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.orders.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
