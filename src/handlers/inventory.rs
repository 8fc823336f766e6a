use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::{inventory_item, inventory_transaction};
use crate::errors::ServiceError;
use crate::services::inventory::{
    AdjustStockRequest, CreateItemRequest, ItemFilter, UpdateItemRequest,
};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("search" = Option<String>, Query, description = "Matches name or SKU"),
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("low_stock_only" = Option<bool>, Query, description = "Only items at or below their threshold"),
    ),
    responses((status = 200, description = "Stock items", body = ApiResponse<PaginatedResponse<inventory_item::Model>>)),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(page): Query<ListQuery>,
    Query(filter): Query<ItemFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<inventory_item::Model>>>, ServiceError> {
    let (page, limit) = page.resolve(&state.config);
    let items = state
        .services
        .inventory
        .list_items(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    responses((status = 200, description = "Items at or below their reorder threshold", body = ApiResponse<Vec<inventory_item::Model>>)),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn low_stock(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<inventory_item::Model>>>, ServiceError> {
    let items = state.services.inventory.low_stock().await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Stock item", body = ApiResponse<inventory_item::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<inventory_item::Model>>, ServiceError> {
    let item = state.services.inventory.get_item(id).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<inventory_item::Model>),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<inventory_item::Model>>), ServiceError> {
    let item = state.services.inventory.create_item(request).await?;
    Ok(super::created(item))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = UpdateItemRequest,
    responses((status = 200, description = "Item updated", body = ApiResponse<inventory_item::Model>)),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<inventory_item::Model>>, ServiceError> {
    let item = state.services.inventory.update_item(id, request).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Add or consume stock
#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/adjust",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<inventory_item::Model>),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<AdjustStockRequest>,
) -> Result<Json<ApiResponse<inventory_item::Model>>, ServiceError> {
    let item = state
        .services
        .inventory
        .adjust(&auth_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}/transactions",
    params(
        ("id" = Uuid, Path, description = "Item id"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
    ),
    responses((status = 200, description = "Stock movements, newest first", body = ApiResponse<PaginatedResponse<inventory_transaction::Model>>)),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<inventory_transaction::Model>>>, ServiceError> {
    let (page, limit) = page.resolve(&state.config);
    let history = state
        .services
        .inventory
        .transactions(id, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses((status = 204, description = "Item deleted")),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.inventory.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
