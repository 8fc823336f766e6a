use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::{order, quotation};
use crate::errors::ServiceError;
use crate::services::quotations::{
    ConvertQuotationRequest, CreateQuotationRequest, QuotationDetail, QuotationFilter,
    UpdateQuotationRequest,
};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectQuotationRequest {
    pub reason: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/quotations",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("customer_id" = Option<Uuid>, Query, description = "Filter by customer"),
        ("search" = Option<String>, Query, description = "Matches number, title or customer"),
    ),
    responses((status = 200, description = "Quotations", body = ApiResponse<PaginatedResponse<quotation::Model>>)),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn list_quotations(
    State(state): State<AppState>,
    Query(page): Query<ListQuery>,
    Query(filter): Query<QuotationFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<quotation::Model>>>, ServiceError> {
    let (page, limit) = page.resolve(&state.config);
    let quotations = state
        .services
        .quotations
        .list_quotations(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(quotations)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quotations/{id}",
    params(("id" = Uuid, Path, description = "Quotation id")),
    responses(
        (status = 200, description = "Quotation with items", body = ApiResponse<QuotationDetail>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<QuotationDetail>>, ServiceError> {
    let detail = state.services.quotations.get_quotation(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Create a quotation, optionally sending it straight to approval
#[utoipa::path(
    post,
    path = "/api/v1/quotations",
    request_body = CreateQuotationRequest,
    responses(
        (status = 201, description = "Quotation created", body = ApiResponse<QuotationDetail>),
        (status = 400, description = "Invalid items or discount", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn create_quotation(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateQuotationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<QuotationDetail>>), ServiceError> {
    let detail = state
        .services
        .quotations
        .create_quotation(&auth_user, request)
        .await?;
    Ok(super::created(detail))
}

#[utoipa::path(
    put,
    path = "/api/v1/quotations/{id}",
    params(("id" = Uuid, Path, description = "Quotation id")),
    request_body = UpdateQuotationRequest,
    responses(
        (status = 200, description = "Quotation updated", body = ApiResponse<QuotationDetail>),
        (status = 400, description = "Quotation can no longer be edited", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn update_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateQuotationRequest>,
) -> Result<Json<ApiResponse<QuotationDetail>>, ServiceError> {
    let detail = state
        .services
        .quotations
        .update_quotation(id, request)
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quotations/{id}/submit",
    params(("id" = Uuid, Path, description = "Quotation id")),
    responses((status = 200, description = "Awaiting approval", body = ApiResponse<quotation::Model>)),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn submit_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<quotation::Model>>, ServiceError> {
    let quotation = state.services.quotations.submit(id).await?;
    Ok(Json(ApiResponse::success(quotation)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quotations/{id}/approve",
    params(("id" = Uuid, Path, description = "Quotation id")),
    responses(
        (status = 200, description = "Quotation approved", body = ApiResponse<quotation::Model>),
        (status = 400, description = "Quotation is not pending approval", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn approve_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<quotation::Model>>, ServiceError> {
    let quotation = state.services.quotations.approve(&auth_user, id).await?;
    Ok(Json(ApiResponse::success(quotation)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quotations/{id}/reject",
    params(("id" = Uuid, Path, description = "Quotation id")),
    request_body = RejectQuotationRequest,
    responses(
        (status = 200, description = "Quotation rejected", body = ApiResponse<quotation::Model>),
        (status = 400, description = "A reason is required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn reject_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<RejectQuotationRequest>,
) -> Result<Json<ApiResponse<quotation::Model>>, ServiceError> {
    let quotation = state
        .services
        .quotations
        .reject(&auth_user, id, request.reason)
        .await?;
    Ok(Json(ApiResponse::success(quotation)))
}

/// Turn an approved quotation into an order
#[utoipa::path(
    post,
    path = "/api/v1/quotations/{id}/convert",
    params(("id" = Uuid, Path, description = "Quotation id")),
    request_body = ConvertQuotationRequest,
    responses(
        (status = 201, description = "Order created from the quotation", body = ApiResponse<order::Model>),
        (status = 400, description = "Quotation is not approved", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn convert_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<ConvertQuotationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<order::Model>>), ServiceError> {
    let order = state
        .services
        .quotations
        .convert_to_order(&auth_user, id, request)
        .await?;
    Ok(super::created(order))
}

#[utoipa::path(
    delete,
    path = "/api/v1/quotations/{id}",
    params(("id" = Uuid, Path, description = "Quotation id")),
    responses(
        (status = 204, description = "Quotation deleted"),
        (status = 400, description = "Converted quotations are kept", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "quotations"
)]
pub async fn delete_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.quotations.delete_quotation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
