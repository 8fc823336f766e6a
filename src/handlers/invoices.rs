use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::invoice;
use crate::errors::ServiceError;
use crate::services::invoices::{
    CreateInvoiceRequest, InvoiceDetail, InvoiceFilter, RecordPaymentRequest,
};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by invoice status"),
        ("customer_id" = Option<Uuid>, Query, description = "Filter by customer"),
        ("order_id" = Option<Uuid>, Query, description = "Filter by order"),
        ("search" = Option<String>, Query, description = "Matches number or customer name"),
    ),
    responses((status = 200, description = "Invoices", body = ApiResponse<PaginatedResponse<invoice::Model>>)),
    security(("Bearer" = [])),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(page): Query<ListQuery>,
    Query(filter): Query<InvoiceFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<invoice::Model>>>, ServiceError> {
    let (page, limit) = page.resolve(&state.config);
    let invoices = state
        .services
        .invoices
        .list_invoices(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(invoices)))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice with payments", body = ApiResponse<InvoiceDetail>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InvoiceDetail>>, ServiceError> {
    let detail = state.services.invoices.get_invoice(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Issue an invoice, standalone or for an order
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = ApiResponse<invoice::Model>),
        (status = 400, description = "Invalid amounts", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<invoice::Model>>), ServiceError> {
    let invoice = state
        .services
        .invoices
        .create_invoice(&auth_user, request)
        .await?;
    Ok(super::created(invoice))
}

/// Record a payment against an invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/payments",
    params(("id" = Uuid, Path, description = "Invoice id")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = ApiResponse<InvoiceDetail>),
        (status = 400, description = "Amount exceeds the remaining balance", body = crate::errors::ErrorResponse),
        (status = 409, description = "Linked order changed concurrently", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "invoices"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InvoiceDetail>>), ServiceError> {
    let detail = state
        .services
        .invoices
        .record_payment(&auth_user, id, request)
        .await?;
    Ok(super::created(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/cancel",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice cancelled", body = ApiResponse<invoice::Model>),
        (status = 400, description = "Invoice already has payments", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "invoices"
)]
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<invoice::Model>>, ServiceError> {
    let invoice = state.services.invoices.cancel(id).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses((status = 204, description = "Invoice deleted")),
    security(("Bearer" = [])),
    tag = "invoices"
)]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.invoices.delete_invoice(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
