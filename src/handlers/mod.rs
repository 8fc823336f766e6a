//! HTTP handlers for the `/api/v1` surface. Each module maps requests onto
//! one service in [`crate::services`] and wraps results in [`ApiResponse`].

pub mod auth;
pub mod calls;
pub mod chat;
pub mod customers;
pub mod dashboard;
pub mod events;
pub mod files;
pub mod inventory;
pub mod invoices;
pub mod material_requests;
pub mod notifications;
pub mod orders;
pub mod quotations;
pub mod users;

use axum::{http::StatusCode, response::Json};

use crate::ApiResponse;

pub(crate) fn created<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}
