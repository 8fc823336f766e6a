//! Najd API Library
//!
//! Backend for a printing and design studio: order intake and the
//! department workflow, quotations, invoices and payments, inventory and
//! material requests, customers, staff accounts, internal chat and voice
//! call signaling, with a live event feed for connected clients.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod i18n;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod storage;
pub mod telemetry;

use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::ToSchema;

use crate::auth::{perm, AuthConfig, AuthRouterExt, AuthService};
use crate::db::DbPool;
use crate::events::{EventHub, EventSender};
use crate::storage::ObjectStore;

/// Every domain service, built once and shared by the handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: services::users::UserService,
    pub customers: services::customers::CustomerService,
    pub orders: services::orders::OrderService,
    pub quotations: services::quotations::QuotationService,
    pub invoices: services::invoices::InvoiceService,
    pub inventory: services::inventory::InventoryService,
    pub material_requests: services::material_requests::MaterialRequestService,
    pub chat: services::chat::ChatService,
    pub calls: services::calls::CallService,
    pub notifications: services::notifications::NotificationService,
    pub dashboard: services::dashboard::DashboardService,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        storage: Arc<dyn ObjectStore>,
        cfg: &config::AppConfig,
    ) -> Self {
        use services::*;

        let notifications =
            notifications::NotificationService::new(db.clone(), event_sender.clone());
        let inventory = inventory::InventoryService::new(
            db.clone(),
            event_sender.clone(),
            notifications.clone(),
        );

        Self {
            users: users::UserService::new(db.clone()),
            customers: customers::CustomerService::new(db.clone(), event_sender.clone()),
            orders: orders::OrderService::new(
                db.clone(),
                event_sender.clone(),
                notifications.clone(),
                storage,
            ),
            quotations: quotations::QuotationService::new(
                db.clone(),
                event_sender.clone(),
                notifications.clone(),
                cfg.default_tax_rate,
            ),
            invoices: invoices::InvoiceService::new(db.clone(), event_sender.clone()),
            material_requests: material_requests::MaterialRequestService::new(
                db.clone(),
                event_sender.clone(),
                notifications.clone(),
                inventory.clone(),
            ),
            inventory,
            chat: chat::ChatService::new(db.clone(), event_sender.clone()),
            calls: calls::CallService::new(db.clone(), event_sender),
            notifications,
            dashboard: dashboard::DashboardService::new(db),
        }
    }
}

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub event_hub: EventHub,
    pub auth: Arc<AuthService>,
    pub storage: Arc<dyn ObjectStore>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DbPool>,
        config: config::AppConfig,
        event_sender: EventSender,
        event_hub: EventHub,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config), db.clone()));
        let services = AppServices::new(db.clone(), event_sender.clone(), storage.clone(), &config);
        Self {
            db,
            config,
            event_sender,
            event_hub,
            auth,
            storage,
            services,
        }
    }

    /// Housekeeping loop wired to this state's services and timings
    pub fn maintenance_task(&self) -> services::maintenance::MaintenanceTask {
        services::maintenance::MaintenanceTask::new(
            self.services.invoices.clone(),
            self.services.calls.clone(),
            self.config.maintenance_interval(),
            self.config.call_ring_timeout(),
        )
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, clamped to the configured maximum
    pub limit: Option<u64>,
}

impl ListQuery {
    pub fn resolve(&self, cfg: &config::AppConfig) -> (u64, u64) {
        (self.page.unwrap_or(1).max(1), cfg.page_size(self.limit))
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: telemetry::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        Self {
            items,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Authenticated `/api/v1` routes, each group gated by its permission.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::*;

    let session = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        .route("/events", get(events::event_stream))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/:id/read", post(notifications::mark_read));

    let users_read = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .with_permission(perm::USERS_READ);
    let users_manage = Router::new()
        .route("/users", post(users::create_user))
        .route("/users/:id", put(users::update_user).delete(users::delete_user))
        .route("/users/:id/reset-password", post(users::reset_password))
        .with_permission(perm::USERS_MANAGE);

    let customers_read = Router::new()
        .route("/customers", get(customers::list_customers))
        .route("/customers/:id", get(customers::get_customer))
        .route("/customers/:id/summary", get(customers::customer_summary))
        .with_permission(perm::CUSTOMERS_READ);
    let customers_create = Router::new()
        .route("/customers", post(customers::create_customer))
        .with_permission(perm::CUSTOMERS_CREATE);
    let customers_update = Router::new()
        .route("/customers/:id", put(customers::update_customer))
        .with_permission(perm::CUSTOMERS_UPDATE);
    let customers_delete = Router::new()
        .route("/customers/:id", delete(customers::delete_customer))
        .with_permission(perm::CUSTOMERS_DELETE);

    let orders_read = Router::new()
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/attachments", get(orders::list_attachments))
        .with_permission(perm::ORDERS_READ);
    let orders_create = Router::new()
        .route("/orders", post(orders::create_order))
        .with_permission(perm::ORDERS_CREATE);
    let orders_update = Router::new()
        .route("/orders/:id", put(orders::update_order))
        .with_permission(perm::ORDERS_UPDATE);
    let orders_status = Router::new()
        .route("/orders/:id/status", post(orders::update_order_status))
        .with_permission(perm::ORDERS_UPDATE_STATUS);
    let orders_assign = Router::new()
        .route("/orders/:id/assign", post(orders::assign_order))
        .with_permission(perm::ORDERS_ASSIGN);
    let orders_note = Router::new()
        .route("/orders/:id/notes", post(orders::add_note))
        .route("/orders/:id/attachments", post(orders::attach_file))
        .with_permission(perm::ORDERS_NOTE);
    let orders_delete = Router::new()
        .route("/orders/:id", delete(orders::delete_order))
        .with_permission(perm::ORDERS_DELETE);

    let quotations_read = Router::new()
        .route("/quotations", get(quotations::list_quotations))
        .route("/quotations/:id", get(quotations::get_quotation))
        .with_permission(perm::QUOTATIONS_READ);
    let quotations_create = Router::new()
        .route("/quotations", post(quotations::create_quotation))
        .with_permission(perm::QUOTATIONS_CREATE);
    let quotations_update = Router::new()
        .route("/quotations/:id", put(quotations::update_quotation))
        .route("/quotations/:id/submit", post(quotations::submit_quotation))
        .with_permission(perm::QUOTATIONS_UPDATE);
    let quotations_approve = Router::new()
        .route("/quotations/:id/approve", post(quotations::approve_quotation))
        .route("/quotations/:id/reject", post(quotations::reject_quotation))
        .with_permission(perm::QUOTATIONS_APPROVE);
    let quotations_convert = Router::new()
        .route("/quotations/:id/convert", post(quotations::convert_quotation))
        .with_permission(perm::QUOTATIONS_CONVERT);
    let quotations_delete = Router::new()
        .route("/quotations/:id", delete(quotations::delete_quotation))
        .with_permission(perm::QUOTATIONS_DELETE);

    let invoices_read = Router::new()
        .route("/invoices", get(invoices::list_invoices))
        .route("/invoices/:id", get(invoices::get_invoice))
        .with_permission(perm::INVOICES_READ);
    let invoices_create = Router::new()
        .route("/invoices", post(invoices::create_invoice))
        .with_permission(perm::INVOICES_CREATE);
    let invoices_pay = Router::new()
        .route("/invoices/:id/payments", post(invoices::record_payment))
        .with_permission(perm::INVOICES_RECORD_PAYMENT);
    let invoices_cancel = Router::new()
        .route("/invoices/:id/cancel", post(invoices::cancel_invoice))
        .with_permission(perm::INVOICES_CANCEL);
    let invoices_delete = Router::new()
        .route("/invoices/:id", delete(invoices::delete_invoice))
        .with_permission(perm::INVOICES_DELETE);

    let inventory_read = Router::new()
        .route("/inventory", get(inventory::list_items))
        .route("/inventory/low-stock", get(inventory::low_stock))
        .route("/inventory/:id", get(inventory::get_item))
        .route("/inventory/:id/transactions", get(inventory::list_transactions))
        .with_permission(perm::INVENTORY_READ);
    let inventory_create = Router::new()
        .route("/inventory", post(inventory::create_item))
        .with_permission(perm::INVENTORY_CREATE);
    let inventory_update = Router::new()
        .route("/inventory/:id", put(inventory::update_item))
        .with_permission(perm::INVENTORY_UPDATE);
    let inventory_adjust = Router::new()
        .route("/inventory/:id/adjust", post(inventory::adjust_stock))
        .with_permission(perm::INVENTORY_ADJUST);
    let inventory_delete = Router::new()
        .route("/inventory/:id", delete(inventory::delete_item))
        .with_permission(perm::INVENTORY_DELETE);

    let material_read = Router::new()
        .route("/material-requests", get(material_requests::list_requests))
        .route("/material-requests/:id", get(material_requests::get_request))
        .with_permission(perm::MATERIAL_REQUESTS_READ);
    let material_create = Router::new()
        .route("/material-requests", post(material_requests::create_request))
        .route("/material-requests/:id/cancel", post(material_requests::cancel_request))
        .with_permission(perm::MATERIAL_REQUESTS_CREATE);
    let material_approve = Router::new()
        .route("/material-requests/:id/approve", post(material_requests::approve_request))
        .route("/material-requests/:id/reject", post(material_requests::reject_request))
        .with_permission(perm::MATERIAL_REQUESTS_APPROVE);
    let material_fulfil = Router::new()
        .route("/material-requests/:id/fulfil", post(material_requests::fulfil_request))
        .with_permission(perm::MATERIAL_REQUESTS_FULFIL);

    let chat = Router::new()
        .route("/chats", get(chat::list_chats))
        .route("/chats/direct", post(chat::open_direct))
        .route("/chats/groups", post(chat::create_group))
        .route(
            "/chats/:id/messages",
            get(chat::list_messages).post(chat::send_message),
        )
        .route("/chats/:id/read", post(chat::mark_read))
        .route(
            "/chats/:id/messages/:message_id",
            delete(chat::delete_message),
        )
        .with_permission(perm::CHAT_USE);

    let calls = Router::new()
        .route("/calls", get(calls::call_history).post(calls::start_call))
        .route("/calls/:id", get(calls::get_call))
        .route("/calls/:id/accept", post(calls::accept_call))
        .route("/calls/:id/reject", post(calls::reject_call))
        .route("/calls/:id/end", post(calls::end_call))
        .route(
            "/calls/:id/candidates",
            get(calls::list_candidates).post(calls::add_candidate),
        )
        .with_permission(perm::CALLS_USE);

    let files_upload = Router::new()
        .route("/files", post(files::upload_file))
        .with_permission(perm::FILES_UPLOAD);
    let files_read = Router::new()
        .route("/files/*key", get(files::download_file))
        .with_permission(perm::FILES_READ);

    let dashboard = Router::new()
        .route("/dashboard", get(dashboard::summary))
        .with_permission(perm::DASHBOARD_READ);

    Router::new()
        .merge(session)
        .merge(users_read)
        .merge(users_manage)
        .merge(customers_read)
        .merge(customers_create)
        .merge(customers_update)
        .merge(customers_delete)
        .merge(orders_read)
        .merge(orders_create)
        .merge(orders_update)
        .merge(orders_status)
        .merge(orders_assign)
        .merge(orders_note)
        .merge(orders_delete)
        .merge(quotations_read)
        .merge(quotations_create)
        .merge(quotations_update)
        .merge(quotations_approve)
        .merge(quotations_convert)
        .merge(quotations_delete)
        .merge(invoices_read)
        .merge(invoices_create)
        .merge(invoices_pay)
        .merge(invoices_cancel)
        .merge(invoices_delete)
        .merge(inventory_read)
        .merge(inventory_create)
        .merge(inventory_update)
        .merge(inventory_adjust)
        .merge(inventory_delete)
        .merge(material_read)
        .merge(material_create)
        .merge(material_approve)
        .merge(material_fulfil)
        .merge(chat)
        .merge(calls)
        .merge(files_upload)
        .merge(files_read)
        .merge(dashboard)
}

/// The full application minus CORS, which depends on deployment config.
pub fn app_router(state: AppState) -> Router {
    // base64 inflates uploads by a third, plus JSON framing
    let body_limit = state.config.max_upload_bytes / 3 * 4 + 64 * 1024;

    let protected = api_v1_routes().route_layer(axum::middleware::from_fn_with_state(
        state.auth.clone(),
        auth::auth_middleware,
    ));

    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .merge(health::health_routes())
        .nest("/api/v1", protected)
        .merge(openapi::swagger_ui())
        .layer(axum::middleware::from_fn(metrics::track_http_metrics))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(telemetry::http_trace_layer())
        .layer(axum::middleware::from_fn(
            middleware_helpers::security_headers::security_headers_middleware,
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use crate::i18n::Locale;
    use crate::telemetry::{scope_request, RequestContext, RequestId};
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let ctx = RequestContext::new(RequestId::new("meta-123"), Locale::En);
        let response = scope_request(ctx, async { ApiResponse::success("ok") }).await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn pagination_rounds_pages_up() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        let empty = PaginatedResponse::<u8>::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
        assert_eq!(page.map(|n| n * 2).items, vec![2, 4, 6]);
    }
}
