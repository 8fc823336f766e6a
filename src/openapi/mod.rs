use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Najd API",
        version = "0.3.0",
        description = r#"
# Najd Printing Studio API

Back office for a printing and design studio.

## Features

- **Orders**: intake, the department workflow from design to delivery, assignment and files
- **Quotations**: priced proposals, CEO approval and conversion into orders
- **Accounting**: invoices, payments and outstanding balances
- **Inventory**: stock levels, movements and department material requests
- **Team**: staff accounts, chat, voice call signaling and notifications
- **Live updates**: Server-Sent Events at `/api/v1/events`

## Authentication

Sign in at `/api/v1/auth/login` and send the returned token on every call:

```
Authorization: Bearer <your-jwt-token>
```

## Errors

```json
{
  "error": "Bad Request",
  "message": "Validation error: Title is required",
  "request_id": "3b0c...",
  "timestamp": "2026-01-01T00:00:00Z"
}
```

Send `Accept-Language: ar` to receive sign-in errors in Arabic.

## Pagination

List endpoints accept `page` (from 1) and `limit`.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Sign-in and the current session"),
        (name = "users", description = "Staff accounts"),
        (name = "customers", description = "Customer records"),
        (name = "orders", description = "Orders and their workflow"),
        (name = "quotations", description = "Quotations and approvals"),
        (name = "invoices", description = "Invoices and payments"),
        (name = "inventory", description = "Stock items and movements"),
        (name = "material-requests", description = "Department material requests"),
        (name = "chat", description = "Internal messaging"),
        (name = "calls", description = "Voice call signaling"),
        (name = "notifications", description = "Per-user notifications"),
        (name = "files", description = "File storage"),
        (name = "dashboard", description = "Business overview"),
        (name = "events", description = "Live event feed")
    ),
    paths(
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::change_password,

        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::reset_password,
        crate::handlers::users::delete_user,

        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::customer_summary,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::update_customer,
        crate::handlers::customers::delete_customer,

        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::assign_order,
        crate::handlers::orders::add_note,
        crate::handlers::orders::attach_file,
        crate::handlers::orders::list_attachments,
        crate::handlers::orders::delete_order,

        crate::handlers::quotations::list_quotations,
        crate::handlers::quotations::get_quotation,
        crate::handlers::quotations::create_quotation,
        crate::handlers::quotations::update_quotation,
        crate::handlers::quotations::submit_quotation,
        crate::handlers::quotations::approve_quotation,
        crate::handlers::quotations::reject_quotation,
        crate::handlers::quotations::convert_quotation,
        crate::handlers::quotations::delete_quotation,

        crate::handlers::invoices::list_invoices,
        crate::handlers::invoices::get_invoice,
        crate::handlers::invoices::create_invoice,
        crate::handlers::invoices::record_payment,
        crate::handlers::invoices::cancel_invoice,
        crate::handlers::invoices::delete_invoice,

        crate::handlers::inventory::list_items,
        crate::handlers::inventory::low_stock,
        crate::handlers::inventory::get_item,
        crate::handlers::inventory::create_item,
        crate::handlers::inventory::update_item,
        crate::handlers::inventory::adjust_stock,
        crate::handlers::inventory::list_transactions,
        crate::handlers::inventory::delete_item,

        crate::handlers::material_requests::list_requests,
        crate::handlers::material_requests::get_request,
        crate::handlers::material_requests::create_request,
        crate::handlers::material_requests::approve_request,
        crate::handlers::material_requests::reject_request,
        crate::handlers::material_requests::fulfil_request,
        crate::handlers::material_requests::cancel_request,

        crate::handlers::chat::list_chats,
        crate::handlers::chat::open_direct,
        crate::handlers::chat::create_group,
        crate::handlers::chat::list_messages,
        crate::handlers::chat::send_message,
        crate::handlers::chat::mark_read,
        crate::handlers::chat::delete_message,

        crate::handlers::calls::start_call,
        crate::handlers::calls::call_history,
        crate::handlers::calls::get_call,
        crate::handlers::calls::accept_call,
        crate::handlers::calls::reject_call,
        crate::handlers::calls::end_call,
        crate::handlers::calls::add_candidate,
        crate::handlers::calls::list_candidates,

        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::mark_read,
        crate::handlers::notifications::mark_all_read,

        crate::handlers::files::upload_file,
        crate::handlers::files::download_file,

        crate::handlers::dashboard::summary,
        crate::handlers::events::event_stream,
    ),
    components(schemas(crate::ListQuery, crate::errors::ErrorResponse))
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_workflow_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/v1/orders/{id}/status"));
        assert!(paths.contains_key("/api/v1/quotations/{id}/convert"));
        assert!(paths.contains_key("/api/v1/invoices/{id}/payments"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("Bearer")));
    }
}
