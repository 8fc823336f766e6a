mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{data, data_str, dec, money, TestApp};
use najd_api::entities::user::UserRole;
use serde_json::{json, Value};

async fn create_customer(app: &TestApp) -> String {
    let (status, body) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/customers",
            Some(json!({
                "name": "Desert Rose Cafe",
                "phone": "+966511111111",
                "email": "orders@desertrose.test"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    data_str(&body, "id").to_string()
}

async fn create_order(app: &TestApp, customer_id: &str) -> Value {
    let (status, body) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer_id,
                "title": "Menu boards",
                "order_type": "printing",
                "quantity": 4,
                "total_amount": "1000"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    data(&body).clone()
}

async fn pay(app: &TestApp, invoice_id: &str, amount: &str) -> (StatusCode, Value) {
    app.call(
        UserRole::Accountant,
        Method::POST,
        &format!("/api/v1/invoices/{invoice_id}/payments"),
        Some(json!({ "amount": amount, "method": "cash" })),
    )
    .await
}

#[tokio::test]
async fn payments_settle_invoice_and_order() {
    let app = TestApp::new().await;
    let customer_id = create_customer(&app).await;
    let order = create_order(&app, &customer_id).await;
    let order_id = order["id"].as_str().expect("order id");
    assert_eq!(order["customer_name"], "Desert Rose Cafe");

    let (status, invoice) = app
        .call(
            UserRole::Accountant,
            Method::POST,
            "/api/v1/invoices",
            Some(json!({ "from_order": order_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    assert_eq!(data(&invoice)["invoice_number"], "INV-00001");
    assert_eq!(data(&invoice)["status"], "unpaid");
    assert_eq!(money(&data(&invoice)["total_amount"]), dec("1000"));
    let invoice_id = data_str(&invoice, "id").to_string();

    let (status, detail) = pay(&app, &invoice_id, "400").await;
    assert_eq!(status, StatusCode::CREATED, "{detail}");
    assert_eq!(data(&detail)["invoice"]["status"], "partially_paid");
    assert_eq!(money(&data(&detail)["invoice"]["remaining_amount"]), dec("600"));
    assert_eq!(data(&detail)["payments"].as_array().map(Vec::len), Some(1));

    let (_, linked) = app
        .call(
            UserRole::Sales,
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            None,
        )
        .await;
    assert_eq!(money(&data(&linked)["order"]["paid_amount"]), dec("400"));
    assert_eq!(money(&data(&linked)["order"]["remaining_amount"]), dec("600"));
    let payment_notes: Vec<&str> = data(&linked)["timeline"]
        .as_array()
        .expect("timeline")
        .iter()
        .filter(|entry| entry["action"] == "payment")
        .filter_map(|entry| entry["note"].as_str())
        .collect();
    assert_eq!(payment_notes.len(), 1);

    // Overpaying is refused and leaves the balance untouched.
    let (status, _) = pay(&app, &invoice_id, "700").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, detail) = pay(&app, &invoice_id, "600").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data(&detail)["invoice"]["status"], "paid");
    assert_eq!(money(&data(&detail)["invoice"]["remaining_amount"]), dec("0"));

    let (status, _) = pay(&app, &invoice_id, "1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            UserRole::Accountant,
            Method::POST,
            &format!("/api/v1/invoices/{invoice_id}/cancel"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, summary) = app
        .call(
            UserRole::Sales,
            Method::GET,
            &format!("/api/v1/customers/{customer_id}/summary"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&summary)["order_count"], 1);
    assert_eq!(money(&data(&summary)["paid_total"]), dec("1000"));
    assert_eq!(money(&data(&summary)["outstanding_balance"]), dec("0"));

    // A customer with orders cannot be removed.
    let (status, _) = app
        .call(
            UserRole::Admin,
            Method::DELETE,
            &format!("/api/v1/customers/{customer_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn zero_or_negative_payment_is_invalid() {
    let app = TestApp::new().await;
    let customer_id = create_customer(&app).await;
    let order = create_order(&app, &customer_id).await;

    let (_, invoice) = app
        .call(
            UserRole::Accountant,
            Method::POST,
            "/api/v1/invoices",
            Some(json!({ "from_order": order["id"] })),
        )
        .await;
    let invoice_id = data_str(&invoice, "id").to_string();

    let (status, _) = pay(&app, &invoice_id, "0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = pay(&app, &invoice_id, "-5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn manual_invoice_lifecycle() {
    let app = TestApp::new().await;

    let (status, invoice) = app
        .call(
            UserRole::Accountant,
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "customer_name": "Walk-in customer",
                "subtotal": "500",
                "discount": "50",
                "tax_amount": "67.50"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    assert_eq!(money(&data(&invoice)["total_amount"]), dec("517.50"));
    let invoice_id = data_str(&invoice, "id").to_string();

    // Sales may read invoices but not cancel them.
    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/invoices/{invoice_id}/cancel"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cancelled) = app
        .call(
            UserRole::Accountant,
            Method::POST,
            &format!("/api/v1/invoices/{invoice_id}/cancel"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&cancelled)["status"], "cancelled");

    let (status, _) = pay(&app, &invoice_id, "10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            UserRole::Admin,
            Method::DELETE,
            &format!("/api/v1/invoices/{invoice_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn manual_invoice_requires_customer_and_subtotal() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(
            UserRole::Accountant,
            Method::POST,
            "/api/v1/invoices",
            Some(json!({ "subtotal": "100" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            UserRole::Accountant,
            Method::POST,
            "/api/v1/invoices",
            Some(json!({ "customer_name": "Someone" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn past_due_invoices_are_flagged_overdue() {
    let app = TestApp::new().await;

    let (status, invoice) = app
        .call(
            UserRole::Accountant,
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "customer_name": "Late payer",
                "subtotal": "300",
                "due_date": (Utc::now() - Duration::days(2)).to_rfc3339()
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    let invoice_id = data_str(&invoice, "id").to_string();

    let report = app
        .state
        .maintenance_task()
        .run_once()
        .await;
    assert_eq!(report.invoices_overdue, 1);

    let (_, detail) = app
        .call(
            UserRole::Accountant,
            Method::GET,
            &format!("/api/v1/invoices/{invoice_id}"),
            None,
        )
        .await;
    assert_eq!(data(&detail)["invoice"]["status"], "overdue");

    // A partial payment keeps it overdue; settling clears it.
    let (_, detail) = pay(&app, &invoice_id, "100").await;
    assert_eq!(data(&detail)["invoice"]["status"], "overdue");
    let (_, detail) = pay(&app, &invoice_id, "200").await;
    assert_eq!(data(&detail)["invoice"]["status"], "paid");

    let (_, overdue) = app
        .call(
            UserRole::Accountant,
            Method::GET,
            "/api/v1/invoices?status=overdue",
            None,
        )
        .await;
    assert_eq!(data(&overdue)["total"], 0);
}

#[tokio::test]
async fn concurrent_payments_cannot_overdraw() {
    let app = TestApp::new().await;
    let customer_id = create_customer(&app).await;
    let order = create_order(&app, &customer_id).await;

    let (_, invoice) = app
        .call(
            UserRole::Accountant,
            Method::POST,
            "/api/v1/invoices",
            Some(json!({ "from_order": order["id"] })),
        )
        .await;
    assert_eq!(data(&invoice)["version"], 1);
    let invoice_id = data_str(&invoice, "id").to_string();

    let (first, second) = tokio::join!(pay(&app, &invoice_id, "600"), pay(&app, &invoice_id, "600"));
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let (_, detail) = app
        .call(
            UserRole::Accountant,
            Method::GET,
            &format!("/api/v1/invoices/{invoice_id}"),
            None,
        )
        .await;
    assert_eq!(money(&data(&detail)["invoice"]["paid_amount"]), dec("600"));
    assert_eq!(money(&data(&detail)["invoice"]["remaining_amount"]), dec("400"));
    assert_eq!(data(&detail)["invoice"]["version"], 2);
    assert_eq!(data(&detail)["payments"].as_array().map(Vec::len), Some(1));
}
