mod common;

use axum::http::{Method, StatusCode};
use common::{data, dec, money, TestApp};
use najd_api::entities::user::UserRole;
use serde_json::{json, Value};

async fn create_order(app: &TestApp, title: &str) -> Value {
    let (status, body) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_name": "Al Noor Bakery",
                "customer_phone": "+966500000001",
                "title": title,
                "order_type": "design_and_printing",
                "quantity": 500,
                "total_amount": "1200.00",
                "paid_amount": "200.00"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create order: {body}");
    data(&body).clone()
}

async fn set_status(
    app: &TestApp,
    role: UserRole,
    order_id: &str,
    body: Value,
) -> (StatusCode, Value) {
    app.call(
        role,
        Method::POST,
        &format!("/api/v1/orders/{order_id}/status"),
        Some(body),
    )
    .await
}

#[tokio::test]
async fn orders_are_numbered_sequentially() {
    let app = TestApp::new().await;

    let first = create_order(&app, "Menu cards").await;
    let second = create_order(&app, "Shop sign").await;

    assert_eq!(first["order_number"], "ORD-00001");
    assert_eq!(second["order_number"], "ORD-00002");
    assert_eq!(first["status"], "new");
    assert_eq!(first["version"], 1);
    assert_eq!(money(&first["remaining_amount"]), dec("1000"));
}

#[tokio::test]
async fn order_moves_through_design_with_department_rules() {
    let app = TestApp::new().await;
    let order = create_order(&app, "Wedding invitations").await;
    let order_id = order["id"].as_str().expect("order id").to_string();
    let designer = app.staff(UserRole::Designer).id();

    let (status, assigned) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/assign"),
            Some(json!({ "designer_id": designer })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&assigned)["assigned_designer_id"], designer.as_str());
    assert_eq!(data(&assigned)["version"], 2);

    // Sales may move an order anywhere on the floor.
    let (status, moved) = set_status(
        &app,
        UserRole::Sales,
        &order_id,
        json!({ "status": "pending_design", "expected_version": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&moved)["status"], "pending_design");

    let (status, moved) = set_status(
        &app,
        UserRole::Designer,
        &order_id,
        json!({ "status": "in_design" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&moved)["version"], 4);

    // Printing statuses belong to the printing department.
    let (status, _) = set_status(
        &app,
        UserRole::Designer,
        &order_id,
        json!({ "status": "in_printing" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, detail) = app
        .call(
            UserRole::Designer,
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = data(&detail)["timeline"]
        .as_array()
        .expect("timeline")
        .iter()
        .filter_map(|entry| entry["action"].as_str())
        .collect();
    assert_eq!(
        actions.iter().filter(|a| **a == "status_changed").count(),
        2
    );
    assert!(actions.contains(&"created"));
    assert!(actions.contains(&"assigned"));

    // The designer was told about the assignment.
    let (_, inbox) = app
        .call(UserRole::Designer, Method::GET, "/api/v1/notifications", None)
        .await;
    let kinds: Vec<&str> = data(&inbox)["items"]
        .as_array()
        .expect("notifications")
        .iter()
        .filter_map(|n| n["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"order_assigned"));
}

#[tokio::test]
async fn stale_version_is_a_conflict() {
    let app = TestApp::new().await;
    let order = create_order(&app, "Roll-up banner").await;
    let order_id = order["id"].as_str().expect("order id");

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::PUT,
            &format!("/api/v1/orders/{order_id}"),
            Some(json!({ "quantity": 2, "expected_version": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = set_status(
        &app,
        UserRole::Sales,
        order_id,
        json!({ "status": "pending_design", "expected_version": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "concurrent_modification");
}

#[tokio::test]
async fn cancelling_requires_a_note_and_is_final() {
    let app = TestApp::new().await;
    let order = create_order(&app, "Flyers").await;
    let order_id = order["id"].as_str().expect("order id");

    let (status, _) = set_status(&app, UserRole::Sales, order_id, json!({ "status": "cancelled" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = set_status(
        &app,
        UserRole::Sales,
        order_id,
        json!({ "status": "cancelled", "note": "Customer withdrew" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = set_status(&app, UserRole::Admin, order_id, json!({ "status": "new" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::PUT,
            &format!("/api/v1/orders/{order_id}"),
            Some(json!({ "title": "Flyers v2" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn floor_staff_only_see_assigned_orders() {
    let app = TestApp::new().await;
    let mine = create_order(&app, "Business cards").await;
    let other = create_order(&app, "Stickers").await;
    let printer = app.staff(UserRole::Printing).id();

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/orders/{}/assign", mine["id"].as_str().expect("id")),
            Some(json!({ "printer_id": printer })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = app
        .call(UserRole::Printing, Method::GET, "/api/v1/orders", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&list)["total"], 1);
    assert_eq!(data(&list)["items"][0]["id"], mine["id"]);

    let (status, _) = app
        .call(
            UserRole::Printing,
            Method::GET,
            &format!("/api/v1/orders/{}", other["id"].as_str().expect("id")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, all) = app
        .call(UserRole::Sales, Method::GET, "/api/v1/orders", None)
        .await;
    assert_eq!(data(&all)["total"], 2);
}

#[tokio::test]
async fn assigning_wrong_role_is_rejected() {
    let app = TestApp::new().await;
    let order = create_order(&app, "Catalogue").await;
    let accountant = app.staff(UserRole::Accountant).id();

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/orders/{}/assign", order["id"].as_str().expect("id")),
            Some(json!({ "designer_id": accountant })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_list_filters_and_search() {
    let app = TestApp::new().await;
    create_order(&app, "Calendar 2025").await;
    let urgent = create_order(&app, "Posters").await;
    let urgent_id = urgent["id"].as_str().expect("id");

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::PUT,
            &format!("/api/v1/orders/{urgent_id}"),
            Some(json!({ "priority": "urgent" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, found) = app
        .call(UserRole::Sales, Method::GET, "/api/v1/orders?search=Calendar", None)
        .await;
    assert_eq!(data(&found)["total"], 1);

    let (_, found) = app
        .call(UserRole::Sales, Method::GET, "/api/v1/orders?priority=urgent", None)
        .await;
    assert_eq!(data(&found)["total"], 1);
    assert_eq!(data(&found)["items"][0]["id"], urgent_id);

    let (_, paged) = app
        .call(UserRole::Sales, Method::GET, "/api/v1/orders?page=2&limit=1", None)
        .await;
    assert_eq!(data(&paged)["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(data(&paged)["total_pages"], 2);
}

#[tokio::test]
async fn notes_are_appended_to_the_timeline() {
    let app = TestApp::new().await;
    let order = create_order(&app, "Brochures").await;
    let order_id = order["id"].as_str().expect("id");

    let (status, entry) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/notes"),
            Some(json!({ "note": "Customer prefers matte paper" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data(&entry)["action"], "note");
    assert_eq!(data(&entry)["actor_name"], "Sales User");
}
