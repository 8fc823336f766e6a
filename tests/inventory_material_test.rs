mod common;

use axum::http::{Method, StatusCode};
use common::{data, data_str, dec, money, TestApp};
use najd_api::entities::user::UserRole;
use serde_json::json;

async fn create_paper(app: &TestApp, quantity: &str) -> String {
    let (status, body) = app
        .call(
            UserRole::Inventory,
            Method::POST,
            "/api/v1/inventory",
            Some(json!({
                "name": "A4 Gloss paper",
                "sku": "ppr-a4-gloss",
                "category": "paper",
                "unit": "ream",
                "quantity": quantity,
                "min_quantity": "10",
                "unit_cost": "18.50"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(data(&body)["sku"], "PPR-A4-GLOSS");
    data_str(&body, "id").to_string()
}

async fn adjust(
    app: &TestApp,
    item_id: &str,
    delta: &str,
) -> (StatusCode, serde_json::Value) {
    app.call(
        UserRole::Inventory,
        Method::POST,
        &format!("/api/v1/inventory/{item_id}/adjust"),
        Some(json!({ "delta": delta, "reason": "Print run" })),
    )
    .await
}

#[tokio::test]
async fn adjustments_record_transactions_and_guard_stock() {
    let app = TestApp::new().await;
    let item_id = create_paper(&app, "50").await;

    let (status, item) = adjust(&app, &item_id, "-15").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&data(&item)["quantity"]), dec("35"));

    let (status, body) = adjust(&app, &item_id, "-100").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "insufficient_stock");

    let (status, _) = adjust(&app, &item_id, "0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, history) = app
        .call(
            UserRole::Inventory,
            Method::GET,
            &format!("/api/v1/inventory/{item_id}/transactions"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&history)["total"], 1);
    assert_eq!(
        money(&data(&history)["items"][0]["quantity_after"]),
        dec("35")
    );

    // Floor staff can look but not touch.
    let (status, _) = app
        .call(
            UserRole::Printing,
            Method::POST,
            &format!("/api/v1/inventory/{item_id}/adjust"),
            Some(json!({ "delta": "-1", "reason": "Test" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .call(
            UserRole::Printing,
            Method::GET,
            &format!("/api/v1/inventory/{item_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let app = TestApp::new().await;
    create_paper(&app, "5").await;

    let (status, _) = app
        .call(
            UserRole::Inventory,
            Method::POST,
            "/api/v1/inventory",
            Some(json!({ "name": "Other", "sku": "PPR-A4-GLOSS", "unit": "ream" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn crossing_the_threshold_warns_inventory_staff() {
    let app = TestApp::new().await;
    let item_id = create_paper(&app, "12").await;

    let (status, _) = adjust(&app, &item_id, "-3").await;
    assert_eq!(status, StatusCode::OK);

    let (_, low) = app
        .call(UserRole::Sales, Method::GET, "/api/v1/inventory/low-stock", None)
        .await;
    assert_eq!(data(&low).as_array().map(Vec::len), Some(1));
    assert_eq!(data(&low)[0]["id"], item_id.as_str());

    let (_, inbox) = app
        .call(UserRole::Inventory, Method::GET, "/api/v1/notifications", None)
        .await;
    let low_notices = data(&inbox)["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter(|n| n["kind"] == "low_stock")
        .count();
    assert_eq!(low_notices, 1);

    // Staying below the threshold does not warn again.
    adjust(&app, &item_id, "-1").await;
    let (_, inbox) = app
        .call(UserRole::Inventory, Method::GET, "/api/v1/notifications", None)
        .await;
    let low_notices = data(&inbox)["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter(|n| n["kind"] == "low_stock")
        .count();
    assert_eq!(low_notices, 1);

    let (status, marked) = app
        .call(
            UserRole::Inventory,
            Method::POST,
            "/api/v1/notifications/read-all",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&marked)["updated"], 1);
}

#[tokio::test]
async fn material_request_flow_restocks_inventory() {
    let app = TestApp::new().await;
    let item_id = create_paper(&app, "2").await;

    let (status, request) = app
        .call(
            UserRole::Printing,
            Method::POST,
            "/api/v1/material-requests",
            Some(json!({
                "item_id": item_id,
                "quantity": "40",
                "reason": "Calendar job next week",
                "urgency": "urgent"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{request}");
    assert_eq!(data(&request)["department"], "printing");
    assert_eq!(data(&request)["item_name"], "A4 Gloss paper");
    assert_eq!(data(&request)["unit"], "ream");
    let request_id = data_str(&request, "id").to_string();

    // Approval comes from management, not from the stock room.
    let (status, _) = app
        .call(
            UserRole::Inventory,
            Method::POST,
            &format!("/api/v1/material-requests/{request_id}/approve"),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            UserRole::Inventory,
            Method::POST,
            &format!("/api/v1/material-requests/{request_id}/fulfil"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, approved) = app
        .call(
            UserRole::Ceo,
            Method::POST,
            &format!("/api/v1/material-requests/{request_id}/approve"),
            Some(json!({ "note": "Go ahead" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&approved)["status"], "approved");

    let (status, fulfilled) = app
        .call(
            UserRole::Inventory,
            Method::POST,
            &format!("/api/v1/material-requests/{request_id}/fulfil"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&fulfilled)["status"], "fulfilled");

    let (_, item) = app
        .call(
            UserRole::Inventory,
            Method::GET,
            &format!("/api/v1/inventory/{item_id}"),
            None,
        )
        .await;
    assert_eq!(money(&data(&item)["quantity"]), dec("42"));

    let (_, history) = app
        .call(
            UserRole::Inventory,
            Method::GET,
            &format!("/api/v1/inventory/{item_id}/transactions"),
            None,
        )
        .await;
    assert_eq!(data(&history)["items"][0]["reference_type"], "material_request");
    assert_eq!(data(&history)["items"][0]["reference_id"], request_id.as_str());

    // The requester heard back about the review.
    let (_, inbox) = app
        .call(UserRole::Printing, Method::GET, "/api/v1/notifications", None)
        .await;
    let reviewed = data(&inbox)["items"]
        .as_array()
        .expect("items")
        .iter()
        .any(|n| n["kind"] == "material_request_reviewed");
    assert!(reviewed);
}

#[tokio::test]
async fn material_requests_are_scoped_by_department() {
    let app = TestApp::new().await;

    let (status, request) = app
        .call(
            UserRole::Printing,
            Method::POST,
            "/api/v1/material-requests",
            Some(json!({ "item_name": "Black ink", "quantity": "3", "unit": "litre" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = data_str(&request, "id").to_string();

    let (_, designer_view) = app
        .call(UserRole::Designer, Method::GET, "/api/v1/material-requests", None)
        .await;
    assert_eq!(data(&designer_view)["total"], 0);

    let (status, _) = app
        .call(
            UserRole::Designer,
            Method::GET,
            &format!("/api/v1/material-requests/{request_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, stock_view) = app
        .call(UserRole::Inventory, Method::GET, "/api/v1/material-requests", None)
        .await;
    assert_eq!(data(&stock_view)["total"], 1);

    // Rejection needs a note.
    let (status, _) = app
        .call(
            UserRole::Ceo,
            Method::POST,
            &format!("/api/v1/material-requests/{request_id}/reject"),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The requester may withdraw it while pending.
    let (status, cancelled) = app
        .call(
            UserRole::Printing,
            Method::POST,
            &format!("/api/v1/material-requests/{request_id}/cancel"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&cancelled)["status"], "cancelled");
}

#[tokio::test]
async fn out_of_range_adjustment_is_rejected() {
    let app = TestApp::new().await;
    let item_id = create_paper(&app, "50").await;

    let (status, body) = adjust(&app, &item_id, "79228162514264337593543950335").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (_, item) = app
        .call(
            UserRole::Inventory,
            Method::GET,
            &format!("/api/v1/inventory/{item_id}"),
            None,
        )
        .await;
    assert_eq!(money(&data(&item)["quantity"]), dec("50"));
}

#[tokio::test]
async fn far_away_pages_are_empty() {
    let app = TestApp::new().await;
    create_paper(&app, "2").await;

    for uri in [
        "/api/v1/inventory?page=18446744073709551615&limit=50",
        "/api/v1/inventory?low_stock_only=true&page=18446744073709551615&limit=50",
        "/api/v1/customers?page=18446744073709551615&limit=50",
    ] {
        let (status, body) = app.call(UserRole::Admin, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
        assert_eq!(data(&body)["items"].as_array().map(Vec::len), Some(0), "{uri}");
    }

    let (status, body) = app
        .call(
            UserRole::Admin,
            Method::GET,
            "/api/v1/inventory?low_stock_only=true&page=1",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["total"], 1);
}

#[tokio::test]
async fn fulfilled_request_restocks_only_once() {
    let app = TestApp::new().await;
    let item_id = create_paper(&app, "5").await;

    let (_, request) = app
        .call(
            UserRole::Printing,
            Method::POST,
            "/api/v1/material-requests",
            Some(json!({ "item_id": item_id, "quantity": "10", "reason": "Flyers" })),
        )
        .await;
    let request_id = data_str(&request, "id").to_string();
    let (status, _) = app
        .call(
            UserRole::Ceo,
            Method::POST,
            &format!("/api/v1/material-requests/{request_id}/approve"),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let fulfil = format!("/api/v1/material-requests/{request_id}/fulfil");
    let (first, second) = tokio::join!(
        app.call(UserRole::Inventory, Method::POST, &fulfil, None),
        app.call(UserRole::Inventory, Method::POST, &fulfil, None),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    let (_, item) = app
        .call(
            UserRole::Inventory,
            Method::GET,
            &format!("/api/v1/inventory/{item_id}"),
            None,
        )
        .await;
    assert_eq!(money(&data(&item)["quantity"]), dec("15"));
}
