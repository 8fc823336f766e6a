mod common;

use axum::http::{Method, StatusCode};
use common::{data, data_str, dec, money, TestApp};
use najd_api::entities::user::UserRole;
use serde_json::{json, Value};

fn quotation_body(submit: bool) -> Value {
    json!({
        "customer_name": "Riyadh Events Co.",
        "title": "Conference kit",
        "items": [
            { "description": "Lanyards", "quantity": 2, "unit_price": "150.50" },
            { "description": "Badges", "quantity": 100, "unit_price": "1.25" }
        ],
        "discount": "25",
        "tax_rate": "0.15",
        "submit": submit
    })
}

#[tokio::test]
async fn totals_are_computed_and_serialized_as_strings() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/quotations",
            Some(quotation_body(false)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let quotation = &data(&body)["quotation"];
    assert_eq!(quotation["quotation_number"], "QT-00001");
    assert_eq!(quotation["status"], "draft");
    assert!(quotation["total"].is_string());
    assert_eq!(money(&quotation["subtotal"]), dec("426"));
    assert_eq!(money(&quotation["tax_amount"]), dec("60.15"));
    assert_eq!(money(&quotation["total"]), dec("461.15"));
    assert_eq!(data(&body)["items"].as_array().map(Vec::len), Some(2));

    // Replacing the items recomputes the totals.
    let id = quotation["id"].as_str().expect("id");
    let (status, updated) = app
        .call(
            UserRole::Sales,
            Method::PUT,
            &format!("/api/v1/quotations/{id}"),
            Some(json!({
                "items": [{ "description": "Lanyards", "quantity": 10, "unit_price": "10" }],
                "discount": "0"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&data(&updated)["quotation"]["total"]), dec("115"));
}

#[tokio::test]
async fn discount_larger_than_subtotal_is_rejected() {
    let app = TestApp::new().await;
    let mut body = quotation_body(false);
    body["discount"] = json!("10000");

    let (status, _) = app
        .call(UserRole::Sales, Method::POST, "/api/v1/quotations", Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn approved_quotation_converts_to_order() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/quotations",
            Some(quotation_body(true)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data(&body)["quotation"]["status"], "pending_approval");
    let id = data(&body)["quotation"]["id"]
        .as_str()
        .expect("id")
        .to_string();

    // Management hears about the submission.
    let (_, inbox) = app
        .call(UserRole::Ceo, Method::GET, "/api/v1/notifications", None)
        .await;
    assert!(data(&inbox)["total"].as_u64().unwrap_or(0) >= 1);

    // Sales cannot approve their own quotations.
    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/quotations/{id}/approve"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Not approved yet, so nothing to convert.
    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/quotations/{id}/convert"),
            Some(json!({ "order_type": "printing" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, approved) = app
        .call(
            UserRole::Ceo,
            Method::POST,
            &format!("/api/v1/quotations/{id}/approve"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&approved)["status"], "approved");
    assert_eq!(
        data(&approved)["reviewed_by"],
        app.staff(UserRole::Ceo).id().as_str()
    );

    let (status, order) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/quotations/{id}/convert"),
            Some(json!({ "order_type": "printing", "priority": "urgent" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(data(&order)["quotation_id"], id.as_str());
    assert_eq!(data(&order)["quantity"], 102);
    assert_eq!(data(&order)["priority"], "urgent");
    assert_eq!(money(&data(&order)["total_amount"]), dec("461.15"));
    assert_eq!(money(&data(&order)["remaining_amount"]), dec("461.15"));
    let order_id = data_str(&order, "id").to_string();

    let (_, quotation) = app
        .call(
            UserRole::Sales,
            Method::GET,
            &format!("/api/v1/quotations/{id}"),
            None,
        )
        .await;
    assert_eq!(data(&quotation)["quotation"]["status"], "converted");
    assert_eq!(data(&quotation)["quotation"]["order_id"], order_id.as_str());

    // A second conversion must not create another order.
    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/quotations/{id}/convert"),
            Some(json!({ "order_type": "printing" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            UserRole::Admin,
            Method::DELETE,
            &format!("/api/v1/quotations/{id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejection_needs_a_reason_and_notifies_the_author() {
    let app = TestApp::new().await;

    let (_, body) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/quotations",
            Some(quotation_body(true)),
        )
        .await;
    let id = data(&body)["quotation"]["id"]
        .as_str()
        .expect("id")
        .to_string();

    let (status, _) = app
        .call(
            UserRole::Ceo,
            Method::POST,
            &format!("/api/v1/quotations/{id}/reject"),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, rejected) = app
        .call(
            UserRole::Ceo,
            Method::POST,
            &format!("/api/v1/quotations/{id}/reject"),
            Some(json!({ "reason": "Price too low for the paper stock" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&rejected)["status"], "rejected");
    assert_eq!(
        data(&rejected)["rejection_reason"],
        "Price too low for the paper stock"
    );

    let (_, inbox) = app
        .call(UserRole::Sales, Method::GET, "/api/v1/notifications", None)
        .await;
    let kinds: Vec<&str> = data(&inbox)["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|n| n["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"quotation_reviewed"));

    // A rejected quotation can be reworked and submitted again.
    let (status, reworked) = app
        .call(
            UserRole::Sales,
            Method::PUT,
            &format!("/api/v1/quotations/{id}"),
            Some(json!({ "discount": "0" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&reworked)["quotation"]["status"], "draft");
    assert!(data(&reworked)["quotation"]["rejection_reason"].is_null());

    let (status, submitted) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/quotations/{id}/submit"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&submitted)["status"], "pending_approval");
}
