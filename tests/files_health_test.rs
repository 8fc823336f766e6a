mod common;

use axum::{
    body::to_bytes,
    http::{header, Method, StatusCode},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{data, data_str, response_json, TestApp};
use najd_api::entities::user::UserRole;
use serde_json::json;

#[tokio::test]
async fn upload_then_download_round_trip() {
    let app = TestApp::new().await;
    let content = b"%PDF-1.4 proof for the customer";

    let (status, stored) = app
        .call(
            UserRole::Designer,
            Method::POST,
            "/api/v1/files",
            Some(json!({
                "folder": "orders",
                "file_name": "proof v2.pdf",
                "content_base64": STANDARD.encode(content)
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{stored}");
    assert_eq!(data(&stored)["content_type"], "application/pdf");
    assert_eq!(data(&stored)["size_bytes"], content.len());
    let key = data_str(&stored, "key").to_string();
    assert!(key.starts_with("orders/"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/files/{key}"),
            None,
            Some(app.token(UserRole::Sales)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
        Some(&b"application/pdf"[..])
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("file body");
    assert_eq!(&body[..], &content[..]);

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::GET,
            "/api/v1/files/orders/does-not-exist.pdf",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploaded_file_attaches_to_an_order() {
    let app = TestApp::new().await;

    let (_, order) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_name": "Gulf Motors",
                "title": "Vehicle wraps",
                "order_type": "design",
                "quantity": 3,
                "total_amount": "4500"
            })),
        )
        .await;
    let order_id = data_str(&order, "id").to_string();

    let (_, stored) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/files",
            Some(json!({
                "folder": "orders",
                "file_name": "reference.png",
                "content_base64": STANDARD.encode([137u8, 80, 78, 71])
            })),
        )
        .await;
    let key = data_str(&stored, "key").to_string();

    let (status, attachment) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/attachments"),
            Some(json!({
                "kind": "reference",
                "storage_key": key,
                "file_name": "reference.png",
                "size_bytes": 4
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{attachment}");
    assert_eq!(data(&attachment)["content_type"], "image/png");

    // Keys must point at something that was actually uploaded.
    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/attachments"),
            Some(json!({
                "kind": "proof",
                "storage_key": "orders/missing.pdf",
                "file_name": "missing.pdf"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app
        .call(
            UserRole::Sales,
            Method::GET,
            &format!("/api/v1/orders/{order_id}/attachments"),
            None,
        )
        .await;
    assert_eq!(data(&listed).as_array().map(Vec::len), Some(1));

    // Deleting the order removes the stored file too.
    let (status, _) = app
        .call(
            UserRole::Admin,
            Method::DELETE,
            &format!("/api/v1/orders/{order_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .call(UserRole::Sales, Method::GET, &format!("/api/v1/files/{key}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_are_limited_and_validated() {
    let app = TestApp::with_config(|cfg| cfg.max_upload_bytes = 16).await;

    let (status, body) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/files",
            Some(json!({
                "file_name": "big.bin",
                "content_base64": STANDARD.encode([7u8; 64])
            })),
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{body}");

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/files",
            Some(json!({ "file_name": "bad.txt", "content_base64": "***" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/files",
            Some(json!({
                "folder": "../etc",
                "file_name": "x.txt",
                "content_base64": STANDARD.encode(b"hi")
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::GET,
            "/api/v1/files/orders/../../secret",
            None,
        )
        .await;
    assert!(status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoints_report_status() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");

    let response = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["database"]["status"], "up");

    let response = app.request(Method::GET, "/health/version", None, None).await;
    let body = response_json(response).await;
    assert_eq!(body["name"], "najd-api");
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response
            .headers()
            .get("x-content-type-options")
            .map(|v| v.as_bytes()),
        Some(&b"nosniff"[..])
    );
}

#[tokio::test]
async fn metrics_and_openapi_are_public() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/metrics", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = response_json(response).await;
    assert!(doc["paths"]["/api/v1/orders/{id}/status"].is_object());
}

#[tokio::test]
async fn dashboard_summarizes_the_shop() {
    let app = TestApp::new().await;

    app.call(
        UserRole::Sales,
        Method::POST,
        "/api/v1/orders",
        Some(json!({
            "customer_name": "Najd Clinic",
            "title": "Appointment cards",
            "order_type": "printing",
            "quantity": 1000,
            "total_amount": "350"
        })),
    )
    .await;

    let (status, summary) = app
        .call(UserRole::Admin, Method::GET, "/api/v1/dashboard", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&summary)["total_orders"], 1);
    assert_eq!(data(&summary)["active_orders"], 1);
    assert_eq!(data(&summary)["orders_by_status"]["new"], 1);
    assert_eq!(data(&summary)["orders_by_department"]["sales"], 1);
}
