mod common;

use axum::http::{Method, StatusCode};
use common::{data, data_str, response_json, TestApp, TEST_PASSWORD};
use najd_api::entities::user::UserRole;
use serde_json::json;

#[tokio::test]
async fn login_returns_token_and_profile() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "Sales@Najd.test", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(data(&body)["token_type"], "Bearer");
    assert_eq!(data(&body)["user"]["role"], "sales");
    assert!(data(&body)["user"].get("password_hash").is_none());

    let token = data_str(&body, "access_token").to_string();
    let (status, me) = app
        .call_as(&token, Method::GET, "/api/v1/auth/me", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&me)["user"]["email"], "sales@najd.test");
    let permissions: Vec<&str> = data(&me)["permissions"]
        .as_array()
        .expect("permissions array")
        .iter()
        .filter_map(|p| p.as_str())
        .collect();
    assert!(permissions.contains(&"orders:create"));
}

#[tokio::test]
async fn wrong_password_is_rejected_with_code() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "sales@najd.test", "password": "not-the-password1" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["code"], "invalid_credentials");
}

#[tokio::test]
async fn missing_or_garbage_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/orders", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_route_is_not_found_even_without_token() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/v1/does-not-exist", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_permissions_gate_routes() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(UserRole::Designer, Method::GET, "/api/v1/dashboard", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(UserRole::Ceo, Method::GET, "/api/v1/dashboard", None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(UserRole::Sales, Method::GET, "/api/v1/users", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(UserRole::Inventory, Method::GET, "/api/v1/invoices", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Session routes need no specific permission.
    let (status, _) = app
        .call(UserRole::Printing, Method::GET, "/api/v1/notifications", None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_manages_users_and_deactivation_revokes_access() {
    let app = TestApp::new().await;

    let (status, created) = app
        .call(
            UserRole::Admin,
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "New Designer",
                "email": "new.designer@najd.test",
                "password": TEST_PASSWORD,
                "role": "designer"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data(&created)["department"], "design");
    let user_id = data_str(&created, "id").to_string();

    let (status, _) = app
        .call(
            UserRole::Admin,
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Duplicate",
                "email": "new.designer@najd.test",
                "password": TEST_PASSWORD,
                "role": "sales"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let login = app
        .state
        .auth
        .login("new.designer@najd.test", TEST_PASSWORD)
        .await
        .expect("login new designer");

    let (status, updated) = app
        .call(
            UserRole::Admin,
            Method::PUT,
            &format!("/api/v1/users/{user_id}"),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&updated)["active"], false);

    let (status, body) = app
        .call_as(&login.access_token, Method::GET, "/api/v1/auth/me", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "user_disabled");
}

#[tokio::test]
async fn weak_new_password_is_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/auth/change-password",
            Some(json!({ "current_password": TEST_PASSWORD, "new_password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            UserRole::Sales,
            Method::POST,
            "/api/v1/auth/change-password",
            Some(json!({ "current_password": TEST_PASSWORD, "new_password": "brandnew2025" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.state
        .auth
        .login("sales@najd.test", "brandnew2025")
        .await
        .expect("login with the new password");
}
