#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use najd_api::{
    app_router,
    config::AppConfig,
    db,
    entities::user::UserRole,
    events::{self, EventHub},
    services::users::{CreateUserRequest, UserProfile},
    storage::LocalObjectStore,
    AppState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "workshop2024";

/// A seeded staff member with a ready bearer token.
#[derive(Clone)]
pub struct Staff {
    pub profile: UserProfile,
    pub token: String,
}

impl Staff {
    pub fn id(&self) -> String {
        self.profile.id.to_string()
    }
}

/// Test application wrapper: the full router over an in-memory database,
/// one signed-in user per role, and a throwaway storage directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    staff: HashMap<UserRole, Staff>,
    _storage_dir: TempDir,
    _event_task: JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller tweak the configuration.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let storage_dir = tempfile::tempdir().expect("temp storage dir");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "integration-test-secret-that-is-long-enough".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.storage_root = storage_dir.path().to_string_lossy().into_owned();
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("connect to in-memory sqlite");
        db::run_migrations(&pool).await.expect("run migrations");
        let db_arc = Arc::new(pool);

        // The processor must run or publishers block once the channel fills.
        let (event_sender, event_rx) = events::channel(cfg.event_channel_capacity);
        let event_hub = EventHub::new(64);
        let event_task = tokio::spawn(events::process_events(event_rx, event_hub.clone()));

        let storage = Arc::new(LocalObjectStore::new(storage_dir.path()));
        let state = AppState::new(db_arc, cfg, event_sender, event_hub, storage);

        let mut staff = HashMap::new();
        for (role, name, email) in [
            (UserRole::Admin, "Admin User", "admin@najd.test"),
            (UserRole::Ceo, "Ceo User", "ceo@najd.test"),
            (UserRole::Accountant, "Accountant User", "accountant@najd.test"),
            (UserRole::Sales, "Sales User", "sales@najd.test"),
            (UserRole::Designer, "Designer User", "designer@najd.test"),
            (UserRole::Printing, "Printer User", "printer@najd.test"),
            (UserRole::Inventory, "Inventory User", "inventory@najd.test"),
        ] {
            let profile = state
                .services
                .users
                .create_user(CreateUserRequest {
                    name: name.to_string(),
                    email: email.to_string(),
                    password: TEST_PASSWORD.to_string(),
                    role,
                    department: None,
                    phone: None,
                })
                .await
                .expect("seed user");
            let token = state
                .auth
                .login(email, TEST_PASSWORD)
                .await
                .expect("login seeded user")
                .access_token;
            staff.insert(role, Staff { profile, token });
        }

        let router = app_router(state.clone());

        Self {
            router,
            state,
            staff,
            _storage_dir: storage_dir,
            _event_task: event_task,
        }
    }

    pub fn staff(&self, role: UserRole) -> &Staff {
        self.staff.get(&role).expect("seeded role")
    }

    pub fn token(&self, role: UserRole) -> &str {
        &self.staff(role).token
    }

    /// Adds another user and signs them in.
    pub async fn add_staff(&self, role: UserRole, name: &str, email: &str) -> Staff {
        let profile = self
            .state
            .services
            .users
            .create_user(CreateUserRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
                role,
                department: None,
                phone: None,
            })
            .await
            .expect("create extra user");
        let token = self
            .state
            .auth
            .login(email, TEST_PASSWORD)
            .await
            .expect("login extra user")
            .access_token;
        Staff { profile, token }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Authenticated request returning the status and parsed JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn call(
        &self,
        role: UserRole,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let token = self.token(role).to_string();
        self.call_as(&token, method, uri, body).await
    }

    pub async fn call_as(
        &self,
        token: &str,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, Some(token)).await;
        let status = response.status();
        (status, response_json(response).await)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is json")
    }
}

/// The `data` payload of a successful `ApiResponse`.
pub fn data(body: &Value) -> &Value {
    &body["data"]
}

/// A string field of the `data` payload.
pub fn data_str<'a>(body: &'a Value, field: &str) -> &'a str {
    body["data"][field]
        .as_str()
        .unwrap_or_else(|| panic!("missing string field {field} in {body}"))
}

/// Reads a money field, which is serialized as a decimal string.
pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap_or_else(|_| panic!("bad decimal {s}")),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("numeric decimal"),
        other => panic!("expected a decimal, got {other}"),
    }
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal literal")
}
