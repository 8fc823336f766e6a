/*!
 * # Authentication and Authorization Module
 *
 * Staff sign in with email and password and receive an HS256 JWT. Every
 * protected route runs [`auth_middleware`], which validates the token,
 * reloads the user row (so a disabled account is locked out immediately)
 * and stores an [`AuthUser`] in the request extensions. Route groups are
 * gated with [`AuthRouterExt::with_permission`]; handlers take `AuthUser`
 * as an extractor for finer checks against the role map in [`permissions`].
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

mod password;
pub mod permissions;

pub use password::{hash_password, validate_password_strength, verify_password};
pub use permissions::consts as perm;

use crate::config::AppConfig;
use crate::entities::user::{self, Department, UserRole};
use crate::errors::ServiceError;
use crate::i18n::AuthErrorCode;
use crate::services::users::UserProfile;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub department: Department,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub jti: String,
}

/// Authenticated user data, rebuilt from the database on every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub department: Department,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn from_model(model: &user::Model) -> Self {
        Self {
            user_id: model.id,
            name: model.name.clone(),
            email: model.email.clone(),
            role: model.role,
            department: model.department,
            permissions: permissions::permissions_for(model.role),
        }
    }

    /// Check if the user has a specific permission, honouring wildcards
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|granted| permissions::permission_matches(granted, permission))
    }

    /// `Forbidden` unless the user holds `permission`
    pub fn require(&self, permission: &str) -> Result<(), ServiceError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "Missing permission {permission}"
            )))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admin or CEO
    pub fn is_management(&self) -> bool {
        self.role.is_management()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ServiceError::Auth(AuthErrorCode::TokenMissing))
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_issuer: String, access_token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            access_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.jwt_issuer.clone(),
            cfg.jwt_expiration(),
        )
    }
}

/// Token returned by a successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Authentication service that handles login and token validation
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Signs a token for `user`
    pub fn issue_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now();
        let expires = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| ServiceError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            department: user.department,
            iat: now.timestamp(),
            exp: expires.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("token creation failed: {e}")))
    }

    /// Decodes and verifies a token. Expiry maps to `token_expired`, any
    /// other failure to `token_invalid`.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Auth(AuthErrorCode::TokenExpired)
            }
            _ => ServiceError::Auth(AuthErrorCode::TokenInvalid),
        })
    }

    /// Validates the token and loads the current state of its user.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Auth(AuthErrorCode::TokenInvalid))?;

        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::Auth(AuthErrorCode::TokenInvalid))?;

        if !user.active {
            return Err(ServiceError::Auth(AuthErrorCode::UserDisabled));
        }

        Ok(AuthUser::from_model(&user))
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ServiceError> {
        let email = email.trim().to_lowercase();
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await?;

        let user = match user {
            Some(user) => user,
            None => {
                debug!("Login attempt for unknown email");
                return Err(ServiceError::Auth(AuthErrorCode::InvalidCredentials));
            }
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(ServiceError::Auth(AuthErrorCode::InvalidCredentials));
        }

        if !user.active {
            warn!(user_id = %user.id, "Login refused: account disabled");
            return Err(ServiceError::Auth(AuthErrorCode::UserDisabled));
        }

        let mut active: user::ActiveModel = user.clone().into();
        active.last_login_at = Set(Some(Utc::now()));
        let user = active.update(&*self.db).await?;

        let access_token = self.issue_token(&user)?;
        info!(user_id = %user.id, role = %user.role, "User signed in");

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            user: UserProfile::from(user),
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Browsers cannot set headers on an `EventSource`, so the live feed passes
/// the token as `?access_token=`.
fn query_token(uri: &Uri) -> Option<String> {
    uri.query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("access_token="))
        .map(str::to_string)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware that validates the token and attaches [`AuthUser`]
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = bearer_token(request.headers())
        .or_else(|| query_token(request.uri()))
        .ok_or(ServiceError::Auth(AuthErrorCode::TokenMissing))?;

    let user = auth.authenticate(&token).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Rejects requests whose [`AuthUser`] lacks `permission`. Runs inside
/// [`auth_middleware`].
pub async fn permission_middleware(
    State(permission): State<&'static str>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(ServiceError::Auth(AuthErrorCode::TokenMissing))?;
    user.require(permission)?;
    Ok(next.run(request).await)
}

pub trait AuthRouterExt {
    /// Gates every route added so far behind `permission`.
    fn with_permission(self, permission: &'static str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_permission(self, permission: &'static str) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(
            permission,
            permission_middleware,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service_with(expiration: Duration) -> AuthService {
        let config = AuthConfig::new(
            "Zq8r1Lx0Vb7Tn3Wd5Ym2Kc9Hp4Js6Gf8Ue".to_string(),
            "najd-api".to_string(),
            expiration,
        );
        AuthService::new(config, Arc::new(DatabaseConnection::Disconnected))
    }

    fn sample_user() -> user::Model {
        let now = Utc::now();
        user::Model {
            id: Uuid::new_v4(),
            name: "Huda".to_string(),
            email: "huda@najd.test".to_string(),
            password_hash: String::new(),
            role: UserRole::Designer,
            department: Department::Design,
            phone: None,
            active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_round_trip_keeps_role() {
        let service = service_with(Duration::from_secs(600));
        let user = sample_user();
        let token = service.issue_token(&user).unwrap();
        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, UserRole::Designer);
        assert_eq!(claims.department, Department::Design);
    }

    #[test]
    fn tampered_and_foreign_tokens_are_invalid() {
        let service = service_with(Duration::from_secs(600));
        let token = service.issue_token(&sample_user()).unwrap();
        let tampered = format!("{token}x");
        assert_matches!(
            service.validate_token(&tampered),
            Err(ServiceError::Auth(AuthErrorCode::TokenInvalid))
        );

        let other = AuthService::new(
            AuthConfig::new(
                "Pw3Nc8Ve1Rt6Yu0Io5As9Df2Gh7Jk4Lz".to_string(),
                "najd-api".to_string(),
                Duration::from_secs(600),
            ),
            Arc::new(DatabaseConnection::Disconnected),
        );
        assert_matches!(
            other.validate_token(&token),
            Err(ServiceError::Auth(AuthErrorCode::TokenInvalid))
        );
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let service = service_with(Duration::from_secs(600));
        let user = sample_user();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name,
            email: user.email,
            role: user.role,
            department: user.department,
            iat: now - 7200,
            exp: now - 3600,
            iss: "najd-api".to_string(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"Zq8r1Lx0Vb7Tn3Wd5Ym2Kc9Hp4Js6Gf8Ue"),
        )
        .unwrap();
        assert_matches!(
            service.validate_token(&token),
            Err(ServiceError::Auth(AuthErrorCode::TokenExpired))
        );
    }

    #[test]
    fn token_sources() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        let uri: Uri = "/api/v1/events?foo=1&access_token=xyz.123".parse().unwrap();
        assert_eq!(query_token(&uri).as_deref(), Some("xyz.123"));
        let uri: Uri = "/api/v1/events".parse().unwrap();
        assert_eq!(query_token(&uri), None);
    }

    #[test]
    fn permissions_follow_role() {
        let designer = AuthUser::from_model(&sample_user());
        assert!(designer.has_permission(perm::ORDERS_UPDATE_STATUS));
        assert!(!designer.has_permission(perm::ORDERS_READ_ALL));
        assert_matches!(
            designer.require(perm::INVOICES_READ),
            Err(ServiceError::Forbidden(_))
        );
    }
}
