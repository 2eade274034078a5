//! Role guard middleware for Axum
//!
//! Verifies the bearer access token on protected routes and checks its role claim.
//! Purely stateless: the refresh token ledger is never consulted here.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use super::jwt::{JwtError, JwtManager};
use crate::models::Role;

/// Authenticated caller extracted from a verified access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: Uuid,
    pub role: Role,
    pub email: String,
    pub expires_at: OffsetDateTime,
}

/// State needed for authentication
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid authentication format")]
    InvalidAuthFormat,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Role mismatch")]
    RoleMismatch,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Every guard failure is a 401; only expiry gets its own body so clients refresh
        let message = match self {
            AuthError::TokenExpired => "token_expired",
            _ => "unauthorized",
        };
        let status = StatusCode::UNAUTHORIZED;

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
///
/// Exactly two whitespace-separated parts are required; the scheme is case-insensitive.
pub fn extract_bearer_token(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::InvalidAuthFormat),
    }
}

/// Verify the request's bearer token and require `expected` as its role
pub fn authorize(
    jwt_manager: &JwtManager,
    header: Option<&str>,
    expected: Role,
) -> Result<AuthUser, AuthError> {
    let header = header.ok_or(AuthError::MissingAuth)?;
    let token = extract_bearer_token(header)?;

    let claims = jwt_manager.verify_access_token(token).map_err(|e| match e {
        JwtError::Expired => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    if claims.role != expected {
        return Err(AuthError::RoleMismatch);
    }

    let expires_at =
        OffsetDateTime::from_unix_timestamp(claims.exp).map_err(|_| AuthError::InvalidToken)?;

    Ok(AuthUser {
        account_id: claims.sub,
        role: claims.role,
        email: claims.email,
        expires_at,
    })
}

async fn guard(auth_state: &AuthState, expected: Role, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match authorize(&auth_state.jwt_manager, header, expected) {
        Ok(auth_user) => {
            tracing::debug!(
                path = %path,
                account_id = %auth_user.account_id,
                role = %auth_user.role,
                "Role guard passed"
            );
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(path = %path, expected_role = %expected, error = ?err, "Role guard rejected request");
            err.into_response()
        }
    }
}

/// Middleware that requires a customer access token
pub async fn require_user(
    State(auth_state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    guard(&auth_state, Role::User, request, next).await
}

/// Middleware that requires an admin access token
pub async fn require_admin(
    State(auth_state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    guard(&auth_state, Role::Admin, request, next).await
}
