//! Customer authentication routes

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{AuthSession, AuthUser, LogoutOutcome, Registration},
    error::{ApiError, ApiResult},
    models::Role,
    state::AppState,
};

/// Unwrap a JSON body, collapsing every rejection into one client-facing error
pub(crate) fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected request body");
            Err(ApiError::Validation("invalid body".to_string()))
        }
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            name: req.name,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
            phone: req.phone,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<AuthUser> for MeResponse {
    fn from(user: AuthUser) -> Self {
        MeResponse {
            id: user.account_id,
            role: user.role,
            email: user.email,
            expires_at: user.expires_at,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let req = parse_body(body)?;
    state.auth.register(req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully",
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthSession>> {
    let req = parse_body(body)?;
    let session = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(session))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<AuthSession>> {
    let req = parse_body(body)?;
    let session = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(session))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let req = parse_body(body)?;

    match state.auth.logout(&req.refresh_token).await? {
        LogoutOutcome::Revoked => Ok(Json(MessageResponse {
            message: "logged out",
        })),
        LogoutOutcome::NotMatched => Err(ApiError::InvalidRefreshToken),
    }
}

/// GET /auth/me
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(user.into())
}
