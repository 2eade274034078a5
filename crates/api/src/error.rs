//! API error types
//!
//! Every domain failure is translated here into a status code and a short error
//! string. Internal details are logged, never sent to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::auth::refresh::LedgerError;
use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account is inactive")]
    AccountInactive,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::EmailTaken => StatusCode::CONFLICT,
            ApiError::InvalidCredentials
            | ApiError::InvalidRefreshToken
            | ApiError::TokenExpired
            | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::AccountInactive => StatusCode::FORBIDDEN,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short client-facing message
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::EmailTaken => "email already registered".to_string(),
            ApiError::InvalidCredentials => "invalid credentials".to_string(),
            ApiError::AccountInactive => "user is inactive".to_string(),
            ApiError::InvalidRefreshToken => "invalid refresh token".to_string(),
            ApiError::TokenExpired => "token_expired".to_string(),
            ApiError::Unauthorized => "unauthorized".to_string(),
            ApiError::Unavailable(_) => "service temporarily unavailable".to_string(),
            ApiError::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Unavailable(detail) => {
                tracing::warn!(detail = %detail, "Request failed: backend unavailable");
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "Request failed: internal error");
            }
            _ => {}
        }

        let body = Json(json!({
            "error": self.public_message(),
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => ApiError::Unavailable("store call timed out".to_string()),
            StoreError::Duplicate => ApiError::EmailTaken,
            StoreError::Backend(detail) => ApiError::Unavailable(detail),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound => ApiError::InvalidRefreshToken,
            LedgerError::Expired => ApiError::TokenExpired,
            LedgerError::ExpiryOutOfRange => {
                ApiError::Internal("refresh token expiry out of range".to_string())
            }
            // A refresh token hash collision is not an email conflict
            LedgerError::Store(StoreError::Duplicate) => {
                ApiError::Internal("refresh token hash collision".to_string())
            }
            LedgerError::Store(e) => e.into(),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::TokenExpired,
            JwtError::Invalid => ApiError::Unauthorized,
            JwtError::Signing(detail) => ApiError::Internal(format!("token signing failed: {detail}")),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
