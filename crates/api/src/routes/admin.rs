//! Admin routes
//!
//! Admins authenticate with an access token only. There is no admin refresh flow.

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use serde::Serialize;

use super::auth::{parse_body, LoginRequest, MeResponse};
use crate::{auth::AuthUser, error::ApiResult, state::AppState};

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AdminMeResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub user: MeResponse,
}

/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AdminLoginResponse>> {
    let req = parse_body(body)?;
    let token = state.auth.admin_login(&req.email, &req.password).await?;
    Ok(Json(AdminLoginResponse { token }))
}

/// GET /admin/me
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<AdminMeResponse> {
    Json(AdminMeResponse {
        ok: true,
        user: user.into(),
    })
}
