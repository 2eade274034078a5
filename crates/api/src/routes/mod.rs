//! HTTP routes

pub mod admin;
pub mod auth;
#[cfg(test)]
mod tests;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    auth::{require_admin, require_user},
    state::AppState,
};

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/admin/login", post(admin::login));

    let customer = Router::new()
        .route("/auth/me", get(auth::me))
        .route_layer(from_fn_with_state(auth_state.clone(), require_user));

    let admin = Router::new()
        .route("/admin/me", get(admin::me))
        .route_layer(from_fn_with_state(auth_state, require_admin));

    public.merge(customer).merge(admin).with_state(state)
}
