//! Router tests against the in-process store

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::create_router;
use crate::{config::Config, state::AppState};

const SECRET: &str = "router-test-secret-at-least-32-bytes-long";

fn test_state() -> AppState {
    let config = Config::from_vars(|key| match key {
        "JWT_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .unwrap();
    AppState::in_memory(config).unwrap()
}

fn app() -> (Router, AppState) {
    let state = test_state();
    (create_router(state.clone()), state)
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(router, Method::POST, uri, Some(body), None).await
}

async fn register_jane(router: &Router) {
    let (status, body) = post_json(
        router,
        "/auth/register",
        json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "email": "jane@x.com",
            "password": "secret123"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

async fn login_jane(router: &Router) -> Value {
    let (status, body) = post_json(
        router,
        "/auth/login",
        json!({ "email": "jane@x.com", "password": "secret123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn test_health() {
    let (router, _) = app();
    let (status, body) = send(&router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_customer_session_lifecycle() {
    let (router, _) = app();
    register_jane(&router).await;

    // Email is matched after trimming and lowercasing
    let (status, login) = post_json(
        &router,
        "/auth/login",
        json!({ "email": "JANE@X.COM ", "password": "secret123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{login}");
    assert!(!login["accessToken"].as_str().unwrap().is_empty());
    assert_eq!(login["expiresIn"], 1200);
    assert_eq!(login["user"]["email"], "jane@x.com");
    assert_eq!(login["user"]["name"], "Jane Doe");
    assert!(login["user"].get("passwordHash").is_none());

    let old_refresh = login["refreshToken"].as_str().unwrap().to_string();

    let (status, refreshed) =
        post_json(&router, "/auth/refresh", json!({ "refreshToken": old_refresh })).await;
    assert_eq!(status, StatusCode::OK, "{refreshed}");
    assert_ne!(refreshed["refreshToken"], login["refreshToken"]);
    assert!(!refreshed["accessToken"].as_str().unwrap().is_empty());

    let (status, body) =
        post_json(&router, "/auth/refresh", json!({ "refreshToken": old_refresh })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid refresh token");
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let (router, _) = app();
    register_jane(&router).await;

    let (status, body) = post_json(
        &router,
        "/auth/register",
        json!({ "name": "Other", "email": " Jane@X.com", "password": "pw" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email already registered");
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn test_invalid_bodies() {
    let (router, _) = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = post_json(&router, "/auth/login", json!({ "email": "a@x.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid body");

    let (status, body) = post_json(
        &router,
        "/auth/login",
        json!({ "email": "  ", "password": "pw" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email and password are required");
}

#[tokio::test]
async fn test_login_failures_share_shape() {
    let (router, _) = app();
    register_jane(&router).await;

    let (wrong_status, wrong) = post_json(
        &router,
        "/auth/login",
        json!({ "email": "jane@x.com", "password": "nope" }),
    )
    .await;
    let (unknown_status, unknown) = post_json(
        &router,
        "/auth/login",
        json!({ "email": "ghost@x.com", "password": "secret123" }),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn test_logout_then_refresh() {
    let (router, _) = app();
    register_jane(&router).await;
    let login = login_jane(&router).await;
    let refresh = login["refreshToken"].clone();

    let (status, body) = post_json(&router, "/auth/logout", json!({ "refreshToken": refresh })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "logged out");

    let (status, _) = post_json(&router, "/auth/logout", json!({ "refreshToken": refresh })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        post_json(&router, "/auth/refresh", json!({ "refreshToken": refresh })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid refresh token");
}

#[tokio::test]
async fn test_customer_me_requires_user_token() {
    let (router, _) = app();
    register_jane(&router).await;
    let login = login_jane(&router).await;
    let access = login["accessToken"].as_str().unwrap();

    let (status, me) = send(&router, Method::GET, "/auth/me", None, Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], login["user"]["id"]);
    assert_eq!(me["role"], "user");
    assert_eq!(me["email"], "jane@x.com");
    assert!(me["expiresAt"].is_string());

    let (status, _) = send(&router, Method::GET, "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A customer token never opens admin routes
    let (status, body) = send(&router, Method::GET, "/admin/me", None, Some(access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_admin_login_and_me() {
    let (router, state) = app();
    state
        .auth
        .ensure_admin("root@x.com", "adminpass", "Root")
        .await
        .unwrap();

    let (status, body) = post_json(
        &router,
        "/admin/login",
        json!({ "email": "ROOT@x.com", "password": "adminpass" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.get("refreshToken").is_none());
    let token = body["token"].as_str().unwrap();

    let (status, me) = send(&router, Method::GET, "/admin/me", None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["ok"], true);
    assert_eq!(me["role"], "admin");
    assert_eq!(me["email"], "root@x.com");

    let (status, _) = send(&router, Method::GET, "/auth/me", None, Some(token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_json(
        &router,
        "/admin/login",
        json!({ "email": "root@x.com", "password": "wrong" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid credentials");
}

#[tokio::test]
async fn test_expired_access_token_body() {
    let (router, state) = app();
    let token = state
        .jwt_manager
        .issue_access_token(
            uuid::Uuid::new_v4(),
            crate::models::Role::User,
            "jane@x.com",
            time::Duration::seconds(-10),
        )
        .unwrap();

    let (status, body) = send(&router, Method::GET, "/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_expired");
}
