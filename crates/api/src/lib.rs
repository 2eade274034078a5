// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Storefront API Library
//!
//! Customer and admin authentication for the storefront: account registration,
//! password login, rotating refresh tokens and role-guarded routes.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
