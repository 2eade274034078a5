//! Authentication module for the storefront API

#[cfg(test)]
mod edge_case_tests;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod refresh;
pub mod service;

pub use jwt::{AccessClaims, JwtError, JwtManager};
pub use middleware::{require_admin, require_user, AuthError, AuthState, AuthUser};
pub use password::{generate_impossible_hash, hash_password, verify_password};
pub use refresh::{hash_refresh_token, LedgerError, RefreshTokenLedger};
pub use service::{AuthService, AuthSession, LogoutOutcome, Registration, TokenPolicy};
