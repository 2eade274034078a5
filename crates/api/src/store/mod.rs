//! Credential and refresh token persistence
//!
//! The auth subsystem talks to storage only through these traits. Two backends exist:
//! [`PgStore`] for Postgres and [`MemoryStore`] for local runs and tests. Both must
//! honor the same conditional-update semantics: a refresh token revoke only succeeds
//! while the record is still unrevoked.

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Account, NewAccount, RefreshTokenRecord, Role};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unique constraint violated")]
    Duplicate,
    #[error("Store call timed out")]
    Timeout,
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new active account. Fails with [`StoreError::Duplicate`] if an active
    /// account with the same role and email already exists.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Look up by normalized email. Active accounts win over deactivated ones.
    async fn find_account_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn count_active_accounts_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<i64, StoreError>;

    /// Returns false if no account has this id
    async fn set_account_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), StoreError>;

    /// Find an unrevoked record by token hash
    async fn find_live_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Mark the record revoked (and set its replacement) only if it is still unrevoked.
    /// Returns whether this call performed the transition.
    async fn revoke_refresh_token(
        &self,
        id: Uuid,
        replaced_by: Option<Uuid>,
    ) -> Result<bool, StoreError>;

    /// Conditional revoke keyed by token hash
    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<bool, StoreError>;
}

/// Bound a store call by `limit`. Expiry surfaces as [`StoreError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(StoreError::Timeout)
        }
    }
}
