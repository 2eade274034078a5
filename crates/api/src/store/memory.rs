//! In-process store
//!
//! Used when no `DATABASE_URL` is configured and by the test suite. Each mutation
//! takes the write lock, so check-then-write sequences are atomic per call, matching
//! the single-statement guarantees of the Postgres backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, RefreshTokenStore, StoreError};
use crate::models::{Account, NewAccount, RefreshTokenRecord, Role};

#[derive(Clone, Default)]
pub struct MemoryStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
    refresh_tokens: Arc<RwLock<HashMap<Uuid, RefreshTokenRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a refresh token record regardless of state
    pub async fn refresh_token_by_id(&self, id: Uuid) -> Option<RefreshTokenRecord> {
        self.refresh_tokens.read().await.get(&id).cloned()
    }

    /// Snapshot of every refresh token record owned by `account_id`
    pub async fn refresh_tokens_for_account(&self, account_id: Uuid) -> Vec<RefreshTokenRecord> {
        let mut records: Vec<_> = self
            .refresh_tokens
            .read()
            .await
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        records
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;

        let taken = accounts
            .values()
            .any(|a| a.is_active && a.role == account.role && a.email == account.email);
        if taken {
            return Err(StoreError::Duplicate);
        }

        let account = account.into_account(OffsetDateTime::now_utc());
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .filter(|a| a.role == role && a.email == email)
            .max_by_key(|a| (a.is_active, a.created_at))
            .cloned())
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn count_active_accounts_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<i64, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .filter(|a| a.is_active && a.role == role && a.email == email)
            .count() as i64)
    }

    async fn set_account_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;

        if active {
            // Reactivation must not break the one-active-account-per-email rule
            let Some(target) = accounts.get(&id) else {
                return Ok(false);
            };
            let (role, email) = (target.role, target.email.clone());
            let conflict = accounts
                .values()
                .any(|a| a.id != id && a.is_active && a.role == role && a.email == email);
            if conflict {
                return Err(StoreError::Duplicate);
            }
        }

        match accounts.get_mut(&id) {
            Some(account) => {
                account.is_active = active;
                account.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        let mut tokens = self.refresh_tokens.write().await;

        if tokens.values().any(|r| r.token_hash == record.token_hash) {
            return Err(StoreError::Duplicate);
        }

        tokens.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_live_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let tokens = self.refresh_tokens.read().await;
        Ok(tokens
            .values()
            .find(|r| !r.revoked && r.token_hash == token_hash)
            .cloned())
    }

    async fn revoke_refresh_token(
        &self,
        id: Uuid,
        replaced_by: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        match tokens.get_mut(&id) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                record.replaced_by = replaced_by;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        match tokens
            .values_mut()
            .find(|r| !r.revoked && r.token_hash == token_hash)
        {
            Some(record) => {
                record.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
