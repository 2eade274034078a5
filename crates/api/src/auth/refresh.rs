//! Refresh token ledger
//!
//! Refresh tokens are opaque 32-byte random secrets, hex-encoded. Only the SHA-256
//! digest is persisted. Each record moves from live to revoked exactly once: when it
//! is rotated, when it is found expired, or on logout. Rotation records the id of the
//! replacement.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::models::RefreshTokenRecord;
use crate::store::{with_timeout, RefreshTokenStore, StoreError};

/// Size of the random secret before hex encoding
pub const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Unknown or already revoked. Deliberately the same error for both.
    #[error("Refresh token not found")]
    NotFound,
    #[error("Refresh token expired")]
    Expired,
    #[error("Refresh token expiry out of range")]
    ExpiryOutOfRange,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A freshly minted refresh token. `token` is the only copy of the plaintext.
#[derive(Debug)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub record: RefreshTokenRecord,
}

#[derive(Clone)]
pub struct RefreshTokenLedger {
    store: Arc<dyn RefreshTokenStore>,
    timeout: StdDuration,
}

/// SHA-256 hex digest of a plaintext refresh token
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_refresh_secret() -> String {
    let bytes: [u8; REFRESH_TOKEN_BYTES] = rand::random();
    hex::encode(bytes)
}

impl RefreshTokenLedger {
    pub fn new(store: Arc<dyn RefreshTokenStore>, timeout: StdDuration) -> Self {
        Self { store, timeout }
    }

    /// Mint and persist a new refresh token for `account_id`
    pub async fn issue(
        &self,
        account_id: Uuid,
        ttl: Duration,
    ) -> Result<IssuedRefreshToken, LedgerError> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now
            .checked_add(ttl)
            .ok_or(LedgerError::ExpiryOutOfRange)?;
        let token = generate_refresh_secret();

        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            account_id,
            token_hash: hash_refresh_token(&token),
            expires_at,
            revoked: false,
            replaced_by: None,
            created_at: now,
        };

        with_timeout(self.timeout, self.store.insert_refresh_token(&record)).await?;

        tracing::debug!(
            account_id = %account_id,
            refresh_token_id = %record.id,
            expires_at = %record.expires_at,
            "Refresh token issued"
        );

        Ok(IssuedRefreshToken { token, record })
    }

    /// Look up a live record for the presented token.
    ///
    /// An expired record is revoked on the way out and reported as [`LedgerError::Expired`];
    /// any later presentation of it is [`LedgerError::NotFound`].
    pub async fn redeem(&self, token: &str) -> Result<RefreshTokenRecord, LedgerError> {
        let token_hash = hash_refresh_token(token);

        let record = with_timeout(self.timeout, self.store.find_live_refresh_token(&token_hash))
            .await?
            .ok_or(LedgerError::NotFound)?;

        if record.is_expired_at(OffsetDateTime::now_utc()) {
            let revoked =
                with_timeout(self.timeout, self.store.revoke_refresh_token(record.id, None))
                    .await?;
            tracing::info!(
                account_id = %record.account_id,
                refresh_token_id = %record.id,
                revoked = revoked,
                "Expired refresh token presented"
            );
            if !revoked {
                // Someone else spent it first
                return Err(LedgerError::NotFound);
            }
            return Err(LedgerError::Expired);
        }

        Ok(record)
    }

    /// Retire `old_id` in favor of `new_id`.
    ///
    /// Must only be called once `new_id` is durably stored. Returns false if the old
    /// record was already revoked, in which case this caller lost a concurrent redemption.
    pub async fn rotate(&self, old_id: Uuid, new_id: Uuid) -> Result<bool, LedgerError> {
        let rotated =
            with_timeout(self.timeout, self.store.revoke_refresh_token(old_id, Some(new_id)))
                .await?;

        if rotated {
            tracing::debug!(
                refresh_token_id = %old_id,
                replaced_by = %new_id,
                "Refresh token rotated"
            );
        } else {
            tracing::warn!(
                refresh_token_id = %old_id,
                "Refresh token rotation lost: record already revoked"
            );
        }

        Ok(rotated)
    }

    /// Revoke a live record without a replacement (cleanup of an orphaned mint)
    pub async fn discard(&self, id: Uuid) -> Result<bool, LedgerError> {
        Ok(with_timeout(self.timeout, self.store.revoke_refresh_token(id, None)).await?)
    }

    /// Revoke by plaintext. Returns whether a live record matched; unknown and already
    /// revoked tokens both return false.
    pub async fn revoke(&self, token: &str) -> Result<bool, LedgerError> {
        let token_hash = hash_refresh_token(token);
        Ok(with_timeout(self.timeout, self.store.revoke_refresh_token_by_hash(&token_hash)).await?)
    }
}
