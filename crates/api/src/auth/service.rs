//! Auth flows: register, login, refresh, logout and admin login
//!
//! Per refresh token the lifecycle is `ACTIVE -> REDEEMED | EXPIRED | REVOKED_BY_LOGOUT`,
//! all terminal. Any redemption of a terminal token fails as an invalid refresh token.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::Serialize;
use time::Duration;
use uuid::Uuid;

use super::jwt::JwtManager;
use super::password::{self, generate_impossible_hash, PasswordError};
use super::refresh::RefreshTokenLedger;
use crate::error::{ApiError, ApiResult};
use crate::models::{normalize_email, Account, NewAccount, PublicAccount, Role};
use crate::store::{with_timeout, AccountStore, RefreshTokenStore, StoreError};

/// Lifetimes of issued credentials
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Registration input as received from the client, before normalization
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Result of a successful login or refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: PublicAccount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    Revoked,
    NotMatched,
}

#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    ledger: RefreshTokenLedger,
    jwt: JwtManager,
    policy: TokenPolicy,
    timeout: StdDuration,
    /// Verified against when the email is unknown so both failure paths cost the same
    dummy_hash: Arc<str>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        jwt: JwtManager,
        policy: TokenPolicy,
        timeout: StdDuration,
    ) -> Result<Self, PasswordError> {
        Ok(Self {
            accounts,
            ledger: RefreshTokenLedger::new(refresh_tokens, timeout),
            jwt,
            policy,
            timeout,
            dummy_hash: generate_impossible_hash()?.into(),
        })
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    async fn store_call<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        with_timeout(self.timeout, call).await
    }

    /// Argon2 is CPU-bound; keep it off the async workers
    async fn hash_password(&self, plaintext: &str) -> ApiResult<String> {
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || password::hash_password(&plaintext))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
            .map_err(ApiError::from)
    }

    async fn verify_password(&self, plaintext: &str, digest: &str) -> ApiResult<bool> {
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &digest))
            .await
            .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))
    }

    /// Resolve an account from a login attempt. Unknown email and wrong password are
    /// indistinguishable to the caller.
    async fn check_credentials(
        &self,
        account: Option<Account>,
        password: &str,
    ) -> ApiResult<Account> {
        match account {
            Some(account) => {
                if self.verify_password(password, &account.password_hash).await? {
                    Ok(account)
                } else {
                    Err(ApiError::InvalidCredentials)
                }
            }
            None => {
                let _ = self.verify_password(password, &self.dummy_hash).await?;
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    /// Create a customer account. The caller must log in separately.
    pub async fn register(&self, registration: Registration) -> ApiResult<Uuid> {
        let first_name = clean(registration.first_name);
        let last_name = clean(registration.last_name);
        let name = clean(registration.name).unwrap_or_else(|| {
            [first_name.as_deref(), last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        });
        let email = normalize_email(&registration.email);

        if name.is_empty() || email.is_empty() || registration.password.trim().is_empty() {
            return Err(ApiError::Validation(
                "name, email and password are required".to_string(),
            ));
        }

        let existing = self
            .store_call(self.accounts.count_active_accounts_by_email(Role::User, &email))
            .await?;
        if existing > 0 {
            return Err(ApiError::EmailTaken);
        }

        let password_hash = self.hash_password(&registration.password).await?;

        let account = self
            .store_call(self.accounts.insert_account(NewAccount {
                name,
                first_name,
                last_name,
                phone: clean(registration.phone),
                email,
                password_hash,
                role: Role::User,
            }))
            .await?;

        tracing::info!(account_id = %account.id, "Customer registered");
        Ok(account.id)
    }

    /// Issue an access token and a persisted refresh token for `account`
    async fn issue_session(&self, account: &Account) -> ApiResult<(AuthSession, Uuid)> {
        let access_token = self.jwt.issue_access_token(
            account.id,
            account.role,
            &account.email,
            self.policy.access_ttl,
        )?;
        let issued = self.ledger.issue(account.id, self.policy.refresh_ttl).await?;

        let session = AuthSession {
            access_token,
            refresh_token: issued.token,
            expires_in: self.policy.access_ttl.whole_seconds(),
            user: PublicAccount::from(account),
        };
        Ok((session, issued.record.id))
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        let email = normalize_email(email);
        if email.is_empty() || password.trim().is_empty() {
            return Err(ApiError::Validation(
                "email and password are required".to_string(),
            ));
        }

        let account = self
            .store_call(self.accounts.find_account_by_email(Role::User, &email))
            .await?;
        let account = match self.check_credentials(account, password).await {
            Ok(account) => account,
            Err(err) => {
                tracing::info!("Customer login rejected: invalid credentials");
                return Err(err);
            }
        };

        if !account.is_active {
            tracing::info!(account_id = %account.id, "Customer login rejected: inactive account");
            return Err(ApiError::AccountInactive);
        }

        let (session, refresh_id) = self.issue_session(&account).await?;
        tracing::info!(
            account_id = %account.id,
            refresh_token_id = %refresh_id,
            "Customer logged in"
        );
        Ok(session)
    }

    /// Exchange a refresh token for a new pair. The new refresh token is stored before
    /// the old one is retired, so a crash in between never leaves the client without a
    /// usable token.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<AuthSession> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(ApiError::Validation("refreshToken is required".to_string()));
        }

        let record = self.ledger.redeem(refresh_token).await?;

        let account = self
            .store_call(self.accounts.find_account_by_id(record.account_id))
            .await?
            .ok_or(ApiError::InvalidRefreshToken)?;

        if !account.is_active {
            tracing::info!(account_id = %account.id, "Refresh rejected: inactive account");
            return Err(ApiError::AccountInactive);
        }

        let (session, new_id) = self.issue_session(&account).await?;

        if !self.ledger.rotate(record.id, new_id).await? {
            // A concurrent refresh already spent this token; drop what we just minted
            self.ledger.discard(new_id).await?;
            return Err(ApiError::InvalidRefreshToken);
        }

        tracing::info!(
            account_id = %account.id,
            refresh_token_id = %new_id,
            "Session refreshed"
        );
        Ok(session)
    }

    pub async fn logout(&self, refresh_token: &str) -> ApiResult<LogoutOutcome> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(ApiError::Validation("refreshToken is required".to_string()));
        }

        if self.ledger.revoke(refresh_token).await? {
            tracing::info!("Refresh token revoked by logout");
            Ok(LogoutOutcome::Revoked)
        } else {
            Ok(LogoutOutcome::NotMatched)
        }
    }

    /// Admin login issues an access token only; admins get no refresh token.
    pub async fn admin_login(&self, email: &str, password: &str) -> ApiResult<String> {
        let email = normalize_email(email);
        if email.is_empty() || password.trim().is_empty() {
            return Err(ApiError::Validation(
                "email and password are required".to_string(),
            ));
        }

        let account = self
            .store_call(self.accounts.find_account_by_email(Role::Admin, &email))
            .await?;
        let account = self.check_credentials(account, password).await?;

        if !account.is_active {
            tracing::info!(account_id = %account.id, "Admin login rejected: inactive account");
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.jwt.issue_access_token(
            account.id,
            Role::Admin,
            &account.email,
            self.policy.access_ttl,
        )?;

        tracing::info!(account_id = %account.id, "Admin logged in");
        Ok(token)
    }

    /// Create the bootstrap admin unless an active admin with this email exists.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, email: &str, password: &str, name: &str) -> ApiResult<bool> {
        let email = normalize_email(email);
        let name = name.trim();
        if email.is_empty() || password.trim().is_empty() {
            return Err(ApiError::Validation(
                "bootstrap admin email and password are required".to_string(),
            ));
        }

        let existing = self
            .store_call(self.accounts.count_active_accounts_by_email(Role::Admin, &email))
            .await?;
        if existing > 0 {
            return Ok(false);
        }

        let password_hash = self.hash_password(password).await?;
        let result = self
            .store_call(self.accounts.insert_account(NewAccount {
                name: if name.is_empty() { "Administrator" } else { name }.to_string(),
                first_name: None,
                last_name: None,
                phone: None,
                email,
                password_hash,
                role: Role::Admin,
            }))
            .await;

        match result {
            Ok(account) => {
                tracing::info!(account_id = %account.id, "Bootstrap admin created");
                Ok(true)
            }
            // Another instance created it between the count and the insert
            Err(StoreError::Duplicate) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
