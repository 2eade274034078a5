//! Application state

use std::sync::Arc;

use crate::{
    auth::{
        password::PasswordError, AuthService, AuthState, JwtError, JwtManager, TokenPolicy,
    },
    config::Config,
    store::{AccountStore, MemoryStore, RefreshTokenStore},
};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Invalid signing key: {0}")]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jwt_manager: JwtManager,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(
        config: Config,
        accounts: Arc<dyn AccountStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> Result<Self, StateError> {
        let jwt_manager = JwtManager::new(&config.jwt_secret)?;

        let policy = TokenPolicy {
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        };
        tracing::info!(
            access_ttl_secs = policy.access_ttl.whole_seconds(),
            refresh_ttl_secs = policy.refresh_ttl.whole_seconds(),
            "Token policy configured"
        );

        let auth = AuthService::new(
            accounts,
            refresh_tokens,
            jwt_manager.clone(),
            policy,
            config.db_timeout,
        )?;

        Ok(Self {
            config,
            jwt_manager,
            auth,
        })
    }

    /// State backed by the in-process store
    pub fn in_memory(config: Config) -> Result<Self, StateError> {
        let store = MemoryStore::new();
        Self::new(config, Arc::new(store.clone()), Arc::new(store))
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}
