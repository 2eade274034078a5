//! Access token signing and verification
//!
//! Access tokens are HS256 JWTs carrying a fixed claim set. They are never persisted
//! and there is no revocation list: validity is signature plus expiry, so the access
//! TTL bounds exposure.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::models::Role;

/// 256 bits minimum for an HMAC-SHA256 key
pub const MIN_SECRET_LENGTH: usize = 32;

/// Only algorithm accepted on verification
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Account id
    pub sub: Uuid,
    pub role: Role,
    pub email: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("algorithm", &JWT_ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    /// Build a manager from the shared signing secret.
    ///
    /// Secrets shorter than [`MIN_SECRET_LENGTH`] bytes are refused.
    pub fn new(secret: &str) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(JwtError::Signing(format!(
                "secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }

        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Issue an access token expiring `ttl` from now
    pub fn issue_access_token(
        &self,
        account_id: Uuid,
        role: Role,
        email: &str,
        ttl: Duration,
    ) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| JwtError::Signing("token expiry out of range".to_string()))?;
        let claims = AccessClaims {
            sub: account_id,
            role,
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        self.sign(&claims)
    }

    pub(crate) fn sign(&self, claims: &AccessClaims) -> Result<String, JwtError> {
        encode(&Header::new(JWT_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    /// Verify signature, algorithm, claim shape and expiry.
    ///
    /// Expiry is reported separately so callers can hint the client to refresh.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid,
            })
    }
}
