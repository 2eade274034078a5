//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailure(String),
}

/// Hash a password with Argon2id (default parameters, random 16-byte salt).
///
/// Returns a PHC-formatted string safe for storage.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailure(e.to_string()))
}

/// Verify a password against a stored PHC hash.
///
/// A mismatch, or a stored value that is not a valid PHC string, yields `false`.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = match PasswordHash::new(password_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is not a valid PHC string");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hash of a random secret nobody knows.
///
/// Login checks an unknown email against this so both failure paths do the same work.
pub fn generate_impossible_hash() -> Result<String, PasswordError> {
    let secret: [u8; 32] = rand::random();
    hash_password(&hex::encode(secret))
}
