//! Edge case tests for the authentication system
//!
//! Tests boundary conditions and races in:
//! - Access token handling (expiry, algorithm, secret strength)
//! - Refresh token ledger (single use, expiry, concurrent rotation)

#[cfg(test)]
mod jwt_tests {
    use super::super::jwt::*;
    use crate::models::Role;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    const SECRET: &str = "edge-case-secret-with-at-least-32-bytes!";

    fn claims(exp_offset: Duration) -> AccessClaims {
        let now = OffsetDateTime::now_utc();
        AccessClaims {
            sub: Uuid::new_v4(),
            role: Role::User,
            email: "a@x.com".into(),
            iat: now.unix_timestamp(),
            exp: (now + exp_offset).unix_timestamp(),
        }
    }

    #[test]
    fn test_fresh_token_round_trips_claims() {
        let manager = JwtManager::new(SECRET).unwrap();
        let expected = claims(Duration::minutes(20));
        let token = manager.sign(&expected).unwrap();

        assert_eq!(manager.verify_access_token(&token).unwrap(), expected);
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let manager = JwtManager::new(SECRET).unwrap();
        let token = manager.sign(&claims(Duration::seconds(-1))).unwrap();

        assert_eq!(manager.verify_access_token(&token), Err(JwtError::Expired));
    }

    #[test]
    fn test_no_leeway_on_expiry() {
        // Default jsonwebtoken leeway is 60s; a token 30s past expiry must still fail
        let manager = JwtManager::new(SECRET).unwrap();
        let token = manager.sign(&claims(Duration::seconds(-30))).unwrap();

        assert_eq!(manager.verify_access_token(&token), Err(JwtError::Expired));
    }

    #[test]
    fn test_other_hmac_algorithm_rejected() {
        let manager = JwtManager::new(SECRET).unwrap();
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims(Duration::minutes(5)),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(manager.verify_access_token(&token), Err(JwtError::Invalid));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new(SECRET).unwrap();
        let verifier = JwtManager::new("a-completely-different-secret-value-000").unwrap();
        let token = issuer.sign(&claims(Duration::minutes(5))).unwrap();

        assert_eq!(verifier.verify_access_token(&token), Err(JwtError::Invalid));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let manager = JwtManager::new(SECRET).unwrap();
        let token = manager.sign(&claims(Duration::minutes(5))).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = manager.sign(&AccessClaims {
            role: Role::Admin,
            ..claims(Duration::minutes(5))
        });
        let forged = forged.unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;

        assert_eq!(
            manager.verify_access_token(&parts.join(".")),
            Err(JwtError::Invalid)
        );
    }

    #[test]
    fn test_garbage_rejected() {
        let manager = JwtManager::new(SECRET).unwrap();
        for token in ["", "abc", "a.b.c", "..."] {
            assert_eq!(manager.verify_access_token(token), Err(JwtError::Invalid));
        }
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtManager::new("").is_err());
        assert!(JwtManager::new(&"x".repeat(MIN_SECRET_LENGTH - 1)).is_err());
        assert!(JwtManager::new(&"x".repeat(MIN_SECRET_LENGTH)).is_ok());
    }

    #[test]
    fn test_issue_sets_expiry_from_ttl() {
        let manager = JwtManager::new(SECRET).unwrap();
        let token = manager
            .issue_access_token(Uuid::new_v4(), Role::Admin, "root@x.com", Duration::minutes(20))
            .unwrap();
        let claims = manager.verify_access_token(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, 20 * 60);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_issue_with_unrepresentable_expiry_fails() {
        let manager = JwtManager::new(SECRET).unwrap();
        let result =
            manager.issue_access_token(Uuid::new_v4(), Role::User, "a@x.com", Duration::MAX);
        assert!(matches!(result, Err(JwtError::Signing(_))));
    }
}

#[cfg(test)]
mod ledger_tests {
    use super::super::refresh::*;
    use crate::store::{MemoryStore, RefreshTokenStore};
    use std::sync::Arc;
    use std::time::Duration as StdDuration;
    use time::Duration;
    use uuid::Uuid;

    fn ledger(store: &MemoryStore) -> RefreshTokenLedger {
        RefreshTokenLedger::new(Arc::new(store.clone()), StdDuration::from_secs(5))
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        let hash = hash_refresh_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_issue_persists_hash_only() {
        let store = MemoryStore::new();
        let issued = ledger(&store)
            .issue(Uuid::new_v4(), Duration::days(7))
            .await
            .unwrap();

        assert_eq!(issued.token.len(), REFRESH_TOKEN_BYTES * 2);
        let stored = store.refresh_token_by_id(issued.record.id).await.unwrap();
        assert_eq!(stored.token_hash, hash_refresh_token(&issued.token));
        assert_ne!(stored.token_hash, issued.token);
        assert!(!stored.revoked);
    }

    #[tokio::test]
    async fn test_issue_with_unrepresentable_expiry_fails() {
        let store = MemoryStore::new();
        let account_id = Uuid::new_v4();
        let result = ledger(&store).issue(account_id, Duration::MAX).await;

        assert!(matches!(result, Err(LedgerError::ExpiryOutOfRange)));
        assert!(store.refresh_tokens_for_account(account_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_token_not_found() {
        let store = MemoryStore::new();
        let result = ledger(&store).redeem("nope").await;
        assert!(matches!(result, Err(LedgerError::NotFound)));
    }

    #[tokio::test]
    async fn test_expired_token_revoked_then_not_found() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let issued = ledger
            .issue(Uuid::new_v4(), Duration::seconds(-1))
            .await
            .unwrap();

        assert!(matches!(
            ledger.redeem(&issued.token).await,
            Err(LedgerError::Expired)
        ));
        assert!(matches!(
            ledger.redeem(&issued.token).await,
            Err(LedgerError::NotFound)
        ));

        let stored = store.refresh_token_by_id(issued.record.id).await.unwrap();
        assert!(stored.revoked);
        assert_eq!(stored.replaced_by, None);
    }

    #[tokio::test]
    async fn test_rotation_links_replacement() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let account_id = Uuid::new_v4();
        let old = ledger.issue(account_id, Duration::days(7)).await.unwrap();
        let new = ledger.issue(account_id, Duration::days(7)).await.unwrap();

        let record = ledger.redeem(&old.token).await.unwrap();
        assert!(ledger.rotate(record.id, new.record.id).await.unwrap());

        let stored = store.refresh_token_by_id(old.record.id).await.unwrap();
        assert!(stored.revoked);
        assert_eq!(stored.replaced_by, Some(new.record.id));
        assert!(matches!(
            ledger.redeem(&old.token).await,
            Err(LedgerError::NotFound)
        ));
        assert!(ledger.redeem(&new.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_rotation_single_winner() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let account_id = Uuid::new_v4();
        let old = ledger.issue(account_id, Duration::days(7)).await.unwrap();

        // Both callers observe the record as live before either rotates
        let seen_a = ledger.redeem(&old.token).await.unwrap();
        let seen_b = ledger.redeem(&old.token).await.unwrap();
        let next_a = ledger.issue(account_id, Duration::days(7)).await.unwrap();
        let next_b = ledger.issue(account_id, Duration::days(7)).await.unwrap();

        let (a, b) = tokio::join!(
            ledger.rotate(seen_a.id, next_a.record.id),
            ledger.rotate(seen_b.id, next_b.record.id)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a ^ b, "exactly one rotation must win");

        let stored = store.refresh_token_by_id(old.record.id).await.unwrap();
        let winner = if a { next_a.record.id } else { next_b.record.id };
        assert_eq!(stored.replaced_by, Some(winner));
    }

    #[tokio::test]
    async fn test_revoke_reports_match() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let issued = ledger
            .issue(Uuid::new_v4(), Duration::days(7))
            .await
            .unwrap();

        assert!(ledger.revoke(&issued.token).await.unwrap());
        assert!(!ledger.revoke(&issued.token).await.unwrap());
        assert!(!ledger.revoke("never-issued").await.unwrap());
        assert!(store
            .find_live_refresh_token(&issued.record.token_hash)
            .await
            .unwrap()
            .is_none());
    }
}
