//! Postgres-backed store

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{AccountStore, RefreshTokenStore, StoreError};
use crate::models::{Account, NewAccount, RefreshTokenRecord, Role};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row type for account lookup
#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(StoreError::Backend)?;
        Ok(Account {
            id: row.id,
            name: row.name,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            email: row.email,
            password_hash: row.password_hash,
            role,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row type for refresh token lookup
#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    account_id: Uuid,
    token_hash: String,
    expires_at: OffsetDateTime,
    revoked: bool,
    replaced_by: Option<Uuid>,
    created_at: OffsetDateTime,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshTokenRecord {
            id: row.id,
            account_id: row.account_id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            revoked: row.revoked,
            replaced_by: row.replaced_by,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let account = account.into_account(OffsetDateTime::now_utc());

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, name, first_name, last_name, phone, email,
                password_hash, role, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.phone)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_account_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, name, first_name, last_name, phone, email,
                   password_hash, role, is_active, created_at, updated_at
            FROM accounts
            WHERE role = $1 AND email = $2
            ORDER BY is_active DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(role.as_str())
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, name, first_name, last_name, phone, email,
                   password_hash, role, is_active, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn count_active_accounts_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<i64, StoreError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM accounts
            WHERE role = $1
              AND email = $2
              AND is_active
            "#,
        )
        .bind(role.as_str())
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn set_account_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE accounts
            SET is_active = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(active)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id, account_id, token_hash, expires_at, revoked, replaced_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.account_id)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(record.revoked)
        .bind(record.replaced_by)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_live_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, token_hash, expires_at, revoked, replaced_by, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
              AND revoked = FALSE
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn revoke_refresh_token(
        &self,
        id: Uuid,
        replaced_by: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE,
                replaced_by = $2
            WHERE id = $1
              AND revoked = FALSE
            "#,
        )
        .bind(id)
        .bind(replaced_by)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE token_hash = $1
              AND revoked = FALSE
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}
