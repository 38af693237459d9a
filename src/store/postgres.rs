/// Postgres-backed storage adapters.
///
/// Tables are created by the migrations under `migrations/`.
/// `refresh_tokens.access_token_id` carries a unique index, so lookups and
/// deletes are point operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewUser, RefreshTokenRecord, User};
use crate::error::StoreError;
use crate::store::{TokenStore, UserDirectory};

type UserRow = (Uuid, String, String, String, DateTime<Utc>);

fn user_from_row((id, username, email, password_hash, created_at): UserRow) -> User {
    User {
        id: id.to_string(),
        username,
        email,
        password_hash,
        created_at,
    }
}

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, user_name, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_name, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(row))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        // Ids are UUIDs; anything else cannot name a row.
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, user_name, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, user_name, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn put(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        let user_id = Uuid::parse_str(&record.user_id)
            .map_err(|_| StoreError::Database("refresh record has a non-UUID user id".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, access_token_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&record.token_hash)
        .bind(&record.access_token_id)
        .bind(record.expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_access_token_id(
        &self,
        access_token_id: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>)>(
            r#"
            SELECT user_id, token_hash, access_token_id, expires_at
            FROM refresh_tokens
            WHERE access_token_id = $1
            "#,
        )
        .bind(access_token_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(user_id, token_hash, access_token_id, expires_at)| RefreshTokenRecord {
                user_id: user_id.to_string(),
                token_hash,
                access_token_id,
                expires_at,
            },
        ))
    }

    async fn delete_by_access_token_id(&self, access_token_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE access_token_id = $1")
            .bind(access_token_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
