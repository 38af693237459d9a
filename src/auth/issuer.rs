/// Token Issuer
///
/// Mints an access token / refresh secret pair for a user and persists the
/// refresh record binding the two. No pair leaves this module unless the
/// record was stored.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::claims::AccessClaims;
use crate::auth::jwt::TokenSigner;
use crate::auth::refresh_token::{generate_refresh_secret, hash_refresh_secret};
use crate::clock::Clock;
use crate::domain::{RefreshTokenRecord, TokenPair};
use crate::error::AuthError;
use crate::store::{TokenStore, UserDirectory};

pub struct TokenIssuer {
    users: Arc<dyn UserDirectory>,
    tokens: Arc<dyn TokenStore>,
    signer: Arc<TokenSigner>,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        tokens: Arc<dyn TokenStore>,
        signer: Arc<TokenSigner>,
        clock: Arc<dyn Clock>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            users,
            tokens,
            signer,
            clock,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Issue a fresh token pair for `user_id`
    ///
    /// # Errors
    /// - `UserNotFound` if the id does not resolve
    /// - `SigningFailure` if the access token cannot be signed or an expiry
    ///   falls outside the representable date range
    /// - `StorageFailure` if the refresh record cannot be persisted
    pub async fn issue_tokens(&self, user_id: &str) -> Result<TokenPair, AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let now = self.clock.now();
        let token_id = Uuid::new_v4().to_string();
        let access_expires_at = expiry(now, self.access_ttl)?;
        let refresh_expires_at = expiry(now, self.refresh_ttl)?;

        let access_token = self
            .signer
            .sign(&AccessClaims::new(&user.id, &token_id, access_expires_at))?;

        let refresh_token = generate_refresh_secret();
        let record = RefreshTokenRecord {
            user_id: user.id.clone(),
            token_hash: hash_refresh_secret(&refresh_token),
            access_token_id: token_id.clone(),
            expires_at: refresh_expires_at,
        };

        if let Err(e) = self.tokens.put(&record).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to persist refresh record");
            return Err(AuthError::StorageFailure(e));
        }

        tracing::info!(user_id = %user.id, token_id = %token_id, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            user_id: user.id,
            access_expires_at,
        })
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AuthError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AuthError::SigningFailure(format!("token lifetime {} out of range", ttl)))
}
