/// Refresh Rotator
///
/// Redeems a `(access token, refresh secret)` pair for a brand new pair.
/// The access token only supplies the lookup key; it is decoded without
/// signature verification because clients normally rotate once it has
/// expired. The refresh secret is what authorizes the rotation.
///
/// A record is redeemable at most once: the conditional delete in the token
/// store decides the winner when rotations race.

use std::sync::Arc;

use crate::auth::issuer::TokenIssuer;
use crate::auth::jwt::{decode_unverified, TokenSigner};
use crate::auth::refresh_token::verify_refresh_secret;
use crate::clock::Clock;
use crate::domain::TokenPair;
use crate::error::AuthError;
use crate::store::TokenStore;

pub struct RefreshRotator {
    tokens: Arc<dyn TokenStore>,
    issuer: Arc<TokenIssuer>,
    signer: Arc<TokenSigner>,
    clock: Arc<dyn Clock>,
}

impl RefreshRotator {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        issuer: Arc<TokenIssuer>,
        signer: Arc<TokenSigner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            issuer,
            signer,
            clock,
        }
    }

    /// Exchange a refresh secret for a new token pair
    ///
    /// # Errors
    /// - `MalformedToken` if the access token cannot be decoded
    /// - `InvalidRefreshToken` if no record exists, the secret does not match,
    ///   or a concurrent rotation already consumed the record
    /// - `RefreshTokenExpired` if the record is past its expiry
    /// - `StorageFailure` / `SigningFailure` / `UserNotFound` if re-issuance
    ///   fails after the old record was consumed; the caller must log in again
    pub async fn rotate(
        &self,
        access_token: &str,
        refresh_secret: &str,
    ) -> Result<TokenPair, AuthError> {
        let presented = decode_unverified(access_token)?;
        let token_id = presented.token_id.unwrap_or_default();

        let record = self
            .tokens
            .find_by_access_token_id(&token_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(token_id = %token_id, "No refresh record for access token");
                AuthError::InvalidRefreshToken
            })?;

        if record.is_expired_at(self.clock.now()) {
            tracing::info!(user_id = %record.user_id, token_id = %token_id, "Refresh token expired");
            return Err(AuthError::RefreshTokenExpired);
        }

        // Mismatch leaves the record in place, so a guessed token id cannot
        // be used to log the owner out.
        if !verify_refresh_secret(refresh_secret, &record.token_hash) {
            tracing::warn!(user_id = %record.user_id, token_id = %token_id, "Refresh secret mismatch");
            return Err(AuthError::InvalidRefreshToken);
        }

        if presented.user_id.as_deref() != Some(record.user_id.as_str()) {
            tracing::warn!(
                user_id = %record.user_id,
                token_id = %token_id,
                "Access token user differs from refresh record owner"
            );
        }

        if !self.tokens.delete_by_access_token_id(&token_id).await? {
            tracing::warn!(user_id = %record.user_id, token_id = %token_id, "Refresh token already redeemed");
            return Err(AuthError::InvalidRefreshToken);
        }

        match self.issuer.issue_tokens(&record.user_id).await {
            Ok(pair) => {
                tracing::info!(user_id = %record.user_id, old_token_id = %token_id, "Rotated refresh token");
                Ok(pair)
            }
            Err(e) => {
                tracing::error!(
                    user_id = %record.user_id,
                    token_id = %token_id,
                    error = %e,
                    "Re-issuance failed after consuming refresh token; re-authentication required"
                );
                Err(e)
            }
        }
    }

    /// Drop the refresh record bound to a signed access token
    ///
    /// The token must carry a valid signature, but may be expired. Returns
    /// whether a record was removed.
    ///
    /// # Errors
    /// `MalformedToken` if the signature does not verify or `token_id` is
    /// missing
    pub async fn revoke(&self, access_token: &str) -> Result<bool, AuthError> {
        let presented = self
            .signer
            .verify(access_token)
            .map_err(|_| AuthError::MalformedToken)?;
        let token_id = presented.token_id.ok_or(AuthError::MalformedToken)?;

        let removed = self.tokens.delete_by_access_token_id(&token_id).await?;
        tracing::info!(token_id = %token_id, removed = removed, "Revoked refresh token");

        Ok(removed)
    }
}
