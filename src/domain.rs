/// Domain value types shared by the credential and token components.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identity record owned by the user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Server-assigned opaque identifier
    pub id: String,
    pub username: String,
    pub email: String,
    /// Salted bcrypt hash, never the plaintext
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User creation request handed to the directory.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Persisted half of a refresh token. One live record per `access_token_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub user_id: String,
    /// One-way hash of the opaque refresh secret
    pub token_hash: String,
    /// The `token_id` (jti) of the access token this record is bound to
    pub access_token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Freshly minted credentials, handed to the caller exactly once.
#[derive(Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    /// Plaintext opaque refresh secret; a bearer credential
    pub refresh_token: String,
    #[serde(skip)]
    pub user_id: String,
    #[serde(skip)]
    pub access_expires_at: DateTime<Utc>,
}

// Keep secrets out of debug output.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("user_id", &self.user_id)
            .field("access_expires_at", &self.access_expires_at)
            .finish_non_exhaustive()
    }
}
