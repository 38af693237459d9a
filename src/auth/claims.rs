/// Access-token claim set
///
/// `{user_id, token_id, expires_at}` where `token_id` is the jti binding the
/// access token to its refresh record and `expires_at` is an absolute Unix
/// timestamp checked by the validator itself rather than by the JWT library.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims written into every issued access token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: String,
    pub token_id: String,
    /// Expiration time (Unix timestamp, seconds)
    pub expires_at: i64,
}

impl AccessClaims {
    pub fn new(user_id: impl Into<String>, token_id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            token_id: token_id.into(),
            expires_at: expires_at.timestamp(),
        }
    }
}

/// Claims as found in a presented token, before any field is trusted.
///
/// Every field is optional so that a structurally valid token with missing
/// claims can be told apart from a garbled one.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PresentedClaims {
    pub user_id: Option<String>,
    pub token_id: Option<String>,
    pub expires_at: Option<i64>,
}

impl PresentedClaims {
    /// `expires_at` as a timestamp, if present and representable
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}
