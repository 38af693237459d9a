/// Token Validator
///
/// Checks, in order: signature, presence of claims, the custom `expires_at`
/// claim, and that the user still exists. Deleting a user therefore revokes
/// every outstanding access token for them without a blacklist.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::auth::jwt::{TokenSigner, VerifyFailure};
use crate::clock::Clock;
use crate::domain::User;
use crate::error::AuthError;
use crate::store::UserDirectory;

/// Why an access token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    BadSignature,
    MissingClaims,
    Expired,
    UnknownUser,
}

/// Outcome of validating an access token
#[derive(Debug, Clone)]
pub enum TokenStatus {
    Valid {
        user: User,
        expires_at: DateTime<Utc>,
    },
    Invalid {
        reason: InvalidReason,
        /// Parsed expiry, reported for diagnostics whenever it was readable
        expires_at: Option<DateTime<Utc>>,
    },
}

impl TokenStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenStatus::Valid { .. })
    }

    fn invalid(reason: InvalidReason, expires_at: Option<DateTime<Utc>>) -> Self {
        TokenStatus::Invalid { reason, expires_at }
    }
}

pub struct TokenValidator {
    users: Arc<dyn UserDirectory>,
    signer: Arc<TokenSigner>,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    pub fn new(users: Arc<dyn UserDirectory>, signer: Arc<TokenSigner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            signer,
            clock,
        }
    }

    /// Validate an access token
    ///
    /// # Errors
    /// `StorageFailure` only if the directory lookup itself fails. Every
    /// property of the token is reported through `TokenStatus`.
    pub async fn validate(&self, access_token: &str) -> Result<TokenStatus, AuthError> {
        let claims = match self.signer.verify(access_token) {
            Ok(claims) => claims,
            Err(VerifyFailure::BadSignature) => {
                tracing::debug!("Access token signature rejected");
                return Ok(TokenStatus::invalid(InvalidReason::BadSignature, None));
            }
            Err(VerifyFailure::MalformedClaims) => {
                return Ok(TokenStatus::invalid(InvalidReason::MissingClaims, None));
            }
        };

        let expiry = claims.expiry();
        let (Some(user_id), Some(expires_at)) = (claims.user_id.as_deref(), expiry) else {
            return Ok(TokenStatus::invalid(InvalidReason::MissingClaims, expiry));
        };

        if self.clock.now() > expires_at {
            tracing::debug!(user_id = %user_id, "Access token expired");
            return Ok(TokenStatus::invalid(InvalidReason::Expired, Some(expires_at)));
        }

        match self.users.find_by_id(user_id).await? {
            Some(user) => {
                tracing::debug!(user_id = %user.id, "Access token validated");
                Ok(TokenStatus::Valid { user, expires_at })
            }
            None => {
                tracing::warn!(user_id = %user_id, "Access token for unknown user");
                Ok(TokenStatus::invalid(InvalidReason::UnknownUser, Some(expires_at)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::AccessClaims;
    use crate::clock::ManualClock;
    use crate::domain::NewUser;
    use crate::store::InMemoryUserDirectory;
    use chrono::Duration;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    const SECRET: &[u8] = b"validator-test-secret";

    struct Fixture {
        validator: TokenValidator,
        users: Arc<InMemoryUserDirectory>,
        clock: Arc<ManualClock>,
        signer: TokenSigner,
        user: User,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUserDirectory::new());
        let clock = Arc::new(ManualClock::starting_now());
        let user = users
            .create(NewUser {
                username: "alice".into(),
                email: "alice@x.com".into(),
                password_hash: "irrelevant".into(),
            })
            .await
            .unwrap();
        let validator = TokenValidator::new(
            users.clone(),
            Arc::new(TokenSigner::new(SECRET)),
            clock.clone(),
        );

        Fixture {
            validator,
            users,
            clock,
            signer: TokenSigner::new(SECRET),
            user,
        }
    }

    fn token_for(f: &Fixture, ttl: Duration) -> String {
        f.signer
            .sign(&AccessClaims::new(&f.user.id, "jti-1", f.clock.now() + ttl))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_token_resolves_user_and_expiry() {
        let f = fixture().await;
        let token = token_for(&f, Duration::minutes(15));

        match f.validator.validate(&token).await.unwrap() {
            TokenStatus::Valid { user, expires_at } => {
                assert_eq!(user.id, f.user.id);
                assert_eq!(expires_at.timestamp(), (f.clock.now() + Duration::minutes(15)).timestamp());
            }
            other => panic!("expected valid token, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn expired_token_reports_expiry() {
        let f = fixture().await;
        let token = token_for(&f, Duration::minutes(15));
        let expected_expiry = (f.clock.now() + Duration::minutes(15)).timestamp();

        f.clock.advance(Duration::minutes(16));

        match f.validator.validate(&token).await.unwrap() {
            TokenStatus::Invalid { reason, expires_at } => {
                assert_eq!(reason, InvalidReason::Expired);
                assert_eq!(expires_at.map(|e| e.timestamp()), Some(expected_expiry));
            }
            other => panic!("expected expired token, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn foreign_signature_is_rejected_before_expiry() {
        let f = fixture().await;
        let token = TokenSigner::new(b"other")
            .sign(&AccessClaims::new(&f.user.id, "jti", f.clock.now() - Duration::hours(1)))
            .unwrap();

        match f.validator.validate(&token).await.unwrap() {
            TokenStatus::Invalid { reason, expires_at } => {
                assert_eq!(reason, InvalidReason::BadSignature);
                assert!(expires_at.is_none());
            }
            other => panic!("expected bad signature, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_claims_are_rejected() {
        #[derive(serde::Serialize)]
        struct Partial {
            token_id: String,
            expires_at: i64,
        }

        let f = fixture().await;
        let expires_at = (f.clock.now() + Duration::minutes(5)).timestamp();
        let token = encode(
            &Header::new(Algorithm::HS512),
            &Partial { token_id: "jti".into(), expires_at },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        match f.validator.validate(&token).await.unwrap() {
            TokenStatus::Invalid { reason, expires_at: reported } => {
                assert_eq!(reason, InvalidReason::MissingClaims);
                assert_eq!(reported.map(|e| e.timestamp()), Some(expires_at));
            }
            other => panic!("expected missing claims, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn deleted_user_invalidates_token() {
        let f = fixture().await;
        let token = token_for(&f, Duration::minutes(15));
        assert!(f.validator.validate(&token).await.unwrap().is_valid());

        f.users.delete(&f.user.id).await.unwrap();

        match f.validator.validate(&token).await.unwrap() {
            TokenStatus::Invalid { reason, .. } => assert_eq!(reason, InvalidReason::UnknownUser),
            other => panic!("expected unknown user, got {:?}", other),
        }
    }
}
