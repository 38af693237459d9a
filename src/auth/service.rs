/// Authentication service facade
///
/// Wires the credential verifier, token issuer, refresh rotator and token
/// validator around one set of collaborators and settings. This is the only
/// type the HTTP layer talks to.

use chrono::Duration;
use std::sync::Arc;

use crate::auth::credentials::CredentialVerifier;
use crate::auth::issuer::TokenIssuer;
use crate::auth::jwt::TokenSigner;
use crate::auth::rotator::RefreshRotator;
use crate::auth::validator::{TokenStatus, TokenValidator};
use crate::clock::{Clock, SystemClock};
use crate::configuration::{JwtSettings, PasswordSettings};
use crate::domain::{TokenPair, User};
use crate::error::AuthError;
use crate::store::{TokenStore, UserDirectory};

pub struct AuthService {
    credentials: CredentialVerifier,
    issuer: Arc<TokenIssuer>,
    rotator: RefreshRotator,
    validator: TokenValidator,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        tokens: Arc<dyn TokenStore>,
        jwt: &JwtSettings,
        password: &PasswordSettings,
    ) -> Self {
        Self::with_clock(users, tokens, jwt, password, Arc::new(SystemClock))
    }

    pub fn with_clock(
        users: Arc<dyn UserDirectory>,
        tokens: Arc<dyn TokenStore>,
        jwt: &JwtSettings,
        password: &PasswordSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let signer = Arc::new(TokenSigner::new(jwt.secret.as_bytes()));
        let issuer = Arc::new(TokenIssuer::new(
            users.clone(),
            tokens.clone(),
            signer.clone(),
            clock.clone(),
            ttl(jwt.access_token_expiry),
            ttl(jwt.refresh_token_expiry),
        ));

        Self {
            credentials: CredentialVerifier::new(users.clone(), password.hash_cost),
            rotator: RefreshRotator::new(tokens, issuer.clone(), signer.clone(), clock.clone()),
            validator: TokenValidator::new(users, signer, clock),
            issuer,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.issuer.access_ttl()
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        self.credentials.register(username, email, password).await
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.credentials.authenticate(email, password).await
    }

    pub async fn issue_tokens(&self, user_id: &str) -> Result<TokenPair, AuthError> {
        self.issuer.issue_tokens(user_id).await
    }

    pub async fn rotate(
        &self,
        access_token: &str,
        refresh_secret: &str,
    ) -> Result<TokenPair, AuthError> {
        self.rotator.rotate(access_token, refresh_secret).await
    }

    pub async fn validate(&self, access_token: &str) -> Result<TokenStatus, AuthError> {
        self.validator.validate(access_token).await
    }

    pub async fn revoke(&self, access_token: &str) -> Result<bool, AuthError> {
        self.rotator.revoke(access_token).await
    }
}

// Values beyond chrono's range saturate; the issuer rejects them when it
// computes an expiry.
fn ttl(seconds: i64) -> Duration {
    Duration::try_seconds(seconds).unwrap_or(Duration::MAX)
}
