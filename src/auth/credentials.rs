/// Credential Verifier
///
/// Registration (uniqueness check + salted password hash) and password
/// authentication against the user directory.

use std::sync::{Arc, OnceLock};

use crate::auth::password::{digest, hash_password, verify_password};
use crate::domain::{NewUser, User};
use crate::error::{AuthError, StoreError};
use crate::store::UserDirectory;

pub struct CredentialVerifier {
    users: Arc<dyn UserDirectory>,
    hash_cost: u32,
    // Verified against when the email is unknown, so both failure paths cost
    // one bcrypt verification.
    decoy_hash: Arc<OnceLock<String>>,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserDirectory>, hash_cost: u32) -> Self {
        Self {
            users,
            hash_cost,
            decoy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Register a new user
    ///
    /// # Errors
    /// - `AlreadyExists` if the email is already registered
    /// - `StorageFailure` / `SigningFailure` from the directory or hasher
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            tracing::warn!("Registration rejected: email already registered");
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = hash_password(password.to_string(), self.hash_cost).await?;

        let user = self
            .users
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                StoreError::DuplicateEmail => AuthError::AlreadyExists,
                other => AuthError::StorageFailure(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Authenticate by email and password
    ///
    /// # Errors
    /// `InvalidCredentials` for both an unknown email and a wrong password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            self.burn_verification(password).await;
            tracing::warn!("Authentication failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            tracing::warn!("Authentication failed");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User authenticated");
        Ok(user)
    }

    async fn burn_verification(&self, password: &str) {
        let decoy = Arc::clone(&self.decoy_hash);
        let cost = self.hash_cost;
        let password = password.to_string();

        let _ = tokio::task::spawn_blocking(move || {
            let decoy = decoy.get_or_init(|| {
                bcrypt::hash(digest("decoy-password-for-unknown-accounts"), cost)
                    .unwrap_or_default()
            });
            bcrypt::verify(digest(&password), decoy)
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryUserDirectory;

    fn verifier() -> (CredentialVerifier, Arc<InMemoryUserDirectory>) {
        let users = Arc::new(InMemoryUserDirectory::new());
        (CredentialVerifier::new(users.clone(), 4), users)
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let (verifier, _) = verifier();

        let registered = verifier.register("alice", "alice@x.com", "pw123").await.unwrap();
        let authenticated = verifier.authenticate("alice@x.com", "pw123").await.unwrap();

        assert_eq!(registered.id, authenticated.id);
        assert_eq!(authenticated.username, "alice");
        assert_ne!(authenticated.password_hash, "pw123");
    }

    #[tokio::test]
    async fn duplicate_email_fails_regardless_of_password() {
        let (verifier, users) = verifier();
        verifier.register("alice", "alice@x.com", "pw123").await.unwrap();

        let result = verifier.register("alice2", "alice@x.com", "different").await;

        assert!(matches!(result, Err(AuthError::AlreadyExists)));
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let (verifier, _) = verifier();
        verifier.register("alice", "alice@x.com", "pw123").await.unwrap();

        let wrong_password = verifier.authenticate("alice@x.com", "nope").await.unwrap_err();
        let unknown_email = verifier.authenticate("bob@x.com", "pw123").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn long_passwords_sharing_a_72_byte_prefix_do_not_match() {
        let (verifier, _) = verifier();
        let prefix = "a".repeat(72);
        verifier
            .register("alice", "alice@x.com", &format!("{}REAL", prefix))
            .await
            .unwrap();

        let other = verifier
            .authenticate("alice@x.com", &format!("{}WRONG", prefix))
            .await;
        let truncated = verifier.authenticate("alice@x.com", &prefix).await;

        assert!(matches!(other, Err(AuthError::InvalidCredentials)));
        assert!(matches!(truncated, Err(AuthError::InvalidCredentials)));
        assert!(verifier
            .authenticate("alice@x.com", &format!("{}REAL", prefix))
            .await
            .is_ok());
    }
}
