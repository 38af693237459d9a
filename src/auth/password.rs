/// Password Hashing and Verification
///
/// bcrypt with a configurable cost. Hashing and verification are CPU bound,
/// so both run on tokio's blocking pool instead of stalling the executor.
///
/// bcrypt ignores everything past the first 72 bytes of its input, so the
/// password is first reduced to a SHA-256 digest (base64, 44 bytes) and the
/// digest is what gets hashed. Every byte of the password is significant.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bcrypt::{hash, verify};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// Cost giving roughly 100ms per verification on current server hardware.
pub const DEFAULT_HASH_COST: u32 = 10;

pub(crate) fn digest(password: &str) -> String {
    STANDARD.encode(Sha256::digest(password.as_bytes()))
}

/// Hash a password with a fresh random salt
///
/// # Errors
/// Returns `SigningFailure` if bcrypt rejects the cost or the blocking task
/// is cancelled.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash(digest(&password), cost))
        .await
        .map_err(|e| AuthError::SigningFailure(format!("password hashing task failed: {}", e)))?
        .map_err(|e| AuthError::SigningFailure(format!("password hashing failed: {}", e)))
}

/// Verify a password against a stored bcrypt hash
///
/// An unparseable stored hash counts as a mismatch so that a corrupt row
/// fails closed.
pub async fn verify_password(password: String, password_hash: String) -> Result<bool, AuthError> {
    let outcome = tokio::task::spawn_blocking(move || verify(digest(&password), &password_hash))
        .await
        .map_err(|e| AuthError::SigningFailure(format!("password verification task failed: {}", e)))?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash could not be parsed");
            Ok(false)
        }
    }
}
