/// Refresh Token Secrets
///
/// Refresh tokens are:
/// - 32 bytes from the OS CSPRNG, URL-safe base64 encoded (no padding)
/// - Stored only as a SHA-256 digest, never in plaintext
/// - Compared in constant time against the stored digest

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SECRET_BYTES: usize = 32;

/// Generate a new opaque refresh secret
pub fn generate_refresh_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// One-way digest of a refresh secret, as stored in the token store
pub fn hash_refresh_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a presented secret against a stored digest
pub fn verify_refresh_secret(presented: &str, stored_hash: &str) -> bool {
    let presented_hash = hash_refresh_secret(presented);
    presented_hash.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_refresh_secret() {
        let secret = generate_refresh_secret();

        // 32 bytes -> 43 base64 characters without padding
        assert_eq!(secret.len(), 43);
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_secrets_are_unique() {
        assert_ne!(generate_refresh_secret(), generate_refresh_secret());
    }

    #[test]
    fn test_token_hashing() {
        let secret = generate_refresh_secret();
        let hash1 = hash_refresh_secret(&secret);
        let hash2 = hash_refresh_secret(&secret);

        assert_eq!(hash1, hash2);
        assert_ne!(secret, hash1);
        // SHA-256 hex
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_verify_refresh_secret() {
        let secret = generate_refresh_secret();
        let stored = hash_refresh_secret(&secret);

        assert!(verify_refresh_secret(&secret, &stored));
        assert!(!verify_refresh_secret(&generate_refresh_secret(), &stored));
        assert!(!verify_refresh_secret(&secret, ""));
    }
}
