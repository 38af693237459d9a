/// Access-token signing and decoding
///
/// Tokens are HS512 JWTs signed with the server-wide secret. The library's
/// own `exp`/`nbf` enforcement is switched off: expiry lives in the custom
/// `expires_at` claim and is checked explicitly by the validator, after the
/// signature.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{AccessClaims, PresentedClaims};
use crate::error::AuthError;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Why a presented token failed signature verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyFailure {
    /// Wrong signature, wrong algorithm, or not a JWT at all
    BadSignature,
    /// Signature is fine but the payload is not a claims object
    MalformedClaims,
}

/// Holds the signing keys derived from the server secret
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a claim set into a compact JWT
    ///
    /// # Errors
    /// Returns `SigningFailure` if serialization or signing fails
    pub fn sign(&self, claims: &AccessClaims) -> Result<String, AuthError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AuthError::SigningFailure(format!("token signing failed: {}", e)))
    }

    /// Verify the signature and return the claims as presented
    ///
    /// No time-based checks happen here.
    pub fn verify(&self, token: &str) -> Result<PresentedClaims, VerifyFailure> {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();

        decode::<PresentedClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::Json(_) => VerifyFailure::MalformedClaims,
                _ => VerifyFailure::BadSignature,
            })
    }
}

/// Decode claims WITHOUT verifying the signature
///
/// Only for recovering the lookup key (`token_id`) of a token that may have
/// expired or been issued under a different key. Nothing returned here is
/// authoritative.
///
/// # Errors
/// Returns `MalformedToken` when the input is not a JWT or lacks `token_id`
pub fn decode_unverified(token: &str) -> Result<PresentedClaims, AuthError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims.clear();

    let claims = decode::<PresentedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|_| AuthError::MalformedToken)?;

    match claims.token_id.as_deref() {
        Some(id) if !id.is_empty() => Ok(claims),
        _ => Err(AuthError::MalformedToken),
    }
}
