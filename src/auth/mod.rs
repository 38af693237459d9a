/// Authentication module
///
/// Credential verification, access-token signing/validation and refresh
/// token rotation.

mod claims;
mod credentials;
mod issuer;
mod jwt;
mod password;
mod refresh_token;
mod rotator;
mod service;
mod validator;

pub use claims::{AccessClaims, PresentedClaims};
pub use credentials::CredentialVerifier;
pub use issuer::TokenIssuer;
pub use jwt::{decode_unverified, TokenSigner, VerifyFailure};
pub use password::{hash_password, verify_password, DEFAULT_HASH_COST};
pub use refresh_token::{generate_refresh_secret, hash_refresh_secret, verify_refresh_secret};
pub use rotator::RefreshRotator;
pub use service::AuthService;
pub use validator::{InvalidReason, TokenStatus, TokenValidator};
