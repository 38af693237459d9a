/// Authentication Routes
///
/// Thin handlers over `AuthService`: input validation, then one or two core
/// operations, then response shaping. The refresh secret is returned in the
/// body and mirrored into an HttpOnly `refresh_token` cookie.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{http::header::AUTHORIZATION, web, HttpRequest, HttpResponse, HttpResponseBuilder};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, TokenStatus};
use crate::domain::TokenPair;
use crate::error::AppError;
use crate::middleware::{bearer_token, AuthenticatedUser};
use crate::validators::{is_valid_email, is_valid_password, is_valid_username};

pub const REFRESH_COOKIE: &str = "refresh_token";

/// How the refresh-token cookie is emitted
#[derive(Debug, Clone)]
pub struct RefreshCookie {
    pub secure: bool,
    pub max_age_seconds: i64,
}

impl RefreshCookie {
    fn issue(&self, secret: &str) -> Cookie<'static> {
        Cookie::build(REFRESH_COOKIE, secret.to_string())
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(CookieDuration::seconds(self.max_age_seconds))
            .finish()
    }

    fn removal(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(REFRESH_COOKIE, "")
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .finish();
        cookie.make_removal();
        cookie
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub user_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub access_token: String,
    /// Falls back to the `refresh_token` cookie when absent
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub token: String,
}

/// Freshly issued credentials
#[derive(Serialize)]
pub struct AuthResponse {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token expiry, RFC 3339
    pub expires_at: String,
}

impl From<TokenPair> for AuthResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            expires_at: rfc3339(pair.access_expires_at),
            user_id: pair.user_id,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<String>,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
    pub revoked: bool,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub created_at: String,
    pub token_expires_at: String,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn with_tokens(
    mut builder: HttpResponseBuilder,
    pair: TokenPair,
    cookie: &RefreshCookie,
) -> HttpResponse {
    builder
        .cookie(cookie.issue(&pair.refresh_token))
        .json(AuthResponse::from(pair))
}

/// POST /auth/register
///
/// Creates the user and logs them in. Returns 201 with a token pair.
///
/// # Errors
/// - 400: invalid user_name / email / password
/// - 409: email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
    cookie: web::Data<RefreshCookie>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let user_name = is_valid_username(&form.user_name)?;
    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;

    let user = auth.register(&user_name, &email, &form.password).await?;
    let pair = auth.issue_tokens(&user.id).await?;

    Ok(with_tokens(HttpResponse::Created(), pair, &cookie))
}

/// POST /auth/login
///
/// # Errors
/// - 400: malformed email or password
/// - 401: unknown email or wrong password (indistinguishable)
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
    cookie: web::Data<RefreshCookie>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;

    let user = auth.authenticate(&email, &form.password).await?;
    let pair = auth.issue_tokens(&user.id).await?;

    Ok(with_tokens(HttpResponse::Ok(), pair, &cookie))
}

/// POST /auth/refresh
///
/// Single-use rotation: the presented refresh secret is consumed and a new
/// pair is returned. The access token may already be expired.
///
/// # Errors
/// - 401: missing, unknown, mismatched, replayed or expired refresh token
pub async fn refresh(
    req: HttpRequest,
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
    cookie: web::Data<RefreshCookie>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let secret = form
        .refresh_token
        .filter(|s| !s.is_empty())
        .or_else(|| req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .filter(|s| !s.is_empty())
        .ok_or(AppError::MissingToken)?;

    let pair = auth.rotate(&form.access_token, &secret).await?;

    Ok(with_tokens(HttpResponse::Ok(), pair, &cookie))
}

/// POST /auth/validate
///
/// An invalid token is a normal outcome (`200 {"valid": false}`); only a
/// storage outage is reported as an error.
pub async fn validate(
    form: web::Json<ValidateRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let body = match auth.validate(&form.token).await? {
        TokenStatus::Valid { user, expires_at } => ValidateResponse {
            valid: true,
            user_id: Some(user.id),
            email: Some(user.email),
            user_name: Some(user.username),
            token_expires_at: Some(rfc3339(expires_at)),
        },
        TokenStatus::Invalid { expires_at, .. } => ValidateResponse {
            valid: false,
            user_id: None,
            email: None,
            user_name: None,
            token_expires_at: expires_at.map(rfc3339),
        },
    };

    Ok(HttpResponse::Ok().json(body))
}

/// POST /auth/logout
///
/// Clears the refresh cookie. With an `Authorization: Bearer` header the
/// refresh record bound to that access token is revoked as well; the token
/// may be expired but must carry a valid signature.
pub async fn logout(
    req: HttpRequest,
    auth: web::Data<AuthService>,
    cookie: web::Data<RefreshCookie>,
) -> Result<HttpResponse, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token);

    let revoked = match token {
        Some(token) => auth.revoke(token).await?,
        None => false,
    };

    Ok(HttpResponse::Ok()
        .cookie(cookie.removal())
        .json(LogoutResponse {
            message: "successfully logged out",
            revoked,
        }))
}

/// GET /api/me
///
/// Requires the bearer-token middleware.
pub async fn get_current_user(identity: web::ReqData<AuthenticatedUser>) -> HttpResponse {
    let AuthenticatedUser {
        user,
        token_expires_at,
    } = identity.into_inner();

    HttpResponse::Ok().json(UserResponse {
        id: user.id,
        user_name: user.username,
        email: user.email,
        created_at: rfc3339(user.created_at),
        token_expires_at: rfc3339(token_expires_at),
    })
}
