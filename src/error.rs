/// Error Handling Module
///
/// Layers, from the inside out:
/// 1. `StoreError` - failures reported by the user directory / token store
/// 2. `AuthError` - the credential and token lifecycle taxonomy
/// 3. `ValidationError` / `ConfigError` / `StartupError` - request input,
///    settings and assembly problems
/// 4. `AppError` - what HTTP handlers return, mapped onto status codes

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// ============================================================================
/// 1. COLLABORATOR ERRORS
/// ============================================================================

/// Errors surfaced by the storage collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email is already registered")]
    DuplicateEmail,

    #[error("storage query failed: {0}")]
    Database(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

const UNIQUE_VIOLATION: &str = "23505";
/// Named in the users migration
const USERS_EMAIL_CONSTRAINT: &str = "users_email_key";

fn is_duplicate_email(code: Option<&str>, constraint: Option<&str>) -> bool {
    code == Some(UNIQUE_VIOLATION) && constraint == Some(USERS_EMAIL_CONSTRAINT)
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if is_duplicate_email(db_err.code().as_deref(), db_err.constraint()) =>
            {
                StoreError::DuplicateEmail
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// ============================================================================
/// 2. CREDENTIAL / TOKEN LIFECYCLE ERRORS
/// ============================================================================

/// Typed failures of Register, Authenticate, IssueTokens, Rotate and Revoke.
///
/// `InvalidCredentials` renders identically for an unknown email and a wrong
/// password.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("a user with this email already exists")]
    AlreadyExists,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("malformed token")]
    MalformedToken,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("refresh token has expired")]
    RefreshTokenExpired,

    #[error("storage failure: {0}")]
    StorageFailure(#[from] StoreError),

    #[error("signing failure: {0}")]
    SigningFailure(String),
}

impl AuthError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::AlreadyExists => "ALREADY_EXISTS",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::MalformedToken => "MALFORMED_TOKEN",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
            AuthError::StorageFailure(StoreError::Unavailable(_)) => "SERVICE_UNAVAILABLE",
            AuthError::StorageFailure(_) => "STORAGE_FAILURE",
            AuthError::SigningFailure(_) => "SIGNING_FAILURE",
        }
    }
}

/// ============================================================================
/// 3. INPUT AND CONFIGURATION ERRORS
/// ============================================================================

/// Validation errors for request input
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(&'static str),

    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(&'static str, usize),

    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(&'static str, usize),

    #[error("{0} has invalid format")]
    InvalidFormat(&'static str),

    #[error("{0} contains suspicious content")]
    SuspiciousContent(&'static str),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config: {0}")]
    MissingRequired(String),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Load(#[from] config::ConfigError),
}

/// Failures while assembling the application
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to bind listener: {0}")]
    Io(#[from] std::io::Error),
}

/// ============================================================================
/// 4. HTTP-FACING ERROR
/// ============================================================================

/// Central error type returned by route handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("missing authentication token")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidToken,
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Auth(AuthError::StorageFailure(err))
    }
}

/// Error response body
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating with logs
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Converts errors to HTTP responses with matching log output
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(e) => match e {
                AuthError::AlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidCredentials
                | AuthError::MalformedToken
                | AuthError::InvalidRefreshToken
                | AuthError::RefreshTokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::StorageFailure(StoreError::Unavailable(_)) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                AuthError::StorageFailure(_) | AuthError::SigningFailure(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::MissingToken | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(e) => e.code(),
            AppError::MissingToken => "MISSING_TOKEN",
            AppError::InvalidToken => "TOKEN_INVALID",
        }
    }

    /// Client-safe message. Server-side details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Auth(AuthError::StorageFailure(StoreError::Unavailable(_))) => {
                "Service temporarily unavailable".to_string()
            }
            AppError::Auth(AuthError::StorageFailure(_))
            | AppError::Auth(AuthError::SigningFailure(_)) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let status = self.status();
        let response = ErrorResponse::new(
            request_id.to_string(),
            self.public_message(),
            self.code().to_string(),
            status.as_u16(),
        );
        (status, response)
    }

    fn log_error(&self, request_id: &str) {
        if self.status().is_server_error() {
            tracing::error!(request_id = request_id, error = %self, "Request failed");
        } else {
            tracing::warn!(request_id = request_id, error = %self, "Request rejected");
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, body) = <Self as ErrorHandler>::error_response(self, &request_id);
        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.status()
    }
}
