mod auth;
mod health_check;

pub use auth::{
    get_current_user, login, logout, refresh, register, validate, AuthResponse, RefreshCookie,
    ValidateResponse, REFRESH_COOKIE,
};
pub use health_check::health_check;
