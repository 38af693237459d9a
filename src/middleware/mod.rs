/// Middleware module
///
/// Bearer-token guard for protected routes.

mod jwt_middleware;

pub use jwt_middleware::{bearer_token, AuthenticatedUser, JwtMiddleware};
