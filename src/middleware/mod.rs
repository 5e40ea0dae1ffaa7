/// HTTP middleware
///
/// Bearer-token authentication for protected routes.

mod auth;

pub use auth::{AuthMiddleware, Principal};
