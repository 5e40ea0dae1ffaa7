/// Authentication core
///
/// Password hashing, the compact signed-token codec, refresh-token
/// record management, and the orchestrating service.

pub mod password;
pub mod refresh_tokens;
pub mod service;
pub mod token;

pub use password::{PasswordDigest, PasswordHasher};
pub use service::{AuthEnvelope, AuthService, UserView};
pub use token::{Claims, TokenType};
