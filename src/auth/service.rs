/// Authentication Orchestrator
///
/// Composes the password hasher, token codec, and user store into the
/// register/login/refresh/logout flows. The rotation rule lives here:
/// a refresh token authenticates at most one refresh call, after which a
/// fresh pair is issued and the old record is permanently dead.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::password::{PasswordDigest, PasswordHasher};
use crate::auth::token::{self, TokenType};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, ValidationError};
use crate::store::{User, UserStore};
use crate::validators::{normalize_email, normalize_name};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Public projection of a user. Never exposes the password record or
/// stored token hashes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

/// Response envelope shared by register, login, and refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEnvelope {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    /// UNIX seconds
    pub access_token_expires_at: i64,
    pub refresh_token_expires_at: i64,
    pub user: UserView,
}

pub struct AuthService {
    store: Arc<UserStore>,
    settings: AuthSettings,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(store: Arc<UserStore>, settings: AuthSettings) -> Result<Self, AppError> {
        let digest = PasswordDigest::from_name(&settings.auth_pbkdf2_digest).ok_or_else(|| {
            AppError::Config(format!(
                "Unsupported PBKDF2 digest: {}",
                settings.auth_pbkdf2_digest
            ))
        })?;
        let hasher = PasswordHasher::new(
            settings.auth_pbkdf2_iterations,
            digest,
            settings.auth_pbkdf2_key_length,
        );

        Ok(Self {
            store,
            settings,
            hasher,
        })
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<AuthEnvelope, AppError> {
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".to_string()).into());
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(
                ValidationError::TooShort("password".to_string(), MIN_PASSWORD_LENGTH).into(),
            );
        }
        let email = normalize_email(email)?;
        let first_name = normalize_name(first_name)?;
        let last_name = normalize_name(last_name)?;

        let password_hash = self.hash_password(password).await?;
        let user = self
            .store
            .create_user(email, password_hash, first_name, last_name)?;

        tracing::info!(user_id = %user.id, "User registered");
        self.issue_pair(user)
    }

    /// Authenticate with email and password.
    ///
    /// Unknown email and wrong password fail identically, so callers
    /// cannot probe which emails are registered.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthEnvelope, AppError> {
        if email.trim().is_empty() {
            return Err(ValidationError::EmptyField("email".to_string()).into());
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".to_string()).into());
        }

        let normalized = email.trim().to_lowercase();
        let user = self
            .store
            .find_by_email(&normalized)?
            .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        if !self.verify_password(password, user.password_hash.clone()).await? {
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.issue_pair(user)
    }

    /// Redeem a refresh token for a new pair, consuming it.
    pub async fn refresh(&self, raw_refresh_token: &str) -> Result<AuthEnvelope, AppError> {
        let claims = token::verify(
            raw_refresh_token,
            &self.settings.refresh_token_secret,
            TokenType::Refresh,
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Refresh token verification failed");
            AppError::from(e)
        })?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth(AuthError::TokenInvalid))?;
        let user = self
            .store
            .find_by_id(user_id)?
            .ok_or(AppError::Auth(AuthError::TokenInvalid))?;

        // Single-use rotation: check-and-remove is atomic in the store, so
        // of two concurrent redemptions of the same value only one wins.
        self.store.redeem_refresh_token(user_id, raw_refresh_token)?;

        tracing::info!(user_id = %user.id, "Refresh token rotated");
        self.issue_pair(user)
    }

    /// Best-effort logout. Every failure branch (malformed token, unknown
    /// user, already-revoked record) is deliberately discarded so the
    /// operation reports success no matter what it is given.
    pub async fn logout(&self, raw_refresh_token: &str) {
        if let Err(e) = self.try_logout(raw_refresh_token) {
            tracing::debug!(error = %e, "Logout absorbed a failure");
        }
    }

    fn try_logout(&self, raw_refresh_token: &str) -> Result<(), AppError> {
        let claims = token::verify(
            raw_refresh_token,
            &self.settings.refresh_token_secret,
            TokenType::Refresh,
        )?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth(AuthError::TokenInvalid))?;

        self.store.revoke_refresh_token(user_id, raw_refresh_token)?;
        Ok(())
    }

    /// Resolve the public view of an authenticated principal.
    pub fn current_user(&self, user_id: Uuid) -> Result<UserView, AppError> {
        let user = self
            .store
            .find_by_id(user_id)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(UserView::from(&user))
    }

    /// Shared issuance step: prune, mint an access/refresh pair, store the
    /// refresh token's hash, and build the response envelope.
    fn issue_pair(&self, user: User) -> Result<AuthEnvelope, AppError> {
        let access = token::sign(
            &user.id.to_string(),
            TokenType::Access,
            &self.settings.access_token_secret,
            self.settings.access_token_ttl,
        )?;
        let refresh = token::sign(
            &user.id.to_string(),
            TokenType::Refresh,
            &self.settings.refresh_token_secret,
            self.settings.refresh_token_ttl,
        )?;

        let refresh_expires_at = timestamp_to_datetime(refresh.expires_at)?;
        self.store.issue_refresh_token(
            user.id,
            &refresh.token,
            refresh_expires_at,
            self.settings.max_refresh_tokens,
        )?;

        Ok(AuthEnvelope {
            token_type: "Bearer".to_string(),
            access_token: access.token,
            refresh_token: refresh.token,
            access_token_expires_at: access.expires_at,
            refresh_token_expires_at: refresh.expires_at,
            user: UserView::from(&user),
        })
    }

    /// PBKDF2 at production iteration counts is deliberately expensive, so
    /// it runs on the blocking pool instead of a request-handling thread.
    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: &str, stored: String) -> Result<bool, AppError> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || PasswordHasher::verify(&password, &stored))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))
    }
}

fn timestamp_to_datetime(seconds: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| AppError::Internal(format!("Timestamp out of range: {}", seconds)))
}
