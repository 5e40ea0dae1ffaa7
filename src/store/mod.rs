/// In-Process User Store
///
/// Owns all `User` records and serializes token-list mutations. Each
/// mutation (issue, redeem, revoke) runs inside a single lock acquisition,
/// so two concurrent rotations racing on the same raw refresh token can
/// never both observe the record: the loser fails authentication. A
/// per-user version counter is bumped on every write, matching the
/// optimistic-concurrency shape a document store would enforce.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::refresh_tokens::{self, RefreshTokenRecord};
use crate::error::{AppError, AuthError};

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    /// Trimmed, lowercased, unique
    pub email: String,
    /// Self-describing PBKDF2 record, never the raw password
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub refresh_tokens: Vec<RefreshTokenRecord>,
    /// Bumped on every write
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct UserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a user with an empty refresh-token list.
    ///
    /// The uniqueness check and the insert happen under one lock, so two
    /// concurrent registrations of the same email admit exactly one.
    pub fn create_user(
        &self,
        email: String,
        password_hash: String,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<User, AppError> {
        let mut users = self.lock()?;

        if users.values().any(|user| user.email == email) {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash,
            first_name,
            last_name,
            refresh_tokens: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.lock()?;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.lock()?;
        Ok(users.get(&id).cloned())
    }

    /// Prune expired records, then store the hash of a newly minted
    /// refresh token, bounded at `max_tokens`.
    pub fn issue_refresh_token(
        &self,
        user_id: Uuid,
        raw_token: &str,
        expires_at: DateTime<Utc>,
        max_tokens: usize,
    ) -> Result<(), AppError> {
        let mut users = self.lock()?;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        refresh_tokens::prune_expired(&mut user.refresh_tokens);
        refresh_tokens::issue(&mut user.refresh_tokens, raw_token, expires_at, max_tokens);
        touch(user);

        Ok(())
    }

    /// Atomically consume a refresh token: membership check and removal
    /// in one critical section, so a given raw token redeems at most once.
    pub fn redeem_refresh_token(&self, user_id: Uuid, raw_token: &str) -> Result<(), AppError> {
        let mut users = self.lock()?;
        let user = users
            .get_mut(&user_id)
            .ok_or(AppError::Auth(AuthError::TokenInvalid))?;

        refresh_tokens::prune_expired(&mut user.refresh_tokens);
        if !refresh_tokens::is_valid(&user.refresh_tokens, raw_token) {
            // Never issued, already rotated, or explicitly revoked
            return Err(AppError::Auth(AuthError::TokenInvalid));
        }

        refresh_tokens::revoke(&mut user.refresh_tokens, raw_token);
        touch(user);

        Ok(())
    }

    /// Remove the matching record if present. Idempotent; used by logout.
    pub fn revoke_refresh_token(&self, user_id: Uuid, raw_token: &str) -> Result<bool, AppError> {
        let mut users = self.lock()?;
        let user = match users.get_mut(&user_id) {
            Some(user) => user,
            None => return Ok(false),
        };

        let removed = refresh_tokens::revoke(&mut user.refresh_tokens, raw_token);
        if removed {
            touch(user);
        }

        Ok(removed)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, User>>, AppError> {
        self.users
            .lock()
            .map_err(|_| AppError::Internal("User store lock poisoned".to_string()))
    }
}

fn touch(user: &mut User) {
    user.version += 1;
    user.updated_at = Utc::now();
}
