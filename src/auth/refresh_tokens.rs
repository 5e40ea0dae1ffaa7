/// Refresh Token Records
///
/// Pure operations on a user's list of refresh-token records. Raw tokens
/// never touch storage; only their SHA-512 hash is kept. The list is
/// bounded: when an issuance pushes it past the configured maximum, the
/// oldest records are evicted first.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha512};

/// One stored refresh token. The raw token exists only on the client.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    /// SHA-512 hex of the raw refresh token
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Hash a raw token for storage or lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Drop every record whose expiry has passed.
pub fn prune_expired(records: &mut Vec<RefreshTokenRecord>) {
    let now = Utc::now();
    records.retain(|record| record.expires_at > now);
}

/// Append a record for `raw_token`, keeping at most `max_tokens` records.
///
/// A re-issued token value replaces its previous record, so hashes stay
/// unique within the list. Eviction removes the oldest records first.
pub fn issue(
    records: &mut Vec<RefreshTokenRecord>,
    raw_token: &str,
    expires_at: DateTime<Utc>,
    max_tokens: usize,
) {
    let token_hash = hash_token(raw_token);
    records.retain(|record| record.token_hash != token_hash);
    records.push(RefreshTokenRecord {
        token_hash,
        expires_at,
        created_at: Utc::now(),
    });

    if records.len() > max_tokens {
        let excess = records.len() - max_tokens;
        records.drain(..excess);
    }
}

/// Whether `raw_token` matches an unexpired stored record.
pub fn is_valid(records: &[RefreshTokenRecord], raw_token: &str) -> bool {
    let token_hash = hash_token(raw_token);
    let now = Utc::now();
    records
        .iter()
        .any(|record| record.token_hash == token_hash && record.expires_at > now)
}

/// Remove the record matching `raw_token`, if any.
///
/// Idempotent: revoking an absent token is not an error. Returns whether
/// a record was removed.
pub fn revoke(records: &mut Vec<RefreshTokenRecord>, raw_token: &str) -> bool {
    let token_hash = hash_token(raw_token);
    let before = records.len();
    records.retain(|record| record.token_hash != token_hash);
    records.len() != before
}
