/// Compact Signed Token Codec
///
/// Signs and verifies the three-segment wire format
/// `base64url(header) . base64url(payload) . base64url(signature)` with a
/// fixed `{"alg":"HS256","typ":"JWT"}` header and an HMAC-SHA256 signature.
/// Both functions are pure and synchronous; verification compares
/// signatures in constant time after a length check.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::error::Error as StdError;
use std::fmt;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

// HMAC-SHA256 output length; signatures of any other length are rejected
// before content comparison.
const SIGNATURE_LENGTH: usize = 32;

lazy_static! {
    // Byte-exact header constant. Verification compares the encoded
    // segment against this string rather than decoding it.
    static ref ENCODED_HEADER: String =
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
}

/// Token kind, validated exhaustively at verification time.
///
/// Serialized as the payload's `type` field; any tag other than
/// "access" or "refresh" fails payload deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Signed token payload. Exists only inside the token string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued at, UNIX seconds
    pub iat: i64,
    /// Expires at, UNIX seconds
    pub exp: i64,
    /// Random token id. Makes every minted token unique even when two
    /// are signed for the same subject within the same second, which
    /// single-use rotation depends on.
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    /// Expiry as UNIX seconds, echoed to clients alongside the token
    pub expires_at: i64,
}

/// Verification failure kinds.
///
/// Callers treat every kind as the same authentication failure; the
/// distinctions exist for logs and tests only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    UnsupportedHeader,
    BadSignature,
    WrongType,
    Expired,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::UnsupportedHeader => write!(f, "Unsupported token header"),
            TokenError::BadSignature => write!(f, "Invalid token signature"),
            TokenError::WrongType => write!(f, "Invalid token type"),
            TokenError::Expired => write!(f, "Token expired"),
        }
    }
}

impl StdError for TokenError {}

/// Sign a token for `sub` expiring `ttl_seconds` from now.
pub fn sign(
    sub: &str,
    token_type: TokenType,
    secret: &str,
    ttl_seconds: i64,
) -> Result<SignedToken, AppError> {
    let issued_at = Utc::now().timestamp();
    let expires_at = issued_at + ttl_seconds;

    let claims = Claims {
        sub: sub.to_string(),
        token_type,
        iat: issued_at,
        exp: expires_at,
        jti: uuid::Uuid::new_v4().to_string(),
    };
    let payload = serde_json::to_vec(&claims)
        .map_err(|e| AppError::Internal(format!("Token payload encoding failed: {}", e)))?;

    let signing_input = format!("{}.{}", &*ENCODED_HEADER, URL_SAFE_NO_PAD.encode(payload));
    let signature = compute_signature(signing_input.as_bytes(), secret)?;

    Ok(SignedToken {
        token: format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)),
        expires_at,
    })
}

/// Verify a token's structure, header, signature, type, and expiry.
pub fn verify(token: &str, secret: &str, expected_type: TokenType) -> Result<Claims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(TokenError::Malformed);
    }
    let (header, payload, signature) = (segments[0], segments[1], segments[2]);

    if header != ENCODED_HEADER.as_str() {
        return Err(TokenError::UnsupportedHeader);
    }

    let provided_signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::Malformed)?;
    if provided_signature.len() != SIGNATURE_LENGTH {
        return Err(TokenError::BadSignature);
    }

    let signing_input = format!("{}.{}", header, payload);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| TokenError::BadSignature)?;
    mac.update(signing_input.as_bytes());
    // Constant-time comparison
    mac.verify_slice(&provided_signature)
        .map_err(|_| TokenError::BadSignature)?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| TokenError::Malformed)?;
    let claims: Claims =
        serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::Malformed)?;

    if claims.token_type != expected_type {
        return Err(TokenError::WrongType);
    }

    if claims.exp * 1000 <= Utc::now().timestamp_millis() {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

fn compute_signature(signing_input: &[u8], secret: &str) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("HMAC key setup failed: {}", e)))?;
    mac.update(signing_input);
    Ok(mac.finalize().into_bytes().to_vec())
}
