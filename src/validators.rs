/// Input validators for the authentication surface
///
/// Emails are length-checked, format-checked, and case-normalized before
/// they reach the user store; names are trimmed and bounded.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_NAME_LENGTH: usize = 100;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validate and normalize an email address.
///
/// Returns the trimmed, lowercased form used as the unique user key.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_lowercase())
}

/// Trim an optional name field, dropping it entirely when blank.
pub fn normalize_name(name: Option<&str>) -> Result<Option<String>, ValidationError> {
    match name.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) if trimmed.len() > MAX_NAME_LENGTH => {
            Err(ValidationError::TooLong("name".to_string(), MAX_NAME_LENGTH))
        }
        Some(trimmed) => Ok(Some(trimmed.to_string())),
    }
}
