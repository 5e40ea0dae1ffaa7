/// Password Hashing and Verification
///
/// Passwords are hashed with PBKDF2 over a random 16-byte salt. The stored
/// record is self-describing ("{iterations}:{digest}:{saltHex}:{derivedKeyHex}")
/// so old hashes stay verifiable after a parameter upgrade. Verification
/// re-derives with the parameters found in the record and compares in
/// constant time; any malformed record verifies as false rather than
/// erroring.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Sha256, Sha512};

use crate::error::{AppError, ValidationError};

const SALT_LENGTH: usize = 16;

/// Digest algorithms accepted for PBKDF2 key derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordDigest {
    Sha256,
    Sha512,
}

impl PasswordDigest {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha256" => Some(PasswordDigest::Sha256),
            "sha512" => Some(PasswordDigest::Sha512),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PasswordDigest::Sha256 => "sha256",
            PasswordDigest::Sha512 => "sha512",
        }
    }
}

/// Derives and verifies salted PBKDF2 password hashes.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    iterations: u32,
    digest: PasswordDigest,
    key_length: usize,
}

impl PasswordHasher {
    pub fn new(iterations: u32, digest: PasswordDigest, key_length: usize) -> Self {
        Self {
            iterations,
            digest,
            key_length,
        }
    }

    /// Hash a password into a self-describing record.
    ///
    /// # Errors
    /// Returns a validation error for an empty password.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.is_empty() {
            return Err(AppError::Validation(ValidationError::EmptyField(
                "password".to_string(),
            )));
        }

        let mut salt = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt);
        // The hex form of the salt is the PBKDF2 salt input, so the record
        // round-trips without a decode step on verification.
        let salt_hex = hex::encode(salt);

        let derived = derive_key(
            password.as_bytes(),
            salt_hex.as_bytes(),
            self.iterations,
            self.key_length,
            self.digest,
        );

        Ok(format!(
            "{}:{}:{}:{}",
            self.iterations,
            self.digest.name(),
            salt_hex,
            hex::encode(derived)
        ))
    }

    /// Verify a password against a stored record.
    ///
    /// Never errors: a record that cannot be parsed, names an unknown
    /// digest, or carries a zero iteration count simply fails verification.
    pub fn verify(password: &str, stored: &str) -> bool {
        let parts: Vec<&str> = stored.split(':').collect();
        if parts.len() != 4 {
            return false;
        }

        let iterations = match parts[0].parse::<u32>() {
            Ok(0) | Err(_) => return false,
            Ok(n) => n,
        };
        let digest = match PasswordDigest::from_name(parts[1]) {
            Some(d) => d,
            None => return false,
        };
        let salt = parts[2];
        let expected = match hex::decode(parts[3]) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return false,
        };

        let derived = derive_key(
            password.as_bytes(),
            salt.as_bytes(),
            iterations,
            expected.len(),
            digest,
        );

        constant_time_eq(&expected, &derived)
    }
}

fn derive_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    key_length: usize,
    digest: PasswordDigest,
) -> Vec<u8> {
    let mut out = vec![0u8; key_length];
    match digest {
        PasswordDigest::Sha256 => pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out),
        PasswordDigest::Sha512 => pbkdf2_hmac::<Sha512>(password, salt, iterations, &mut out),
    }
    out
}

/// Compare two byte slices without short-circuiting on the first
/// differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
