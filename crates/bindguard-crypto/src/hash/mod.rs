//! Password hashing utilities
//!
//! Passwords are never kept in memory past the hashing call. What is kept is a
//! PBKDF2-HMAC-SHA1 digest (65536 rounds, 128-bit key) that lets two attempts
//! be compared without being able to recover the password. The parameters
//! match credential strings produced by earlier deployments of the encoder,
//! so they must not change.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::Hmac;
use rand::RngCore;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 65_536;

/// Derived key length in bytes (128 bits)
pub const DERIVED_KEY_LENGTH: usize = 16;

/// Default salt length in bytes
pub const DEFAULT_SALT_LENGTH: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Password key derivation unavailable: {0}")]
    DerivationUnavailable(String),

    #[error("Invalid Base64 string: {0}")]
    InvalidBase64(String),
}

/// Generate `length` cryptographically secure random bytes
pub fn generate_salt(length: usize) -> Vec<u8> {
    let mut salt = vec![0u8; length];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Generate a salt of [`DEFAULT_SALT_LENGTH`] bytes
pub fn default_salt() -> Vec<u8> {
    generate_salt(DEFAULT_SALT_LENGTH)
}

/// Hash a password with the given salt.
///
/// Returns `Ok(None)` when the password is blank after trimming. The same
/// salt and password always produce the same digest.
pub fn hash_password(salt: &[u8], password: &str) -> Result<Option<Vec<u8>>, CryptoError> {
    if password.trim().is_empty() {
        return Ok(None);
    }

    let mut digest = vec![0u8; DERIVED_KEY_LENGTH];
    derive(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut digest)?;
    Ok(Some(digest))
}

fn derive(password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) -> Result<(), CryptoError> {
    pbkdf2::pbkdf2::<Hmac<Sha1>>(password, salt, rounds, out)
        .map_err(|e| CryptoError::DerivationUnavailable(e.to_string()))
}

/// Compare two digests in constant time.
///
/// Two absent (or empty) digests match; an absent digest never matches a
/// present one.
pub fn digests_match(expected: Option<&[u8]>, candidate: Option<&[u8]>) -> bool {
    let expected = expected.filter(|d| !d.is_empty());
    let candidate = candidate.filter(|d| !d.is_empty());

    match (expected, candidate) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ct_eq(b).into(),
        _ => false,
    }
}

/// Base64 encode, returning `None` for empty input
pub fn base64_encode(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        None
    } else {
        Some(STANDARD.encode(bytes))
    }
}

/// Base64 decode, returning `None` for an empty string
pub fn base64_decode(encoded: &str) -> Result<Option<Vec<u8>>, CryptoError> {
    if encoded.is_empty() {
        return Ok(None);
    }

    STANDARD
        .decode(encoded)
        .map(Some)
        .map_err(|_| CryptoError::InvalidBase64(encoded.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbkdf2_known_vector() {
        // RFC 6070, c = 1
        let mut out = [0u8; 20];
        derive(b"password", b"salt", 1, &mut out).unwrap();
        assert_eq!(
            out,
            [
                0x0c, 0x60, 0xc8, 0x0f, 0x96, 0x1f, 0x0e, 0x71, 0xf3, 0xa9, 0xb5, 0x24, 0xaf,
                0x60, 0x12, 0x06, 0x2f, 0xe0, 0x37, 0xa6
            ]
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        let salt = default_salt();
        let first = hash_password(&salt, "hunter2").unwrap();
        let second = hash_password(&salt, "hunter2").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.unwrap().len(), DERIVED_KEY_LENGTH);
    }

    #[test]
    fn test_blank_password_has_no_hash() {
        let salt = default_salt();
        assert_eq!(hash_password(&salt, "").unwrap(), None);
        assert_eq!(hash_password(&salt, "   \t").unwrap(), None);
    }

    #[test]
    fn test_salt_changes_hash() {
        let a = hash_password(&generate_salt(16), "hunter2").unwrap();
        let b = hash_password(&generate_salt(16), "hunter2").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_digests_match() {
        let abc: &[u8] = &[1, 2, 3];
        let abd: &[u8] = &[1, 2, 4];
        let ab: &[u8] = &[1, 2];
        let empty: &[u8] = &[];

        assert!(digests_match(None, None));
        assert!(digests_match(Some(empty), None));
        assert!(digests_match(Some(abc), Some(abc)));
        assert!(!digests_match(Some(abc), Some(abd)));
        assert!(!digests_match(Some(abc), Some(ab)));
        assert!(!digests_match(Some(abc), None));
        assert!(!digests_match(None, Some(ab)));
    }

    #[test]
    fn test_base64_helpers() {
        assert_eq!(base64_encode(&[]), None);
        assert_eq!(base64_encode(b"salt").as_deref(), Some("c2FsdA=="));
        assert_eq!(base64_decode("").unwrap(), None);
        assert_eq!(base64_decode("c2FsdA==").unwrap(), Some(b"salt".to_vec()));
        assert!(matches!(
            base64_decode("not base64!"),
            Err(CryptoError::InvalidBase64(_))
        ));
    }
}
