//! Username and hashed password pairs
//!
//! A [`Credential`] never holds the plaintext password. It keeps the salt and
//! the PBKDF2 digest so that two attempts can be compared, and it can be
//! written to configuration as `username:base64(salt):base64(hash)`.

use bindguard_core::CredentialError;
use bindguard_crypto::{
    base64_decode, base64_encode, default_salt, digests_match, hash_password, CryptoError,
};
use std::fmt;
use std::str::FromStr;

/// Separates the username from the salt
pub const USERNAME_DELIMITER: char = ':';

/// Separates the salt from the hashed password
pub const SALT_DELIMITER: char = ':';

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    salt: Vec<u8>,
    hashed_password: Option<Vec<u8>>,
}

fn hashing_error(err: CryptoError) -> CredentialError {
    match err {
        CryptoError::InvalidBase64(s) => CredentialError::InvalidBase64(s),
        other => CredentialError::Hashing(other.to_string()),
    }
}

impl Credential {
    /// Hash `password` with `salt`. A blank password yields a credential
    /// without a hash.
    pub fn new(
        username: impl Into<String>,
        password: &str,
        salt: &[u8],
    ) -> Result<Self, CredentialError> {
        let hashed_password = hash_password(salt, password).map_err(hashing_error)?;

        Ok(Self {
            username: username.into(),
            salt: salt.to_vec(),
            hashed_password,
        })
    }

    /// Hash `password` with a freshly generated salt
    pub fn with_random_salt(
        username: impl Into<String>,
        password: &str,
    ) -> Result<Self, CredentialError> {
        Self::new(username, password, &default_salt())
    }

    /// Build a credential from an already hashed password
    pub fn from_parts(
        username: impl Into<String>,
        salt: Vec<u8>,
        hashed_password: Option<Vec<u8>>,
    ) -> Self {
        Self {
            username: username.into(),
            salt,
            hashed_password: hashed_password.filter(|h| !h.is_empty()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn hashed_password(&self) -> Option<&[u8]> {
        self.hashed_password.as_deref()
    }

    pub fn salt_base64(&self) -> Option<String> {
        base64_encode(&self.salt)
    }

    pub fn hash_base64(&self) -> Option<String> {
        self.hashed_password.as_deref().and_then(base64_encode)
    }

    /// Returns true if `password` hashed with `salt` matches this credential
    pub fn matches_password(&self, password: &str, salt: &[u8]) -> Result<bool, CredentialError> {
        let candidate = hash_password(salt, password).map_err(hashing_error)?;
        Ok(self.matches_hash(candidate.as_deref()))
    }

    pub fn matches_hash(&self, digest: Option<&[u8]>) -> bool {
        digests_match(self.hashed_password.as_deref(), digest)
    }

    /// Duplicate attempts share the username (case-sensitive) and the
    /// password hash.
    pub fn is_duplicate(&self, other: &Credential) -> bool {
        self.username == other.username && self.matches_hash(other.hashed_password())
    }

    /// Key used to correlate repeated attempts: `username:base64(hash)`
    pub fn cache_key(&self) -> Result<String, CredentialError> {
        if self.username.is_empty() {
            return Err(CredentialError::MissingUsername);
        }
        let digest = self
            .hash_base64()
            .ok_or(CredentialError::MissingPasswordDigest)?;

        Ok(format!("{}{}{}", self.username, USERNAME_DELIMITER, digest))
    }

    /// Parse a string produced by the `Display` impl
    pub fn parse(input: &str) -> Result<Self, CredentialError> {
        let (username, rest) = input
            .split_once(USERNAME_DELIMITER)
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| CredentialError::Malformed("missing username".into()))?;

        let (b64_salt, b64_hash) = rest
            .split_once(SALT_DELIMITER)
            .filter(|(salt, hash)| !salt.is_empty() && !hash.is_empty())
            .ok_or_else(|| CredentialError::Malformed("missing salt or password".into()))?;

        let salt = base64_decode(b64_salt).map_err(hashing_error)?;
        let hash = base64_decode(b64_hash).map_err(hashing_error)?;

        Ok(Self::from_parts(username, salt.unwrap_or_default(), hash))
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.username,
            USERNAME_DELIMITER,
            self.salt_base64().unwrap_or_default(),
            SALT_DELIMITER,
            self.hash_base64().unwrap_or_default()
        )
    }
}

impl FromStr for Credential {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Salt and hash stay out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("salt", &"<redacted>")
            .field(
                "hashed_password",
                &self.hashed_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let credential = Credential::with_random_salt("alice", "s3cret").unwrap();
        let encoded = credential.to_string();
        let parsed: Credential = encoded.parse().unwrap();

        assert_eq!(parsed.username(), "alice");
        assert_eq!(parsed.salt(), credential.salt());
        assert_eq!(parsed.hashed_password(), credential.hashed_password());
        assert_eq!(parsed, credential);
    }

    #[test]
    fn test_display_format() {
        let credential = Credential::from_parts("bob", b"salt".to_vec(), Some(b"hash".to_vec()));
        assert_eq!(credential.to_string(), "bob:c2FsdA==:aGFzaA==");

        let no_hash = Credential::from_parts("bob", b"salt".to_vec(), None);
        assert_eq!(no_hash.to_string(), "bob:c2FsdA==:");
    }

    #[test]
    fn test_parse_rejects_malformed_strings() {
        for input in [
            "bob",
            ":c2FsdA==:aGFzaA==",
            "bob:c2FsdA==",
            "bob:c2FsdA==:",
            "bob::aGFzaA==",
        ] {
            assert!(
                matches!(Credential::parse(input), Err(CredentialError::Malformed(_))),
                "expected {} to be rejected",
                input
            );
        }

        assert!(matches!(
            Credential::parse("bob:c2FsdA==:###"),
            Err(CredentialError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_matches_password() {
        let credential = Credential::with_random_salt("bob", "hunter2").unwrap();
        let salt = credential.salt().to_vec();

        assert!(credential.matches_password("hunter2", &salt).unwrap());
        assert!(!credential.matches_password("wrong", &salt).unwrap());
        assert!(!credential.matches_password("", &salt).unwrap());
    }

    #[test]
    fn test_duplicates() {
        let salt = default_salt();
        let a = Credential::new("alice", "pw", &salt).unwrap();
        let b = Credential::new("alice", "pw", &salt).unwrap();
        let other_user = Credential::new("Alice", "pw", &salt).unwrap();
        let other_pw = Credential::new("alice", "pw2", &salt).unwrap();

        assert!(a.is_duplicate(&b));
        assert!(!a.is_duplicate(&other_user));
        assert!(!a.is_duplicate(&other_pw));

        let blank_a = Credential::new("alice", " ", &salt).unwrap();
        let blank_b = Credential::new("alice", "", &salt).unwrap();
        assert!(blank_a.is_duplicate(&blank_b));
        assert!(!blank_a.is_duplicate(&a));
    }

    #[test]
    fn test_random_salts_are_not_duplicates() {
        let a = Credential::with_random_salt("alice", "pw").unwrap();
        let b = Credential::with_random_salt("alice", "pw").unwrap();
        assert!(!a.is_duplicate(&b));
    }

    #[test]
    fn test_cache_key() {
        let credential = Credential::from_parts("bob", b"salt".to_vec(), Some(b"hash".to_vec()));
        assert_eq!(credential.cache_key().unwrap(), "bob:aGFzaA==");

        let anonymous = Credential::from_parts("", b"salt".to_vec(), Some(b"hash".to_vec()));
        assert_eq!(anonymous.cache_key(), Err(CredentialError::MissingUsername));

        let no_hash = Credential::from_parts("bob", b"salt".to_vec(), None);
        assert_eq!(no_hash.cache_key(), Err(CredentialError::MissingPasswordDigest));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credential = Credential::from_parts("bob", b"salt".to_vec(), Some(b"hash".to_vec()));
        let debug = format!("{:?}", credential);

        assert!(debug.contains("bob"));
        assert!(!debug.contains("c2FsdA"));
        assert!(!debug.contains("115"));
    }
}
