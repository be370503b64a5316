//! Authentication against a fixed list of encoded credentials
//!
//! The list is a whitespace separated set of `username:salt:hash` tokens as
//! printed by `bindguard encode`. No directory or cache is involved.

use crate::attempt::{AuthStatus, AuthenticationAttempt};
use crate::audit::log_attempt;
use crate::clock::{Clock, SystemClock};
use crate::coordinator::Authenticator;
use crate::credential::Credential;
use async_trait::async_trait;
use bindguard_core::CredentialError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct StaticAuthenticator {
    credentials: HashMap<String, Credential>,
    clock: Arc<dyn Clock>,
}

impl StaticAuthenticator {
    /// Later credentials replace earlier ones with the same username
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        let mut by_username = HashMap::new();
        for credential in credentials {
            if let Some(previous) =
                by_username.insert(credential.username().to_string(), credential)
            {
                warn!("Duplicate static credential for {}", previous.username());
            }
        }

        Self {
            credentials: by_username,
            clock: Arc::new(SystemClock),
        }
    }

    /// Parse a credential list. Any malformed token rejects the whole list.
    pub fn from_list(list: &str) -> Result<Self, CredentialError> {
        let credentials = list
            .split_whitespace()
            .map(Credential::parse)
            .collect::<Result<Vec<_>, _>>()?;

        // Fail at configuration time if hashing is unusable.
        Credential::with_random_salt("bindguard", "self-test")?;

        let authenticator = Self::new(credentials);
        info!(
            "Loaded {} static credential(s)",
            authenticator.credentials.len()
        );
        Ok(authenticator)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.credentials.contains_key(username)
    }

    fn check(&self, username: &str, password: &str) -> AuthenticationAttempt {
        let start = self.clock.now();

        let Some(expected) = self.credentials.get(username) else {
            let mut attempt =
                AuthenticationAttempt::new(Credential::with_random_salt(username, password).ok(), start);
            attempt.set_outcome(
                AuthStatus::Failure,
                format!("Not a valid username: {}", username),
            );
            return attempt;
        };

        let candidate = match Credential::new(username, password, expected.salt()) {
            Ok(candidate) => candidate,
            Err(e) => {
                let mut attempt = AuthenticationAttempt::new(None, start);
                attempt.set_outcome(AuthStatus::Error, e.to_string());
                return attempt;
            }
        };

        let matches = expected.matches_hash(candidate.hashed_password());
        let mut attempt = AuthenticationAttempt::new(Some(candidate), start);
        if matches {
            attempt.set_outcome(
                AuthStatus::Success,
                format!("Successfully authenticated username: {}", username),
            );
        } else {
            attempt.set_outcome(
                AuthStatus::Failure,
                format!("Password does not match for username: {}", username),
            );
        }
        attempt
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> AuthenticationAttempt {
        let mut attempt = self.check(username, password);
        attempt.finish(self.clock.now());
        log_attempt(&attempt);
        attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> String {
        Credential::with_random_salt("bob", "hunter2")
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_static_credentials() {
        let authenticator = StaticAuthenticator::from_list(&bob()).unwrap();

        let ok = authenticator.authenticate("bob", "hunter2").await;
        assert_eq!(ok.status(), AuthStatus::Success);
        assert_eq!(ok.message(), "Successfully authenticated username: bob");

        let wrong = authenticator.authenticate("bob", "wrong").await;
        assert_eq!(wrong.status(), AuthStatus::Failure);
        assert_eq!(wrong.message(), "Password does not match for username: bob");

        let unknown = authenticator.authenticate("carol", "hunter2").await;
        assert_eq!(unknown.status(), AuthStatus::Failure);
        assert_eq!(unknown.message(), "Not a valid username: carol");
        assert_eq!(unknown.username(), Some("carol"));
    }

    #[tokio::test]
    async fn test_blank_password_fails() {
        let authenticator = StaticAuthenticator::from_list(&bob()).unwrap();
        assert!(!authenticator.is_authenticated("bob", "").await);
    }

    #[test]
    fn test_list_parsing() {
        let alice = Credential::with_random_salt("alice", "pw").unwrap().to_string();
        let list = format!("  {}\n\t{}  ", bob(), alice);
        let authenticator = StaticAuthenticator::from_list(&list).unwrap();

        assert_eq!(authenticator.len(), 2);
        assert!(authenticator.contains("alice"));
        assert!(authenticator.contains("bob"));

        assert!(StaticAuthenticator::from_list("").unwrap().is_empty());
        assert!(StaticAuthenticator::from_list(&format!("{} garbage", bob())).is_err());
    }

    #[tokio::test]
    async fn test_last_duplicate_wins() {
        let first = Credential::with_random_salt("bob", "old").unwrap().to_string();
        let second = Credential::with_random_salt("bob", "new").unwrap().to_string();
        let authenticator =
            StaticAuthenticator::from_list(&format!("{} {}", first, second)).unwrap();

        assert_eq!(authenticator.len(), 1);
        assert!(authenticator.is_authenticated("bob", "new").await);
        assert!(!authenticator.is_authenticated("bob", "old").await);
    }
}
