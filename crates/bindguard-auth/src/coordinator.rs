//! Cache-then-directory authentication
//!
//! The [`CoordinatorContext`] is built once by whatever owns the connections
//! and shared by every request. A request first looks for a recent attempt
//! with the same username and password hash; only when none is fresh enough
//! does it go to the directory.

use crate::attempt::{AuthStatus, AuthenticationAttempt};
use crate::audit::log_attempt;
use crate::cache::AuthenticationCache;
use crate::clock::{Clock, SystemClock};
use crate::credential::Credential;
use crate::ldap::Directory;
use async_trait::async_trait;
use bindguard_core::{CacheConfig, CredentialError};
use bindguard_crypto::default_salt;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error};

pub const DIRECTORY_SUCCESS_MESSAGE: &str = "Successfully authenticated against LDAP server.";
pub const DIRECTORY_FAILURE_MESSAGE: &str = "Authentication failed against LDAP server.";

/// Anything that turns a username and password into a finished attempt
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> AuthenticationAttempt;

    async fn is_authenticated(&self, username: &str, password: &str) -> bool {
        self.authenticate(username, password).await.was_successful()
    }
}

/// State shared by all authentication requests
pub struct CoordinatorContext {
    cache: AuthenticationCache,
    directory: Arc<dyn Directory>,
    cache_enabled: bool,
    max_age: Duration,
    salt: Vec<u8>,
    clock: Arc<dyn Clock>,
}

impl CoordinatorContext {
    /// Build the shared context.
    ///
    /// Hashes a throwaway password once so that an unusable key derivation
    /// fails here instead of on every request.
    pub fn new(directory: Arc<dyn Directory>, settings: &CacheConfig) -> Result<Self, CredentialError> {
        let salt = default_salt();
        Credential::new("bindguard", "self-test", &salt)?;

        let max_age = i64::try_from(settings.max_age_ms)
            .map(Duration::milliseconds)
            .unwrap_or(Duration::MAX);

        Ok(Self {
            cache: AuthenticationCache::new(settings.max_depth),
            directory,
            cache_enabled: settings.enabled,
            max_age,
            salt,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(&self) -> &AuthenticationCache {
        &self.cache
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

#[derive(Clone)]
pub struct AuthenticationCoordinator {
    context: Arc<CoordinatorContext>,
}

impl AuthenticationCoordinator {
    pub fn new(context: Arc<CoordinatorContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &CoordinatorContext {
        &self.context
    }

    // Replays the newest cached outcome when it is younger than the age limit.
    fn replay_from_cache(&self, credential: &Credential, attempt: &mut AuthenticationAttempt) -> bool {
        let Some(previous) = self.context.cache.most_recent_attempt(credential) else {
            return false;
        };

        let age = attempt.start_time() - previous.start_time();
        if age >= self.context.max_age {
            debug!(
                "Cached attempt for {} is {} ms old, querying directory",
                credential.username(),
                age.num_milliseconds()
            );
            return false;
        }

        attempt.set_outcome(
            previous.status(),
            format!("User authenticated from cache (formerly: {})", previous.message()),
        );
        true
    }

    async fn query_directory(&self, username: &str, password: &str, attempt: &mut AuthenticationAttempt) {
        match self.context.directory.verify_credentials(username, password).await {
            Ok(true) => attempt.set_outcome(AuthStatus::Success, DIRECTORY_SUCCESS_MESSAGE),
            Ok(false) => attempt.set_outcome(AuthStatus::Failure, DIRECTORY_FAILURE_MESSAGE),
            Err(e) => {
                error!("Directory authentication failed for {}: {}", username, e);
                attempt.set_outcome(AuthStatus::Error, e.to_string());
            }
        }
    }
}

#[async_trait]
impl Authenticator for AuthenticationCoordinator {
    async fn authenticate(&self, username: &str, password: &str) -> AuthenticationAttempt {
        let start = self.context.clock.now();

        let credential = match Credential::new(username, password, &self.context.salt) {
            Ok(credential) => credential,
            Err(e) => {
                let mut attempt = AuthenticationAttempt::new(None, start);
                attempt.set_outcome(AuthStatus::Error, e.to_string());
                attempt.finish(self.context.clock.now());
                log_attempt(&attempt);
                return attempt;
            }
        };

        let mut attempt = AuthenticationAttempt::new(Some(credential.clone()), start);

        let from_cache =
            self.context.cache_enabled && self.replay_from_cache(&credential, &mut attempt);
        if !from_cache {
            self.query_directory(username, password, &mut attempt).await;
        }

        // Finished before it is shared with the cache.
        attempt.finish(self.context.clock.now());

        // Only directory verdicts are recorded.
        if self.context.cache_enabled && !from_cache {
            if let Err(e) = self.context.cache.add(Arc::new(attempt.clone())) {
                error!("Failed to add attempt to cache: {}", e);
            }
        }

        log_attempt(&attempt);
        attempt
    }
}
