//! Recent attempts keyed by username and password hash
//!
//! Each key owns its own [`AttemptHistory`], so attempts for different
//! credentials never contend on the same lock once the history exists.

use crate::attempt::AuthenticationAttempt;
use crate::credential::Credential;
use crate::history::AttemptHistory;
use bindguard_core::{CredentialError, DEFAULT_MAX_DEPTH};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct AuthenticationCache {
    max_depth: AtomicUsize,
    histories: RwLock<HashMap<String, Arc<AttemptHistory>>>,
}

impl Default for AuthenticationCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl AuthenticationCache {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: AtomicUsize::new(max_depth),
            histories: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth.load(Ordering::Relaxed)
    }

    /// Change the per-key limit for new and existing histories
    pub fn set_max_depth(&self, max_depth: usize) {
        self.max_depth.store(max_depth, Ordering::Relaxed);
        for history in self.histories.read().values() {
            history.set_max_attempts(max_depth);
        }
    }

    /// Record an attempt under its credential's key.
    ///
    /// Fails without touching the cache when the attempt has no credential or
    /// the credential cannot produce a key.
    pub fn add(&self, attempt: Arc<AuthenticationAttempt>) -> Result<(), CredentialError> {
        let key = attempt
            .credential()
            .ok_or(CredentialError::MissingCredential)?
            .cache_key()?;

        let history = self.history_for(key);
        history.add(attempt);
        Ok(())
    }

    fn history_for(&self, key: String) -> Arc<AttemptHistory> {
        if let Some(history) = self.histories.read().get(&key) {
            return Arc::clone(history);
        }

        let mut histories = self.histories.write();
        let history = histories.entry(key).or_insert_with_key(|key| {
            debug!("Creating attempt history for {}", key.split(':').next().unwrap_or(""));
            Arc::new(AttemptHistory::new(self.max_depth()))
        });
        Arc::clone(history)
    }

    fn lookup(&self, credential: &Credential) -> Option<Arc<AttemptHistory>> {
        let key = credential.cache_key().ok()?;
        self.histories.read().get(&key).cloned()
    }

    /// Most recent attempt for a credential, after pruning its history
    pub fn most_recent_attempt(&self, credential: &Credential) -> Option<Arc<AuthenticationAttempt>> {
        let history = self.lookup(credential)?;
        history.prune();
        history.most_recent()
    }

    pub fn history_count(&self, credential: &Credential) -> usize {
        self.lookup(credential).map_or(0, |h| h.count())
    }

    pub fn history(&self, credential: &Credential) -> Vec<Arc<AuthenticationAttempt>> {
        self.lookup(credential)
            .map(|h| h.attempts())
            .unwrap_or_default()
    }

    pub fn prune(&self, credential: &Credential) {
        if let Some(history) = self.lookup(credential) {
            history.prune();
        }
    }

    pub fn prune_all(&self) {
        for history in self.histories.read().values() {
            history.prune();
        }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.histories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::AuthStatus;
    use chrono::{TimeZone, Utc};

    fn credential(username: &str, hash: &[u8]) -> Credential {
        Credential::from_parts(username, b"salt".to_vec(), Some(hash.to_vec()))
    }

    fn attempt(credential: Option<Credential>, ms: i64) -> Arc<AuthenticationAttempt> {
        let mut attempt =
            AuthenticationAttempt::new(credential, Utc.timestamp_millis_opt(ms).unwrap());
        attempt.set_outcome(AuthStatus::Success, format!("at {}", ms));
        Arc::new(attempt)
    }

    #[test]
    fn test_add_and_lookup() {
        let cache = AuthenticationCache::new(10);
        let alice = credential("alice", b"hash");

        cache.add(attempt(Some(alice.clone()), 100)).unwrap();
        cache.add(attempt(Some(alice.clone()), 200)).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.history_count(&alice), 2);
        assert_eq!(cache.most_recent_attempt(&alice).unwrap().message(), "at 200");
    }

    #[test]
    fn test_keys_separate_users_and_passwords() {
        let cache = AuthenticationCache::new(10);
        cache.add(attempt(Some(credential("alice", b"one")), 1)).unwrap();
        cache.add(attempt(Some(credential("alice", b"two")), 2)).unwrap();
        cache.add(attempt(Some(credential("bob", b"one")), 3)).unwrap();

        assert_eq!(cache.len(), 3);
        assert!(cache
            .most_recent_attempt(&credential("carol", b"one"))
            .is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let cache = AuthenticationCache::new(3);
        let alice = credential("alice", b"hash");
        for i in 0..4 {
            cache.add(attempt(Some(alice.clone()), i)).unwrap();
        }

        let history = cache.history(&alice);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].message(), "at 1");
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        let cache = AuthenticationCache::new(10);

        assert_eq!(
            cache.add(attempt(None, 1)),
            Err(CredentialError::MissingCredential)
        );
        assert_eq!(
            cache.add(attempt(Some(credential("", b"hash")), 1)),
            Err(CredentialError::MissingUsername)
        );
        let no_hash = Credential::from_parts("alice", b"salt".to_vec(), None);
        assert_eq!(
            cache.add(attempt(Some(no_hash.clone()), 1)),
            Err(CredentialError::MissingPasswordDigest)
        );

        assert!(cache.is_empty());
        assert!(cache.most_recent_attempt(&no_hash).is_none());
        assert_eq!(cache.history_count(&no_hash), 0);
    }

    #[test]
    fn test_set_max_depth_applies_to_existing_histories() {
        let cache = AuthenticationCache::new(10);
        let alice = credential("alice", b"hash");
        for i in 0..8 {
            cache.add(attempt(Some(alice.clone()), i)).unwrap();
        }

        cache.set_max_depth(2);
        assert_eq!(cache.history_count(&alice), 2);

        let bob = credential("bob", b"hash");
        for i in 0..5 {
            cache.add(attempt(Some(bob.clone()), i)).unwrap();
        }
        assert_eq!(cache.history_count(&bob), 2);
    }

    #[test]
    fn test_concurrent_first_adds_share_one_history() {
        let cache = Arc::new(AuthenticationCache::new(0));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..20 {
                        cache
                            .add(attempt(Some(credential("alice", b"hash")), t * 100 + i))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.history_count(&credential("alice", b"hash")), 160);
    }
}
