//! Bounded per-credential attempt history

use crate::attempt::AuthenticationAttempt;
use bindguard_core::DEFAULT_MAX_DEPTH;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Insertion-ordered attempts for one credential.
///
/// Holds at most `max_attempts` entries, dropping the oldest first. A limit
/// of zero disables pruning.
#[derive(Debug)]
pub struct AttemptHistory {
    max_attempts: AtomicUsize,
    attempts: Mutex<VecDeque<Arc<AuthenticationAttempt>>>,
}

impl Default for AttemptHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl AttemptHistory {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: AtomicUsize::new(max_attempts),
            attempts: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts.load(Ordering::Relaxed)
    }

    pub fn set_max_attempts(&self, max_attempts: usize) {
        self.max_attempts.store(max_attempts, Ordering::Relaxed);
        self.prune();
    }

    /// Append an attempt and trim the history in one step
    pub fn add(&self, attempt: Arc<AuthenticationAttempt>) {
        let mut attempts = self.attempts.lock();
        attempts.push_back(attempt);
        Self::trim(&mut attempts, self.max_attempts());
    }

    pub fn prune(&self) {
        let mut attempts = self.attempts.lock();
        Self::trim(&mut attempts, self.max_attempts());
    }

    fn trim(attempts: &mut VecDeque<Arc<AuthenticationAttempt>>, max: usize) {
        if max == 0 {
            return;
        }
        while attempts.len() > max {
            attempts.pop_front();
        }
    }

    /// The attempt with the latest start time. Ties go to the earlier entry.
    pub fn most_recent(&self) -> Option<Arc<AuthenticationAttempt>> {
        let attempts = self.attempts.lock();
        let mut latest: Option<&Arc<AuthenticationAttempt>> = None;

        for attempt in attempts.iter() {
            match latest {
                Some(current) if attempt.start_time() <= current.start_time() => {}
                _ => latest = Some(attempt),
            }
        }

        latest.cloned()
    }

    pub fn count(&self) -> usize {
        self.attempts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.lock().is_empty()
    }

    /// Copy of the current entries, oldest first
    pub fn attempts(&self) -> Vec<Arc<AuthenticationAttempt>> {
        self.attempts.lock().iter().cloned().collect()
    }
}
