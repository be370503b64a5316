//! Attempt log
//!
//! Every completed attempt is written to the `bindguard::attempts` target.
//! Successes go out at debug level, everything else at info, so a default
//! deployment records failures without flooding on logins.

use crate::attempt::{AuthStatus, AuthenticationAttempt};
use tracing::{debug, info};

pub const ATTEMPT_LOG_TARGET: &str = "bindguard::attempts";

pub fn log_attempt(attempt: &AuthenticationAttempt) {
    match attempt.status() {
        AuthStatus::Success => debug!(target: ATTEMPT_LOG_TARGET, "{}", attempt),
        AuthStatus::Failure | AuthStatus::Error => info!(target: ATTEMPT_LOG_TARGET, "{}", attempt),
    }
}
