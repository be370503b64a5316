//! A single authentication attempt and its outcome

use crate::credential::Credential;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthStatus {
    Success,
    #[default]
    Failure,
    /// The outcome could not be determined
    Error,
}

impl AuthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::Success => "SUCCESS",
            AuthStatus::Failure => "FAILURE",
            AuthStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one authentication attempt.
///
/// Attempts start out as FAILURE with an empty message. Once recorded in the
/// cache they are shared behind an `Arc` and no longer change.
#[derive(Debug, Clone)]
pub struct AuthenticationAttempt {
    credential: Option<Credential>,
    status: AuthStatus,
    message: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

impl AuthenticationAttempt {
    pub fn new(credential: Option<Credential>, start_time: DateTime<Utc>) -> Self {
        Self {
            credential,
            status: AuthStatus::default(),
            message: String::new(),
            start_time,
            end_time: None,
        }
    }

    pub fn started_now(credential: Option<Credential>) -> Self {
        Self::new(credential, Utc::now())
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.credential.as_ref().map(Credential::username)
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn was_successful(&self) -> bool {
        self.status == AuthStatus::Success
    }

    pub fn set_outcome(&mut self, status: AuthStatus, message: impl Into<String>) {
        self.status = status;
        self.message = message.into();
    }

    pub fn finish(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
    }

    /// Time between start and end, zero while the attempt is unfinished
    pub fn elapsed(&self) -> Duration {
        self.end_time
            .map(|end| end - self.start_time)
            .unwrap_or_else(Duration::zero)
    }
}

impl fmt::Display for AuthenticationAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{} ms] {}",
            self.status,
            self.username().unwrap_or("-"),
            self.elapsed().num_milliseconds(),
            self.message
        )
    }
}
