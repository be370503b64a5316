//! Error types for Bindguard

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Malformed or incomplete credentials.
///
/// Always recoverable by the caller: an authentication request carrying a
/// bad credential fails on its own without affecting other requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Authentication attempt contains null user credentials")]
    MissingCredential,

    #[error("Credentials contain a null or empty username")]
    MissingUsername,

    #[error("Credentials contain a null or empty password digest")]
    MissingPasswordDigest,

    #[error("Malformed credential string: {0}")]
    Malformed(String),

    #[error("Invalid Base64 string: {0}")]
    InvalidBase64(String),

    #[error("Unable to encode password: {0}")]
    Hashing(String),
}

impl CredentialError {
    pub fn code(&self) -> &'static str {
        match self {
            CredentialError::MissingCredential => "MissingCredential",
            CredentialError::MissingUsername => "MissingUsername",
            CredentialError::MissingPasswordDigest => "MissingPasswordDigest",
            CredentialError::Malformed(_) => "MalformedCredential",
            CredentialError::InvalidBase64(_) => "InvalidBase64",
            CredentialError::Hashing(_) => "HashingUnavailable",
        }
    }
}

/// Failures talking to the external directory.
///
/// These surface as an ERROR attempt so that "directory unreachable" is never
/// confused with "wrong password".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Directory client is not bound to a server")]
    NotConnected,

    #[error("Failed to connect to directory server: {0}")]
    Connection(String),

    #[error("Bind failed with code {rc}: {message}")]
    Bind { rc: u32, message: String },

    #[error("Directory search failed: {0}")]
    Search(String),

    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    #[error("Directory configuration error: {0}")]
    Config(String),
}

impl DirectoryError {
    pub fn code(&self) -> &'static str {
        match self {
            DirectoryError::NotConnected => "NotConnected",
            DirectoryError::Connection(_) => "ConnectionFailed",
            DirectoryError::Bind { .. } => "BindFailed",
            DirectoryError::Search(_) => "SearchFailed",
            DirectoryError::InvalidDn(_) => "InvalidDn",
            DirectoryError::Config(_) => "InvalidConfiguration",
        }
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Credential(e) => e.code(),
            Error::Directory(e) => e.code(),
            Error::Config(_) => "InvalidConfiguration",
            Error::Io(_) => "IoError",
            Error::Internal(_) | Error::Other(_) => "InternalError",
        }
    }
}
