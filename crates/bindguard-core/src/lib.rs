//! Bindguard Core Library
//!
//! Error taxonomy and configuration shared by the Bindguard crates.

pub mod config;
pub mod error;

pub use config::{AuthConfig, CacheConfig, DirectoryAttributes, LdapConfig, LoggingConfig};
pub use error::{ConfigError, CredentialError, DirectoryError, Error, Result};

/// Bindguard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of attempts remembered per credential
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Default freshness window for cached attempts (10 minutes)
pub const DEFAULT_MAX_AGE_MS: u64 = 10 * 60 * 1000;
