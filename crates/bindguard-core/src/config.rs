//! Configuration for Bindguard
//!
//! Configuration can be loaded from a TOML file, from `BINDGUARD_*`
//! environment variables, or from the flat property map handed over by a
//! message broker when it instantiates the authentication handler.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// Broker property: directory server URL
pub const PROP_LDAP_SERVER_URL: &str = "auth.ldap.server.url";
/// Broker property: service account DN
pub const PROP_LDAP_BIND_DN: &str = "auth.ldap.bind.dn";
/// Broker property: service account password
pub const PROP_LDAP_BIND_PASSWORD: &str = "auth.ldap.bind.password";
/// Broker property: attribute holding the login name
pub const PROP_LDAP_ACCOUNT_NAME_FIELD: &str = "auth.ldap.user.id";
/// Broker property: toggle the attempt cache
pub const PROP_CACHE_ENABLED: &str = "auth.cache.enabled";
/// Broker property: attempts remembered per credential
pub const PROP_CACHE_MAX_DEPTH: &str = "auth.cache.history.maxDepth";
/// Broker property: cache freshness window in milliseconds
pub const PROP_CACHE_MAX_AGE: &str = "auth.cache.history.maxAge";
/// Broker property: whitespace separated static credential list
pub const PROP_STATIC_CREDENTIALS: &str = "auth.static.credentials";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub ldap: LdapConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Static `username:base64(salt):base64(hash)` tokens. When present the
    /// static authenticator is used instead of the directory.
    #[serde(default)]
    pub static_credentials: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AuthConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("BINDGUARD_LDAP_URL") {
            config.ldap.server_url = url;
        }
        if let Ok(dn) = std::env::var("BINDGUARD_BIND_DN") {
            config.ldap.bind_dn = dn;
        }
        if let Ok(password) = std::env::var("BINDGUARD_BIND_PASSWORD") {
            config.ldap.bind_password = password;
        }
        if let Ok(base) = std::env::var("BINDGUARD_USER_BASE_DN") {
            config.ldap.user_base_dn = base;
        }
        if let Ok(attr) = std::env::var("BINDGUARD_ACCOUNT_ATTRIBUTE") {
            config.ldap.attributes.account_name = attr;
        }
        if let Ok(enabled) = std::env::var("BINDGUARD_CACHE_ENABLED") {
            config.cache.enabled = enabled.eq_ignore_ascii_case("true");
        }
        if let Ok(depth) = std::env::var("BINDGUARD_CACHE_MAX_DEPTH") {
            match depth.parse() {
                Ok(d) => config.cache.max_depth = d,
                Err(_) => warn!("Ignoring invalid BINDGUARD_CACHE_MAX_DEPTH: {}", depth),
            }
        }
        if let Ok(age) = std::env::var("BINDGUARD_CACHE_MAX_AGE_MS") {
            match age.parse() {
                Ok(a) => config.cache.max_age_ms = a,
                Err(_) => warn!("Ignoring invalid BINDGUARD_CACHE_MAX_AGE_MS: {}", age),
            }
        }
        if let Ok(list) = std::env::var("BINDGUARD_STATIC_CREDENTIALS") {
            config.static_credentials = Some(list);
        }
        if let Ok(level) = std::env::var("BINDGUARD_LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }

    /// Build a configuration from broker properties.
    ///
    /// Missing keys keep their defaults. Numbers and booleans that do not
    /// parse are rejected so a typo cannot silently disable the cache.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match props.get(PROP_LDAP_SERVER_URL) {
            Some(url) if !url.trim().is_empty() => {
                info!("Property is set: {} = {}", PROP_LDAP_SERVER_URL, url);
                config.ldap.server_url = url.trim().to_string();
            }
            _ => warn!("Property must not be null or empty: {}", PROP_LDAP_SERVER_URL),
        }

        if let Some(field) = props.get(PROP_LDAP_ACCOUNT_NAME_FIELD) {
            info!("Property is set: {} = {}", PROP_LDAP_ACCOUNT_NAME_FIELD, field);
            config.ldap.attributes.account_name = field.trim().to_string();
        }

        match props.get(PROP_LDAP_BIND_DN) {
            Some(dn) if !dn.trim().is_empty() => {
                info!("Property is set: {} = {}", PROP_LDAP_BIND_DN, dn);
                config.ldap.bind_dn = dn.clone();
            }
            _ => warn!("Property must not be null or empty: {}", PROP_LDAP_BIND_DN),
        }

        match props.get(PROP_LDAP_BIND_PASSWORD) {
            Some(password) if !password.trim().is_empty() => {
                info!("Property is set: {}", PROP_LDAP_BIND_PASSWORD);
                config.ldap.bind_password = password.clone();
            }
            _ => warn!("Property must not be null or empty: {}", PROP_LDAP_BIND_PASSWORD),
        }

        if let Some(value) = props.get(PROP_CACHE_ENABLED) {
            config.cache.enabled = parse_bool(PROP_CACHE_ENABLED, value)?;
        }
        if let Some(value) = props.get(PROP_CACHE_MAX_DEPTH) {
            config.cache.max_depth = parse_number(PROP_CACHE_MAX_DEPTH, value)?;
        }
        if let Some(value) = props.get(PROP_CACHE_MAX_AGE) {
            config.cache.max_age_ms = parse_number(PROP_CACHE_MAX_AGE, value)?;
        }
        info!(
            "Cache settings: enabled={}, max_depth={}, max_age_ms={}",
            config.cache.enabled, config.cache.max_depth, config.cache.max_age_ms
        );

        if let Some(list) = props.get(PROP_STATIC_CREDENTIALS) {
            config.static_credentials = Some(list.clone());
        }

        Ok(config)
    }

    /// True when the static credential list replaces the directory
    pub fn uses_static_credentials(&self) -> bool {
        self.static_credentials
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.uses_static_credentials() {
            self.ldap.validate()?;
        }
        self.cache.validate()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Directory server configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// LDAP server URL (ldap:// or ldaps://)
    #[serde(default = "default_ldap_url")]
    pub server_url: String,

    /// Use STARTTLS for connection upgrade
    #[serde(default)]
    pub start_tls: bool,

    /// Service account DN used for searches
    #[serde(default)]
    pub bind_dn: String,

    /// Service account password
    #[serde(default)]
    pub bind_password: String,

    /// Search root for user lookups; empty searches the whole tree
    #[serde(default)]
    pub user_base_dn: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub attributes: DirectoryAttributes,
}

fn default_ldap_url() -> String {
    "ldap://localhost:389".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            server_url: default_ldap_url(),
            start_tls: false,
            bind_dn: String::new(),
            bind_password: String::new(),
            user_base_dn: String::new(),
            timeout_seconds: default_timeout(),
            attributes: DirectoryAttributes::default(),
        }
    }
}

impl fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConfig")
            .field("server_url", &self.server_url)
            .field("start_tls", &self.start_tls)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"<redacted>")
            .field("user_base_dn", &self.user_base_dn)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl LdapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::Invalid("Server URL is required".into()));
        }

        let url = url::Url::parse(&self.server_url)
            .map_err(|e| ConfigError::Invalid(format!("Invalid server URL: {}", e)))?;
        if url.scheme() != "ldap" && url.scheme() != "ldaps" {
            return Err(ConfigError::Invalid(
                "Server URL must start with ldap:// or ldaps://".into(),
            ));
        }

        if self.bind_dn.trim().is_empty() {
            return Err(ConfigError::Invalid("Bind DN is required".into()));
        }

        if self.attributes.account_name.trim().is_empty() {
            return Err(ConfigError::Invalid("Account name attribute is required".into()));
        }

        Ok(())
    }
}

/// Directory attribute names.
///
/// Fixed once the directory client is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DirectoryAttributes {
    #[serde(default = "default_account_name_attr")]
    pub account_name: String,

    #[serde(default = "default_common_name_attr")]
    pub common_name: String,

    #[serde(default = "default_email_attr")]
    pub email: String,

    #[serde(default = "default_ou_attr")]
    pub organizational_unit: String,

    #[serde(default = "default_dc_attr")]
    pub domain_component: String,

    #[serde(default = "default_member_of_attr")]
    pub member_of: String,

    #[serde(default = "default_member_attr")]
    pub member: String,
}

fn default_account_name_attr() -> String {
    "sAMAccountName".to_string()
}

fn default_common_name_attr() -> String {
    "cn".to_string()
}

fn default_email_attr() -> String {
    "mail".to_string()
}

fn default_ou_attr() -> String {
    "ou".to_string()
}

fn default_dc_attr() -> String {
    "dc".to_string()
}

fn default_member_of_attr() -> String {
    "memberOf".to_string()
}

fn default_member_attr() -> String {
    "member".to_string()
}

impl Default for DirectoryAttributes {
    fn default() -> Self {
        Self {
            account_name: default_account_name_attr(),
            common_name: default_common_name_attr(),
            email: default_email_attr(),
            organizational_unit: default_ou_attr(),
            domain_component: default_dc_attr(),
            member_of: default_member_of_attr(),
            member: default_member_attr(),
        }
    }
}

impl DirectoryAttributes {
    /// OpenLDAP style mappings (`uid` login attribute)
    pub fn openldap() -> Self {
        Self {
            account_name: "uid".to_string(),
            ..Default::default()
        }
    }
}

/// Attempt cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
}

fn default_max_depth() -> usize {
    crate::DEFAULT_MAX_DEPTH
}

fn default_max_age_ms() -> u64 {
    crate::DEFAULT_MAX_AGE_MS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_depth: default_max_depth(),
            max_age_ms: default_max_age_ms(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "Cache max depth must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
