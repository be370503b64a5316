//! LDAP client implementation
//!
//! Holds one service-account connection used for searches. Password checks
//! bind as the located user on a separate short-lived connection so the
//! service binding is never replaced.

use super::dn::{DnCodec, EntryAttributes};
use super::types::{DirectoryGroup, DirectoryUser};
use async_trait::async_trait;
use bindguard_core::{DirectoryError, LdapConfig};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Something that can check a username and password
#[async_trait]
pub trait Directory: Send + Sync {
    /// `Ok(true)` when the password is correct, `Ok(false)` when it is not or
    /// the user does not exist. Transport problems are errors.
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, DirectoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryState {
    Unbound,
    Bound,
    /// The last operation failed at the transport level
    Error,
}

struct Connection {
    ldap: Option<Ldap>,
    state: DirectoryState,
}

pub struct LdapDirectory {
    config: LdapConfig,
    codec: DnCodec,
    connection: RwLock<Connection>,
}

impl LdapDirectory {
    pub fn new(config: LdapConfig) -> Self {
        let codec = DnCodec::new(config.attributes.clone());
        Self {
            config,
            codec,
            connection: RwLock::new(Connection {
                ldap: None,
                state: DirectoryState::Unbound,
            }),
        }
    }

    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    pub fn codec(&self) -> &DnCodec {
        &self.codec
    }

    pub fn state(&self) -> DirectoryState {
        self.connection.read().state
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    // A transport failure on the bound connection; the handle is unusable.
    fn mark_failed(&self) {
        let mut connection = self.connection.write();
        connection.state = DirectoryState::Error;
        connection.ldap = None;
    }

    /// Open a connection with the configured TLS settings
    async fn open(&self) -> Result<Ldap, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.timeout())
            .set_starttls(self.config.start_tls);

        debug!("Connecting to LDAP server: {}", self.config.server_url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.config.server_url)
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;

        ldap3::drive!(conn);
        Ok(ldap)
    }

    /// Bind the search connection as `bind_dn`.
    ///
    /// Any failure leaves the client unbound, with a previous binding closed.
    pub async fn connect(&self, bind_dn: &str, bind_password: &str) -> Result<(), DirectoryError> {
        let mut ldap = match self.open().await {
            Ok(ldap) => ldap,
            Err(e) => {
                self.close().await;
                return Err(e);
            }
        };

        let result = match ldap
            .with_timeout(self.timeout())
            .simple_bind(bind_dn, bind_password)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.close().await;
                return Err(DirectoryError::Connection(format!("Bind failed: {}", e)));
            }
        };

        if result.rc != 0 {
            let _ = ldap.unbind().await;
            self.close().await;
            return Err(DirectoryError::Bind {
                rc: result.rc,
                message: result.text,
            });
        }

        let previous = {
            let mut connection = self.connection.write();
            connection.state = DirectoryState::Bound;
            connection.ldap.replace(ldap)
        };
        if let Some(mut previous) = previous {
            let _ = previous.unbind().await;
        }

        info!("Bound to LDAP server {} as {}", self.config.server_url, bind_dn);
        Ok(())
    }

    /// Bind with the configured service account
    pub async fn connect_service_account(&self) -> Result<(), DirectoryError> {
        self.connect(&self.config.bind_dn, &self.config.bind_password)
            .await
    }

    /// Unbind and drop the search connection
    pub async fn close(&self) {
        let ldap = {
            let mut connection = self.connection.write();
            connection.state = DirectoryState::Unbound;
            connection.ldap.take()
        };
        if let Some(mut ldap) = ldap {
            let _ = ldap.unbind().await;
        }
    }

    // Reconnects with the service account when the previous binding was lost.
    async fn search_handle(&self) -> Result<Ldap, DirectoryError> {
        let existing = self.connection.read().ldap.clone();
        if let Some(ldap) = existing {
            return Ok(ldap);
        }
        if self.config.bind_dn.is_empty() {
            return Err(DirectoryError::NotConnected);
        }

        self.connect_service_account().await?;
        let reconnected = self.connection.read().ldap.clone();
        reconnected.ok_or(DirectoryError::NotConnected)
    }

    /// Search for entries where `attribute` equals `value`, returning the
    /// first one. Which entry comes first is up to the server.
    async fn search_first(
        &self,
        attribute: &str,
        value: &str,
        attrs: Vec<&str>,
    ) -> Result<Option<SearchEntry>, DirectoryError> {
        let mut ldap = self.search_handle().await?;
        let filter = format!("({}={})", attribute, ldap3::ldap_escape(value));

        debug!("Searching {} with filter: {}", self.config.user_base_dn, filter);

        let result = match ldap
            .with_timeout(self.timeout())
            .search(&self.config.user_base_dn, Scope::Subtree, &filter, attrs)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.mark_failed();
                return Err(DirectoryError::Search(e.to_string()));
            }
        };

        let (entries, _res) = result
            .success()
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        if entries.len() > 1 {
            warn!(
                "{} entries matched {}, using the first",
                entries.len(),
                filter
            );
        }

        Ok(entries.into_iter().next().map(SearchEntry::construct))
    }

    /// Locate a user by attribute value
    pub async fn find_user(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        let names = self.codec.attributes();
        let attrs = vec![
            names.account_name.as_str(),
            names.common_name.as_str(),
            names.email.as_str(),
            names.member_of.as_str(),
        ];

        let entry = self.search_first(attribute, value, attrs).await?;
        Ok(entry.map(|entry| self.user_from(&entry.dn, &entry.attrs)))
    }

    /// Locate a group by attribute value, including its members
    pub async fn find_group(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Option<DirectoryGroup>, DirectoryError> {
        let names = self.codec.attributes();
        let attrs = vec![names.common_name.as_str(), names.member.as_str()];

        let entry = self.search_first(attribute, value, attrs).await?;
        Ok(entry.map(|entry| self.codec.group_from_entry(&entry.dn, &entry.attrs)))
    }

    fn user_from(&self, dn: &str, attrs: &EntryAttributes) -> DirectoryUser {
        self.codec.user_from_entry(dn, attrs)
    }

    fn bind_dn_for(&self, user: &DirectoryUser) -> String {
        match user.entry_dn.as_deref() {
            Some(dn) if !dn.trim().is_empty() => dn.to_string(),
            _ => self.codec.authentication_dn(user),
        }
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, DirectoryError> {
        // An empty password would be an unauthenticated bind, which most
        // servers accept.
        if password.trim().is_empty() {
            debug!("Rejecting blank password for {}", username);
            return Ok(false);
        }

        let account_attribute = self.codec.attributes().account_name.clone();
        let user = match self.find_user(&account_attribute, username).await? {
            Some(user) => user,
            None => {
                warn!("Failed to locate directory user: {}", username);
                return Ok(false);
            }
        };

        let user_dn = self.bind_dn_for(&user);
        debug!("Verifying password for {} as {}", username, user_dn);

        let mut ldap = self.open().await?;
        let result = ldap
            .with_timeout(self.timeout())
            .simple_bind(&user_dn, password)
            .await
            .map_err(|e| {
                error!("User bind failed for {}: {}", user_dn, e);
                DirectoryError::Connection(format!("User bind failed: {}", e))
            })?;
        let _ = ldap.unbind().await;

        if result.rc != 0 {
            debug!(
                "Failed to authenticate {} (code {}: {})",
                user_dn, result.rc, result.text
            );
            return Ok(false);
        }

        Ok(true)
    }
}
