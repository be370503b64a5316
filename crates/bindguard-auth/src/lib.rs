//! Authentication for Bindguard

pub mod attempt;
pub mod audit;
pub mod cache;
pub mod clock;
pub mod coordinator;
pub mod credential;
pub mod history;
pub mod ldap;
pub mod static_auth;

pub use attempt::{AuthStatus, AuthenticationAttempt};
pub use audit::{log_attempt, ATTEMPT_LOG_TARGET};
pub use cache::AuthenticationCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{Authenticator, AuthenticationCoordinator, CoordinatorContext};
pub use credential::Credential;
pub use history::AttemptHistory;
pub use ldap::{
    Directory, DirectoryGroup, DirectoryState, DirectoryUser, DistinguishedName, DnCodec,
    LdapDirectory,
};
pub use static_auth::StaticAuthenticator;

use bindguard_core::{AuthConfig, Result};
use std::sync::Arc;
use tracing::{error, info};

/// Build the authenticator selected by `config`.
///
/// A static credential list takes precedence over the directory. The
/// directory's service account is bound here; if that fails the error is
/// logged and requests report ERROR until a later reconnect succeeds.
pub async fn build_authenticator(config: &AuthConfig) -> Result<Arc<dyn Authenticator>> {
    config.validate()?;

    if let Some(list) = config
        .static_credentials
        .as_deref()
        .filter(|_| config.uses_static_credentials())
    {
        info!("Using static credential authentication");
        return Ok(Arc::new(StaticAuthenticator::from_list(list)?));
    }

    let directory = Arc::new(LdapDirectory::new(config.ldap.clone()));
    if let Err(e) = directory.connect_service_account().await {
        error!(
            "Unable to bind to LDAP server {}: {}",
            config.ldap.server_url, e
        );
    }

    let context = CoordinatorContext::new(directory, &config.cache)?;
    info!(
        "Using LDAP authentication against {} (cache {})",
        config.ldap.server_url,
        if config.cache.enabled { "enabled" } else { "disabled" }
    );
    Ok(Arc::new(AuthenticationCoordinator::new(Arc::new(context))))
}
