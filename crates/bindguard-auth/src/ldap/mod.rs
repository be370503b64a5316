//! LDAP / Active Directory support
//!
//! - Distinguished name model and codec
//! - Directory client that verifies a password by binding as the user
//! - TLS/STARTTLS through the connection settings

mod client;
mod dn;
mod types;

pub use client::{Directory, DirectoryState, LdapDirectory};
pub use dn::{DnCodec, EntryAttributes};
pub use types::*;
