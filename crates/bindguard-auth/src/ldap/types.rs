//! Directory entry model
//!
//! Users and groups share the [`DistinguishedName`] components. Nested
//! references (a user's groups, a group's members) are leaf entries built
//! from DN strings and never point back at their owner.

use super::dn::DnCodec;
use bindguard_core::DirectoryError;
use std::fmt;
use std::str::FromStr;

/// Common name, organizational units and domain components of an entry
#[derive(Debug, Clone, Default)]
pub struct DistinguishedName {
    pub common_name: Option<String>,
    pub organizational_units: Vec<String>,
    pub domain_components: Vec<String>,
}

impl DistinguishedName {
    pub fn has_common_name(&self) -> bool {
        self.common_name
            .as_deref()
            .is_some_and(|cn| !cn.trim().is_empty())
    }

    pub fn add_organizational_unit(&mut self, ou: impl Into<String>) {
        self.organizational_units.push(ou.into());
    }

    pub fn add_domain_component(&mut self, dc: impl Into<String>) {
        self.domain_components.push(dc.into());
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryUser {
    pub name: DistinguishedName,
    pub account_name: Option<String>,
    pub email: Option<String>,
    pub groups: Vec<DirectoryGroup>,
    /// Entry DN exactly as returned by a directory search
    pub entry_dn: Option<String>,
}

impl DirectoryUser {
    pub fn has_account_name(&self) -> bool {
        self.account_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }

    /// Add a group unless an equal one is already present
    pub fn add_group(&mut self, group: DirectoryGroup) {
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
    }

    pub fn is_member_of(&self, group: &DirectoryGroup) -> bool {
        self.groups.contains(group)
    }

    /// Bindable DN rebuilt from the components, using the default
    /// attribute names
    pub fn authentication_dn(&self) -> String {
        DnCodec::default().authentication_dn(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryGroup {
    pub name: DistinguishedName,
    pub members: Vec<DirectoryUser>,
}

impl DirectoryGroup {
    /// Add a member unless an equal one is already present
    pub fn add_member(&mut self, user: DirectoryUser) {
        if !self.members.contains(&user) {
            self.members.push(user);
        }
    }

    pub fn has_member(&self, user: &DirectoryUser) -> bool {
        self.members.contains(user)
    }
}

// Entries are equal when their formatted forms match ignoring case.
fn same_entry(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        same_entry(&self.to_string(), &other.to_string())
    }
}

impl Eq for DistinguishedName {}

impl PartialEq for DirectoryUser {
    fn eq(&self, other: &Self) -> bool {
        same_entry(&self.to_string(), &other.to_string())
    }
}

impl Eq for DirectoryUser {}

impl PartialEq for DirectoryGroup {
    fn eq(&self, other: &Self) -> bool {
        same_entry(&self.to_string(), &other.to_string())
    }
}

impl Eq for DirectoryGroup {}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DnCodec::default().format_dn(self))
    }
}

impl fmt::Display for DirectoryUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DnCodec::default().format_user(self))
    }
}

impl fmt::Display for DirectoryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DnCodec::default().format_group(self))
    }
}

impl FromStr for DistinguishedName {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DnCodec::default().parse_dn(s)
    }
}

impl FromStr for DirectoryUser {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DnCodec::default().parse_user(s)
    }
}

impl FromStr for DirectoryGroup {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DnCodec::default().parse_group(s)
    }
}
