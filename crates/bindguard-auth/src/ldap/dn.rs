//! Distinguished name formatting and parsing
//!
//! Formatted DNs list the account name (users only), the common name, every
//! organizational unit and every domain component, joined with `,`. Commas
//! and backslashes inside values are escaped with a backslash, so parsing a
//! formatted DN gives back the same components.

use super::types::{DirectoryGroup, DirectoryUser, DistinguishedName};
use bindguard_core::{DirectoryAttributes, DirectoryError};
use std::collections::HashMap;

/// Attribute values keyed by attribute name, as returned by a search
pub type EntryAttributes = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Default)]
pub struct DnCodec {
    attributes: DirectoryAttributes,
}

impl DnCodec {
    pub fn new(attributes: DirectoryAttributes) -> Self {
        Self { attributes }
    }

    pub fn attributes(&self) -> &DirectoryAttributes {
        &self.attributes
    }

    pub fn format_dn(&self, dn: &DistinguishedName) -> String {
        let mut parts = Vec::new();
        self.push_components(&mut parts, dn);
        parts.join(",")
    }

    pub fn format_user(&self, user: &DirectoryUser) -> String {
        let mut parts = Vec::new();
        if let Some(account) = user.account_name.as_deref().filter(|a| !a.is_empty()) {
            parts.push(component(&self.attributes.account_name, account));
        }
        self.push_components(&mut parts, &user.name);
        parts.join(",")
    }

    pub fn format_group(&self, group: &DirectoryGroup) -> String {
        self.format_dn(&group.name)
    }

    fn push_components(&self, parts: &mut Vec<String>, dn: &DistinguishedName) {
        if let Some(cn) = dn.common_name.as_deref().filter(|cn| !cn.is_empty()) {
            parts.push(component(&self.attributes.common_name, cn));
        }
        for ou in &dn.organizational_units {
            parts.push(component(&self.attributes.organizational_unit, ou));
        }
        for dc in &dn.domain_components {
            parts.push(component(&self.attributes.domain_component, dc));
        }
    }

    /// DN used to bind as `user`: the common name when present, otherwise
    /// the account name, followed by the OUs and DCs.
    pub fn authentication_dn(&self, user: &DirectoryUser) -> String {
        let mut parts = Vec::new();
        if user.name.has_common_name() {
            if let Some(cn) = user.name.common_name.as_deref() {
                parts.push(component(&self.attributes.common_name, cn));
            }
        } else if let Some(account) = user.account_name.as_deref().filter(|a| !a.is_empty()) {
            parts.push(component(&self.attributes.account_name, account));
        }
        for ou in &user.name.organizational_units {
            parts.push(component(&self.attributes.organizational_unit, ou));
        }
        for dc in &user.name.domain_components {
            parts.push(component(&self.attributes.domain_component, dc));
        }
        parts.join(",")
    }

    pub fn parse_dn(&self, input: &str) -> Result<DistinguishedName, DirectoryError> {
        let mut dn = DistinguishedName::default();
        for (name, value) in fields(input)? {
            self.apply_component(&mut dn, name, value);
        }
        Ok(dn)
    }

    pub fn parse_user(&self, input: &str) -> Result<DirectoryUser, DirectoryError> {
        let mut user = DirectoryUser::default();
        for (name, value) in fields(input)? {
            if name.eq_ignore_ascii_case(&self.attributes.account_name) {
                user.account_name = Some(value);
            } else if name.eq_ignore_ascii_case(&self.attributes.email) {
                user.email = Some(value);
            } else {
                self.apply_component(&mut user.name, name, value);
            }
        }
        Ok(user)
    }

    pub fn parse_group(&self, input: &str) -> Result<DirectoryGroup, DirectoryError> {
        Ok(DirectoryGroup {
            name: self.parse_dn(input)?,
            members: Vec::new(),
        })
    }

    // Unknown attribute names are ignored.
    fn apply_component(&self, dn: &mut DistinguishedName, name: &str, value: String) {
        if name.eq_ignore_ascii_case(&self.attributes.common_name) {
            dn.common_name = Some(value);
        } else if name.eq_ignore_ascii_case(&self.attributes.organizational_unit) {
            dn.add_organizational_unit(value);
        } else if name.eq_ignore_ascii_case(&self.attributes.domain_component) {
            dn.add_domain_component(value);
        }
    }

    /// Build a user from a search result entry.
    ///
    /// Components come from the entry DN, then the account name, common name
    /// and email attributes override them. Every `memberOf` value becomes a
    /// group.
    pub fn user_from_entry(&self, entry_dn: &str, attrs: &EntryAttributes) -> DirectoryUser {
        let mut user = if entry_dn.trim().is_empty() {
            DirectoryUser::default()
        } else {
            self.parse_user(entry_dn).unwrap_or_default()
        };
        user.entry_dn = Some(entry_dn.to_string()).filter(|dn| !dn.is_empty());

        if let Some(account) = first_value(attrs, &self.attributes.account_name) {
            user.account_name = Some(account.to_string());
        }
        if let Some(cn) = first_value(attrs, &self.attributes.common_name) {
            user.name.common_name = Some(cn.to_string());
        }
        if let Some(email) = first_value(attrs, &self.attributes.email) {
            user.email = Some(email.to_string());
        }

        for group_dn in all_values(attrs, &self.attributes.member_of) {
            if let Ok(group) = self.parse_group(group_dn) {
                user.add_group(group);
            }
        }
        user
    }

    /// Build a group from a search result entry.
    ///
    /// Members are read from the member attribute and its ranged variants
    /// such as `member;range=0-1499`.
    pub fn group_from_entry(&self, entry_dn: &str, attrs: &EntryAttributes) -> DirectoryGroup {
        let mut group = self.parse_group(entry_dn).unwrap_or_default();

        if let Some(cn) = first_value(attrs, &self.attributes.common_name) {
            group.name.common_name = Some(cn.to_string());
        }

        let member = self.attributes.member.to_lowercase();
        let ranged = format!("{};", member);
        let mut member_attrs: Vec<_> = attrs
            .iter()
            .filter(|(name, _)| {
                let name = name.to_lowercase();
                name == member || name.starts_with(&ranged)
            })
            .collect();
        member_attrs.sort_by(|a, b| a.0.cmp(b.0));

        for (_, values) in member_attrs {
            for member_dn in values {
                if let Ok(user) = self.parse_user(member_dn) {
                    group.add_member(user);
                }
            }
        }
        group
    }
}

fn component(name: &str, value: &str) -> String {
    format!("{}={}", name, escape_value(value))
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\\' || ch == ',' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn unescape_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => unescaped.push(next),
                None => unescaped.push(ch),
            }
        } else {
            unescaped.push(ch);
        }
    }
    unescaped
}

/// Split on commas that are not escaped
fn tokenize(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (idx, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            ',' => {
                tokens.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    tokens.push(&input[start..]);
    tokens
}

/// `(name, value)` pairs of a DN string. Tokens without `=` are skipped.
fn fields(input: &str) -> Result<Vec<(&str, String)>, DirectoryError> {
    if input.is_empty() {
        return Err(DirectoryError::InvalidDn("DN must not be empty".into()));
    }

    Ok(tokenize(input)
        .into_iter()
        .filter_map(|token| {
            let (name, value) = token.split_once('=')?;
            Some((name.trim(), unescape_value(value)))
        })
        .collect())
}

fn all_values<'a>(attrs: &'a EntryAttributes, name: &'a str) -> impl Iterator<Item = &'a str> {
    attrs
        .iter()
        .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
        .flat_map(|(_, values)| values.iter().map(String::as_str))
}

fn first_value<'a>(attrs: &'a EntryAttributes, name: &'a str) -> Option<&'a str> {
    all_values(attrs, name).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EINSTEIN: &str = "cn=Albert Einstein,ou=User Accounts,dc=sas,dc=com";

    fn attrs(pairs: &[(&str, &[&str])]) -> EntryAttributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_parse_einstein() {
        let codec = DnCodec::default();
        let dn = codec.parse_dn(EINSTEIN).unwrap();

        assert_eq!(dn.common_name.as_deref(), Some("Albert Einstein"));
        assert_eq!(dn.organizational_units, vec!["User Accounts"]);
        assert_eq!(dn.domain_components, vec!["sas", "com"]);
        assert_eq!(codec.format_dn(&dn), EINSTEIN);
    }

    #[test]
    fn test_user_round_trip_with_account_name() {
        let codec = DnCodec::default();
        let mut user = codec.parse_user(EINSTEIN).unwrap();
        user.account_name = Some("aeinstein".into());

        let formatted = codec.format_user(&user);
        assert_eq!(
            formatted,
            "sAMAccountName=aeinstein,cn=Albert Einstein,ou=User Accounts,dc=sas,dc=com"
        );

        let parsed = codec.parse_user(&formatted).unwrap();
        assert_eq!(parsed.account_name.as_deref(), Some("aeinstein"));
        assert_eq!(parsed.name.common_name.as_deref(), Some("Albert Einstein"));
        assert_eq!(parsed.name.organizational_units, vec!["User Accounts"]);
        assert_eq!(parsed.name.domain_components, vec!["sas", "com"]);
    }

    #[test]
    fn test_names_match_case_insensitively() {
        let codec = DnCodec::default();
        let user = codec
            .parse_user("SAMACCOUNTNAME=bob, CN=Bob,OU=Staff,DC=example,Mail=bob@example.com")
            .unwrap();

        assert_eq!(user.account_name.as_deref(), Some("bob"));
        assert_eq!(user.name.common_name.as_deref(), Some("Bob"));
        assert_eq!(user.name.organizational_units, vec!["Staff"]);
        assert_eq!(user.name.domain_components, vec!["example"]);
        assert_eq!(user.email.as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn test_escaped_commas() {
        let codec = DnCodec::default();
        let dn = codec
            .parse_dn(r"cn=Smith\, John,ou=Sales\\East,dc=example")
            .unwrap();

        assert_eq!(dn.common_name.as_deref(), Some("Smith, John"));
        assert_eq!(dn.organizational_units, vec![r"Sales\East"]);
        assert_eq!(
            codec.format_dn(&dn),
            r"cn=Smith\, John,ou=Sales\\East,dc=example"
        );
        assert_eq!(codec.parse_dn(&codec.format_dn(&dn)).unwrap(), dn);
    }

    #[test]
    fn test_unknown_and_malformed_tokens_are_ignored() {
        let codec = DnCodec::default();
        let dn = codec
            .parse_dn("uid=x,cn=Ops,garbage,o=Example,dc=com")
            .unwrap();

        assert_eq!(dn.common_name.as_deref(), Some("Ops"));
        assert!(dn.organizational_units.is_empty());
        assert_eq!(dn.domain_components, vec!["com"]);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let codec = DnCodec::default();
        assert!(matches!(
            codec.parse_dn(""),
            Err(DirectoryError::InvalidDn(_))
        ));
    }

    #[test]
    fn test_authentication_dn() {
        let codec = DnCodec::default();

        let with_cn = codec
            .parse_user("sAMAccountName=aeinstein,cn=Albert Einstein,ou=Staff,dc=sas,dc=com")
            .unwrap();
        assert_eq!(
            codec.authentication_dn(&with_cn),
            "cn=Albert Einstein,ou=Staff,dc=sas,dc=com"
        );

        let without_cn = codec
            .parse_user("sAMAccountName=aeinstein,ou=Staff,dc=sas,dc=com")
            .unwrap();
        assert_eq!(
            codec.authentication_dn(&without_cn),
            "sAMAccountName=aeinstein,ou=Staff,dc=sas,dc=com"
        );
    }

    #[test]
    fn test_configured_attribute_names() {
        let codec = DnCodec::new(DirectoryAttributes::openldap());
        let user = codec.parse_user("uid=einstein,dc=example,dc=com").unwrap();

        assert_eq!(user.account_name.as_deref(), Some("einstein"));
        assert_eq!(codec.format_user(&user), "uid=einstein,dc=example,dc=com");
    }

    #[test]
    fn test_user_from_entry() {
        let codec = DnCodec::default();
        let entry = attrs(&[
            ("sAMAccountName", &["aeinstein"]),
            ("mail", &["einstein@sas.com"]),
            (
                "memberOf",
                &[
                    "cn=Physicists,ou=Groups,dc=sas,dc=com",
                    "CN=physicists,OU=groups,DC=sas,DC=com",
                    "cn=Staff,ou=Groups,dc=sas,dc=com",
                ],
            ),
        ]);

        let user = codec.user_from_entry(EINSTEIN, &entry);
        assert_eq!(user.entry_dn.as_deref(), Some(EINSTEIN));
        assert_eq!(user.account_name.as_deref(), Some("aeinstein"));
        assert_eq!(user.email.as_deref(), Some("einstein@sas.com"));
        assert_eq!(user.name.common_name.as_deref(), Some("Albert Einstein"));
        assert_eq!(user.groups.len(), 2);
        assert_eq!(user.groups[0].name.common_name.as_deref(), Some("Physicists"));
    }

    #[test]
    fn test_group_from_entry_reads_ranged_members() {
        let codec = DnCodec::default();
        let entry = attrs(&[
            ("cn", &["Physicists"]),
            ("member", &["cn=Albert Einstein,dc=sas,dc=com"]),
            (
                "member;range=0-1499",
                &["cn=Niels Bohr,dc=sas,dc=com", "cn=albert einstein,dc=sas,dc=com"],
            ),
            ("memberOf", &["cn=Not A Member,dc=sas,dc=com"]),
        ]);

        let group = codec.group_from_entry("cn=Physicists,ou=Groups,dc=sas,dc=com", &entry);
        assert_eq!(group.name.organizational_units, vec!["Groups"]);
        assert_eq!(group.members.len(), 2);
        assert!(group.has_member(&codec.parse_user("cn=Niels Bohr,dc=sas,dc=com").unwrap()));
    }
}
