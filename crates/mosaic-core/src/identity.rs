//! Principals.
//!
//! A [`Principal`] is the authenticated party a request is processed for.
//! Anonymous requests carry no principal at all (`Option<&Principal>` is
//! `None`), so there is no anonymous variant here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An authenticated user together with its group memberships.
///
/// # Example
///
/// ```rust
/// use mosaic_core::Principal;
///
/// let principal = Principal::new("alice")
///     .with_domain("example.org")
///     .with_group("editors");
///
/// assert_eq!(principal.qualified_name(), "alice@example.org");
/// assert!(principal.is_member_of("editors"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    name: String,
    domain: Option<String>,
    groups: BTreeSet<String>,
}

impl Principal {
    /// Creates a principal without a domain and without groups.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: None,
            groups: BTreeSet::new(),
        }
    }

    /// Sets the principal's domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Adds a group membership.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Returns the unqualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the domain, if any.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Returns `name@domain`, or just the name when no domain is set.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}@{domain}", self.name),
            None => self.name.clone(),
        }
    }

    /// Returns the groups this principal belongs to.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    /// Returns `true` if the principal is a member of `group`.
    #[must_use]
    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// Returns `true` if `name` refers to this principal, either by its plain
    /// or its qualified name.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.qualified_name() == name
    }

    /// Returns a string identifier suitable for logging.
    #[must_use]
    pub fn log_id(&self) -> String {
        format!("principal:{}", self.qualified_name())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Opaque security token passed to the repository.
///
/// The resolver retrieves the addressed resource with a trusted,
/// broad-read token; request handlers use the principal's own token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Creates a token from its string value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_without_domain() {
        let principal = Principal::new("bob");
        assert_eq!(principal.qualified_name(), "bob");
        assert_eq!(principal.log_id(), "principal:bob");
    }

    #[test]
    fn test_is_named_matches_both_forms() {
        let principal = Principal::new("alice").with_domain("uio.no");
        assert!(principal.is_named("alice"));
        assert!(principal.is_named("alice@uio.no"));
        assert!(!principal.is_named("alice@example.org"));
    }

    #[test]
    fn test_groups() {
        let principal = Principal::new("alice")
            .with_group("editors")
            .with_group("admins");
        let groups: Vec<_> = principal.groups().collect();
        assert_eq!(groups, vec!["admins", "editors"]);
        assert!(!principal.is_member_of("readers"));
    }

    #[test]
    fn test_token_roundtrip_value() {
        let token = Token::new("trusted");
        assert_eq!(token.as_str(), "trusted");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"trusted\"");
    }
}
