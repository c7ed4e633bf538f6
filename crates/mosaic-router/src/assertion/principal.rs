//! Principal and group membership assertion.

use super::{Assertion, Capability};
use crate::request::MatchContext;
use crate::url::Url;
use mosaic_core::{MosaicError, MosaicResult, Principal, Resource};
use std::any::Any;

/// Matches requests made by one of a set of principals or group members.
///
/// With no principals and no groups configured, any authenticated principal
/// matches. An anonymous request does not match, or fails with
/// `AuthenticationRequired` when `require_authentication` is set.
#[derive(Debug, Clone, Default)]
pub struct PrincipalAssertion {
    principals: Vec<String>,
    groups: Vec<String>,
    require_authentication: bool,
}

impl PrincipalAssertion {
    /// Creates an assertion matching any authenticated principal.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Adds a principal name (plain or `name@domain`).
    #[must_use]
    pub fn with_principal(mut self, name: impl Into<String>) -> Self {
        self.principals.push(name.into());
        self
    }

    /// Adds a group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Fails matching with `AuthenticationRequired` for anonymous requests.
    #[must_use]
    pub const fn require_authentication(mut self, require: bool) -> Self {
        self.require_authentication = require;
        self
    }

    fn accepts(&self, principal: &Principal) -> bool {
        if self.principals.is_empty() && self.groups.is_empty() {
            return true;
        }
        self.principals.iter().any(|name| principal.is_named(name))
            || self.groups.iter().any(|group| principal.is_member_of(group))
    }
}

impl Assertion for PrincipalAssertion {
    fn kind(&self) -> &'static str {
        "principal"
    }

    fn capability(&self) -> Capability {
        Capability::ResourcePredicate
    }

    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        match ctx.principal {
            Some(principal) => Ok(self.accepts(principal)),
            None if self.require_authentication => Err(MosaicError::authentication_required(
                format!("'{}' requires an authenticated principal", ctx.uri),
            )),
            None => Ok(false),
        }
    }

    fn process_url_for(
        &self,
        _url: &mut Url,
        _resource: &Resource,
        principal: Option<&Principal>,
        match_required: bool,
    ) -> bool {
        match principal {
            Some(principal) => !match_required || self.accepts(principal),
            None => !match_required,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
