//! Assertions: the guards attached to services.
//!
//! An assertion works in two directions. While matching it is a pure test
//! over the request, the resolved resource and the principal. While
//! constructing a URL it contributes to the URL under construction and
//! reports whether the service may link to the given resource.
//!
//! Assertions are built once at startup and shared by every request, so
//! implementations hold configuration only.
//!
//! # Variants
//!
//! | Assertion | Capability | Matches on |
//! |---|---|---|
//! | [`AlwaysAssertion`] | request predicate | everything |
//! | [`UriExactAssertion`] | URL writer | resource path equality |
//! | [`UriPrefixAssertion`] | resource predicate | resource path prefix |
//! | [`UriRegexAssertion`] | resource predicate | resource path pattern |
//! | [`MethodAssertion`] | request predicate | HTTP method set |
//! | [`ProtocolAssertion`] | URL writer | request protocol |
//! | [`HostNameAssertion`] | URL writer | request host set |
//! | [`ResourceTypeAssertion`] | resource predicate | resource type (exact or subtype) |
//! | [`PropertyAssertion`] | resource predicate | property existence or value |
//! | [`PrincipalAssertion`] | resource predicate | principal name or group |
//! | [`InvertAssertion`] | inner's capability | logical NOT of a predicate |

mod host;
mod invert;
mod method;
mod principal;
mod property;
mod protocol;
mod resource_type;
mod uri;

pub use host::{HostNameAssertion, ANY_HOST};
pub use invert::InvertAssertion;
pub use method::MethodAssertion;
pub use principal::PrincipalAssertion;
pub use property::PropertyAssertion;
pub use protocol::ProtocolAssertion;
pub use resource_type::ResourceTypeAssertion;
pub use uri::{UriExactAssertion, UriPrefixAssertion, UriRegexAssertion};

use crate::request::MatchContext;
use crate::url::Url;
use mosaic_core::{MosaicResult, Principal, Resource};
use std::any::Any;
use std::fmt;

/// What an assertion does during URL construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Writes part of the URL (path, protocol, host). Cannot be inverted.
    UrlWriter,
    /// Tests only request properties that do not exist during construction.
    /// Construction always proceeds.
    RequestPredicate,
    /// Tests the resource or principal, which are known during
    /// construction. Construction fails when the test is required and fails.
    ResourcePredicate,
}

/// A guard evaluated while matching requests and while constructing URLs.
pub trait Assertion: Send + Sync + fmt::Debug + Any {
    /// Short name used in logs and configuration (`uri_prefix`, ...).
    fn kind(&self) -> &'static str;

    /// Returns the construction-mode capability.
    fn capability(&self) -> Capability;

    /// Tests the assertion against a request.
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::AuthenticationRequired`](mosaic_core::MosaicError::AuthenticationRequired)
    /// when a principal is required but absent. Resolution propagates this
    /// instead of treating it as a non-match.
    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool>;

    /// Best-effort contribution to a URL built without a resource.
    fn process_url(&self, _url: &mut Url) {}

    /// Contributes to a URL built for `resource` on behalf of `principal`.
    ///
    /// With `match_required`, returns `false` if the assertion's predicate
    /// does not hold for the resource and principal. The URL must not be
    /// used after a `false` return.
    fn process_url_for(
        &self,
        url: &mut Url,
        _resource: &Resource,
        _principal: Option<&Principal>,
        _match_required: bool,
    ) -> bool {
        self.process_url(url);
        true
    }

    /// Returns `true` when no request could satisfy both `self` and `other`.
    fn conflicts(&self, _other: &dyn Assertion) -> bool {
        false
    }

    /// Returns `self` as [`Any`] for downcasting in [`Assertion::conflicts`].
    fn as_any(&self) -> &dyn Any;
}

/// Returns `true` if either assertion declares a conflict with the other.
#[must_use]
pub fn conflicting(a: &dyn Assertion, b: &dyn Assertion) -> bool {
    a.conflicts(b) || b.conflicts(a)
}

/// Assertion that matches every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAssertion;

impl Assertion for AlwaysAssertion {
    fn kind(&self) -> &'static str {
        "always"
    }

    fn capability(&self) -> Capability {
        Capability::RequestPredicate
    }

    fn matches(&self, _ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use mosaic_core::fixtures;

    #[test]
    fn test_always_matches() {
        let request = get("http://h/x");
        let uri = path("/x");
        let ctx = MatchContext::new(&request, &uri);
        assert!(AlwaysAssertion.matches(&ctx).unwrap());
        assert_eq!(AlwaysAssertion.capability(), Capability::RequestPredicate);
    }

    #[test]
    fn test_always_never_blocks_construction() {
        let mut url = seed("/x");
        let resource = fixtures::article("/x");
        assert!(AlwaysAssertion.process_url_for(&mut url, &resource, None, true));
        assert_eq!(url.path().as_str(), "/x");
    }

    #[test]
    fn test_conflicting_is_symmetric() {
        let a = UriPrefixAssertion::new(path("/a"));
        let b = UriExactAssertion::new(path("/b/c"));
        assert!(conflicting(&a, &b));
        assert!(conflicting(&b, &a));
        assert!(!conflicting(&a, &AlwaysAssertion));
    }
}
