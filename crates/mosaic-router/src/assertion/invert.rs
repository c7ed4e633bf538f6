//! Logical negation of a predicate assertion.

use super::{Assertion, Capability};
use crate::request::MatchContext;
use crate::url::Url;
use mosaic_core::{MosaicError, MosaicResult, Principal, Resource};
use std::any::Any;
use std::sync::Arc;

/// Matches when the wrapped assertion does not.
///
/// Only predicates can be inverted. Negating an assertion that writes part
/// of the URL has no meaning during construction, so [`InvertAssertion::new`]
/// rejects [`Capability::UrlWriter`] assertions.
#[derive(Debug, Clone)]
pub struct InvertAssertion {
    inner: Arc<dyn Assertion>,
}

impl InvertAssertion {
    /// Wraps `inner`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `inner` writes to the URL.
    pub fn new(inner: Arc<dyn Assertion>) -> MosaicResult<Self> {
        if inner.capability() == Capability::UrlWriter {
            return Err(MosaicError::configuration(format!(
                "assertion '{}' writes to the URL and cannot be inverted",
                inner.kind()
            )));
        }
        Ok(Self { inner })
    }

    /// Returns the wrapped assertion.
    #[must_use]
    pub fn inner(&self) -> &Arc<dyn Assertion> {
        &self.inner
    }
}

impl Assertion for InvertAssertion {
    fn kind(&self) -> &'static str {
        "not"
    }

    fn capability(&self) -> Capability {
        self.inner.capability()
    }

    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        Ok(!self.inner.matches(ctx)?)
    }

    fn process_url_for(
        &self,
        url: &mut Url,
        resource: &Resource,
        principal: Option<&Principal>,
        match_required: bool,
    ) -> bool {
        if !match_required || self.inner.capability() == Capability::RequestPredicate {
            return true;
        }
        // the inner predicate must not leave traces in `url`
        let mut scratch = url.clone();
        !self
            .inner
            .process_url_for(&mut scratch, resource, principal, true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{MethodAssertion, UriExactAssertion, UriPrefixAssertion};
    use super::*;
    use http::Method;
    use mosaic_core::fixtures;

    #[test]
    fn test_negates_match() {
        let not_documents =
            InvertAssertion::new(Arc::new(UriPrefixAssertion::new(path("/documents")))).unwrap();
        let request = get("/");
        let docs = path("/documents/foo");
        let other = path("/other");
        assert!(!not_documents
            .matches(&MatchContext::new(&request, &docs))
            .unwrap());
        assert!(not_documents
            .matches(&MatchContext::new(&request, &other))
            .unwrap());
    }

    #[test]
    fn test_propagates_errors() {
        let inner = Arc::new(
            crate::assertion::PrincipalAssertion::authenticated().require_authentication(true),
        );
        let anonymous_only = InvertAssertion::new(inner).unwrap();
        let request = get("/");
        let uri = path("/");
        assert!(anonymous_only
            .matches(&MatchContext::new(&request, &uri))
            .is_err());
    }

    #[test]
    fn test_rejects_url_writers() {
        let err = InvertAssertion::new(Arc::new(UriExactAssertion::new(path("/a")))).unwrap_err();
        assert!(matches!(err, MosaicError::Configuration { .. }));
    }

    #[test]
    fn test_construction_negates_resource_predicates() {
        let not_documents =
            InvertAssertion::new(Arc::new(UriPrefixAssertion::new(path("/documents")))).unwrap();
        let mut url = seed("/other/x");
        assert!(not_documents.process_url_for(&mut url, &fixtures::article("/other/x"), None, true));
        assert!(!not_documents.process_url_for(
            &mut url,
            &fixtures::article("/documents/x"),
            None,
            true
        ));
        assert_eq!(url.path().as_str(), "/other/x");
    }

    #[test]
    fn test_construction_ignores_request_predicates() {
        let not_post =
            InvertAssertion::new(Arc::new(MethodAssertion::new([Method::POST]).unwrap())).unwrap();
        let mut url = seed("/a");
        assert!(not_post.process_url_for(&mut url, &fixtures::article("/a"), None, true));
    }
}
