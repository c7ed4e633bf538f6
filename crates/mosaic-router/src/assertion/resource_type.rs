//! Resource type assertion.

use super::{Assertion, Capability};
use crate::request::MatchContext;
use crate::url::Url;
use mosaic_core::{MosaicError, MosaicResult, Principal, Resource, ResourceTypeTree};
use std::any::Any;
use std::sync::Arc;

/// Matches resources of a type, either exactly or including subtypes.
#[derive(Debug, Clone)]
pub struct ResourceTypeAssertion {
    type_name: String,
    exact: bool,
    types: Arc<ResourceTypeTree>,
}

impl ResourceTypeAssertion {
    /// Creates an assertion that also accepts subtypes of `type_name`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `type_name` is not in `types`.
    pub fn new(type_name: impl Into<String>, types: Arc<ResourceTypeTree>) -> MosaicResult<Self> {
        let type_name = type_name.into();
        if !types.contains(&type_name) {
            return Err(MosaicError::configuration(format!(
                "unknown resource type '{type_name}'"
            )));
        }
        Ok(Self {
            type_name,
            exact: false,
            types,
        })
    }

    /// Only accepts the type itself, not its subtypes.
    #[must_use]
    pub const fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Returns the configured type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    fn accepts(&self, resource: &Resource) -> bool {
        if self.exact {
            resource.resource_type() == self.type_name
        } else {
            self.types.is_a(resource.resource_type(), &self.type_name)
        }
    }
}

impl Assertion for ResourceTypeAssertion {
    fn kind(&self) -> &'static str {
        "resource_type"
    }

    fn capability(&self) -> Capability {
        Capability::ResourcePredicate
    }

    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        Ok(ctx.resource.is_some_and(|resource| self.accepts(resource)))
    }

    fn process_url_for(
        &self,
        _url: &mut Url,
        resource: &Resource,
        _principal: Option<&Principal>,
        match_required: bool,
    ) -> bool {
        !match_required || self.accepts(resource)
    }

    // Single inheritance: two subtype sets overlap only if one type is an
    // ancestor of the other.
    fn conflicts(&self, other: &dyn Assertion) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        let (a, b) = (&self.type_name, &other.type_name);
        match (self.exact, other.exact) {
            (true, true) => a != b,
            (true, false) => !self.types.is_a(a, b),
            (false, true) => !self.types.is_a(b, a),
            (false, false) => !self.types.is_a(a, b) && !self.types.is_a(b, a),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use mosaic_core::fixtures;

    fn types() -> Arc<ResourceTypeTree> {
        Arc::new(fixtures::sample_type_tree())
    }

    #[test]
    fn test_subtype_mode() {
        let document = ResourceTypeAssertion::new("document", types()).unwrap();
        let request = get("/");
        let uri = path("/documents/foo");
        let article = fixtures::article("/documents/foo");
        let folder = fixtures::folder("/documents/foo");

        let ctx = MatchContext::new(&request, &uri).with_resource(Some(&article));
        assert!(document.matches(&ctx).unwrap());
        let ctx = MatchContext::new(&request, &uri).with_resource(Some(&folder));
        assert!(!document.matches(&ctx).unwrap());
    }

    #[test]
    fn test_exact_mode() {
        let document = ResourceTypeAssertion::new("document", types())
            .unwrap()
            .exact(true);
        let request = get("/");
        let uri = path("/a");
        let article = fixtures::article("/a");
        let ctx = MatchContext::new(&request, &uri).with_resource(Some(&article));
        assert!(!document.matches(&ctx).unwrap());
    }

    #[test]
    fn test_missing_resource_does_not_match() {
        let article = ResourceTypeAssertion::new("article", types()).unwrap();
        let request = get("/");
        let uri = path("/missing");
        assert!(!article
            .matches(&MatchContext::new(&request, &uri))
            .unwrap());
    }

    #[test]
    fn test_construction() {
        let article = ResourceTypeAssertion::new("article", types()).unwrap();
        let mut url = seed("/a");
        assert!(article.process_url_for(&mut url, &fixtures::article("/a"), None, true));
        assert!(!article.process_url_for(&mut url, &fixtures::folder("/a"), None, true));
        assert!(article.process_url_for(&mut url, &fixtures::folder("/a"), None, false));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(ResourceTypeAssertion::new("video", types()).is_err());
    }

    #[test]
    fn test_conflicts() {
        let document = ResourceTypeAssertion::new("document", types()).unwrap();
        let article = ResourceTypeAssertion::new("article", types()).unwrap();
        let collection = ResourceTypeAssertion::new("collection", types()).unwrap();
        let exact_document = ResourceTypeAssertion::new("document", types())
            .unwrap()
            .exact(true);

        assert!(!document.conflicts(&article));
        assert!(!article.conflicts(&document));
        assert!(document.conflicts(&collection));
        assert!(exact_document.conflicts(&article));
        assert!(!exact_document.conflicts(&document));
    }
}
