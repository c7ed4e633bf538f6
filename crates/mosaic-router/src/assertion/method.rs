//! HTTP method set membership.

use super::{Assertion, Capability};
use crate::request::MatchContext;
use http::Method;
use mosaic_core::{MosaicError, MosaicResult};
use std::any::Any;

/// Matches requests whose method is in a configured set.
///
/// # Example
///
/// ```rust
/// use mosaic_router::assertion::MethodAssertion;
///
/// let assertion = MethodAssertion::from_names(["GET", "head"]).unwrap();
/// assert!(assertion.allows(&http::Method::HEAD));
/// assert!(!assertion.allows(&http::Method::POST));
/// ```
#[derive(Debug, Clone)]
pub struct MethodAssertion {
    methods: Vec<Method>,
}

impl MethodAssertion {
    /// Creates the assertion from methods.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `methods` is empty.
    pub fn new(methods: impl IntoIterator<Item = Method>) -> MosaicResult<Self> {
        let mut collected: Vec<Method> = Vec::new();
        for method in methods {
            if !collected.contains(&method) {
                collected.push(method);
            }
        }
        if collected.is_empty() {
            return Err(MosaicError::configuration(
                "method assertion needs at least one method",
            ));
        }
        Ok(Self { methods: collected })
    }

    /// Creates the assertion from method names (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the list is empty or a name is not a
    /// valid HTTP method.
    pub fn from_names<I, S>(names: I) -> MosaicResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref().to_ascii_uppercase();
                Method::from_bytes(name.as_bytes()).map_err(|_| {
                    MosaicError::configuration(format!("invalid HTTP method '{name}'"))
                })
            })
            .collect::<MosaicResult<Vec<_>>>()?;
        Self::new(methods)
    }

    /// Returns `true` if `method` is in the set.
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Returns the configured methods.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

impl Assertion for MethodAssertion {
    fn kind(&self) -> &'static str {
        "method"
    }

    fn capability(&self) -> Capability {
        Capability::RequestPredicate
    }

    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        Ok(self.allows(ctx.request.method()))
    }

    fn conflicts(&self, other: &dyn Assertion) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| !self.methods.iter().any(|m| other.allows(m)))
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

    #[test]
    fn test_matches_method_set() {
        let assertion = MethodAssertion::new([Method::GET, Method::HEAD]).unwrap();
        let uri = path("/x");

        let get_request = request(Method::GET, "/x");
        let post_request = request(Method::POST, "/x");
        assert!(assertion
            .matches(&MatchContext::new(&get_request, &uri))
            .unwrap());
        assert!(!assertion
            .matches(&MatchContext::new(&post_request, &uri))
            .unwrap());
    }

    #[test]
    fn test_from_names() {
        let assertion = MethodAssertion::from_names(["get", "PROPFIND", "get"]).unwrap();
        assert_eq!(assertion.methods().len(), 2);
        assert!(assertion.allows(&Method::from_bytes(b"PROPFIND").unwrap()));
    }

    #[test]
    fn test_rejects_empty_and_invalid() {
        assert!(MethodAssertion::new(Vec::<Method>::new()).is_err());
        assert!(MethodAssertion::from_names(["GE T"]).is_err());
    }

    #[test]
    fn test_construction_is_never_blocked() {
        let assertion = MethodAssertion::new([Method::POST]).unwrap();
        let resource = fixtures::article("/x");
        let mut url = seed("/x");
        assert!(assertion.process_url_for(&mut url, &resource, None, true));
    }

    #[test]
    fn test_conflicts_when_disjoint() {
        let read = MethodAssertion::new([Method::GET, Method::HEAD]).unwrap();
        let write = MethodAssertion::new([Method::PUT, Method::DELETE]).unwrap();
        let both = MethodAssertion::new([Method::GET, Method::PUT]).unwrap();
        assert!(read.conflicts(&write));
        assert!(!read.conflicts(&both));
        assert!(!write.conflicts(&both));
    }
}
