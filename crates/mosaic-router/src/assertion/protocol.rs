//! Request protocol assertion.

use super::{Assertion, Capability};
use crate::context::RequestContext;
use crate::request::MatchContext;
use crate::url::{Protocol, Url};
use mosaic_core::MosaicResult;
use std::any::Any;

/// Matches the request protocol and writes it into constructed URLs.
///
/// A wildcard assertion (`protocol = None`) matches both protocols. During
/// construction it leaves the seeded protocol alone, unless
/// `prefer_request_protocol` is set and a request is active, in which case
/// the current request's protocol is used.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolAssertion {
    protocol: Option<Protocol>,
    prefer_request_protocol: bool,
}

impl ProtocolAssertion {
    /// Creates an assertion for a single protocol.
    #[must_use]
    pub const fn new(protocol: Protocol) -> Self {
        Self {
            protocol: Some(protocol),
            prefer_request_protocol: false,
        }
    }

    /// Creates a wildcard assertion.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            protocol: None,
            prefer_request_protocol: false,
        }
    }

    /// Uses the current request's protocol for wildcard construction.
    #[must_use]
    pub const fn prefer_request_protocol(mut self, prefer: bool) -> Self {
        self.prefer_request_protocol = prefer;
        self
    }

    /// Returns the configured protocol, `None` for the wildcard.
    #[must_use]
    pub const fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }
}

impl Assertion for ProtocolAssertion {
    fn kind(&self) -> &'static str {
        "protocol"
    }

    fn capability(&self) -> Capability {
        Capability::UrlWriter
    }

    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        Ok(self
            .protocol
            .map_or(true, |protocol| ctx.request.protocol() == protocol))
    }

    fn process_url(&self, url: &mut Url) {
        match self.protocol {
            Some(protocol) => url.switch_protocol(protocol),
            None if self.prefer_request_protocol => {
                if let Some(current) = RequestContext::current() {
                    url.switch_protocol(current.request().protocol());
                }
            }
            None => {}
        }
    }

    fn conflicts(&self, other: &dyn Assertion) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| match (self.protocol, other.protocol) {
                (Some(a), Some(b)) => a != b,
                _ => false,
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::tree::{ServiceDefinition, ServiceTreeBuilder};
    use mosaic_core::fixtures;
    use std::sync::Arc;

    #[test]
    fn test_matches() {
        let https = ProtocolAssertion::new(Protocol::Https);
        let uri = path("/");
        let secure = get("https://h/");
        let plain = get("http://h/");
        assert!(https.matches(&MatchContext::new(&secure, &uri)).unwrap());
        assert!(!https.matches(&MatchContext::new(&plain, &uri)).unwrap());
        assert!(ProtocolAssertion::any()
            .matches(&MatchContext::new(&plain, &uri))
            .unwrap());
    }

    #[test]
    fn test_writes_protocol() {
        let resource = fixtures::article("/x");
        let mut url = seed("/x");
        assert!(ProtocolAssertion::new(Protocol::Https).process_url_for(
            &mut url, &resource, None, true
        ));
        assert_eq!(url.protocol(), Protocol::Https);
    }

    #[test]
    fn test_switching_protocol_drops_port() {
        let mut url = Url::new(Protocol::Https, "h", path("/x"));
        url.set_port(Some(8443));
        ProtocolAssertion::new(Protocol::Http).process_url(&mut url);
        assert_eq!(url.to_string(), "http://h/x");

        let mut url = Url::new(Protocol::Https, "h", path("/x"));
        url.set_port(Some(8443));
        ProtocolAssertion::new(Protocol::Https).process_url(&mut url);
        assert_eq!(url.to_string(), "https://h:8443/x");
    }

    #[test]
    fn test_wildcard_prefers_request_protocol() {
        let mut builder = ServiceTreeBuilder::new();
        builder.add(ServiceDefinition::new("root")).unwrap();
        let tree = builder.build().unwrap();
        let ctx = RequestContext::new(
            Arc::clone(tree.service("root").unwrap()),
            path("/x"),
            get("https://h/x"),
        );

        let assertion = ProtocolAssertion::any().prefer_request_protocol(true);
        let mut url = seed("/x");
        assertion.process_url(&mut url);
        assert_eq!(url.protocol(), Protocol::Http);

        let protocol = RequestContext::sync_scope(Arc::new(ctx), || {
            let mut url = seed("/x");
            assertion.process_url(&mut url);
            url.protocol()
        });
        assert_eq!(protocol, Protocol::Https);
    }

    #[test]
    fn test_conflicts() {
        let http = ProtocolAssertion::new(Protocol::Http);
        let https = ProtocolAssertion::new(Protocol::Https);
        assert!(http.conflicts(&https));
        assert!(!http.conflicts(&ProtocolAssertion::any()));
    }
}
