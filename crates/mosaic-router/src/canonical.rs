//! Canonical URLs and the defaults every constructed URL starts from.
//!
//! Host, protocol and port come from static configuration. Each may be a
//! wildcard, in which case the value is taken from the current request
//! (see [`RequestContext::current`]). Without an active request, such as in
//! a background job, the host is guessed from the `HOSTNAME` environment
//! variable (else `localhost`) and the protocol falls back to `http`.

use crate::context::RequestContext;
use crate::request::RequestInfo;
use crate::url::{Protocol, Url};
use mosaic_core::{Resource, ResourcePath};
use std::sync::Arc;

/// Environment variable consulted when no host can be determined.
pub const HOSTNAME_ENV: &str = "HOSTNAME";

/// Static defaults for constructed URLs. `None` means wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlDefaults {
    host: Option<String>,
    protocol: Option<Protocol>,
    restricted_protocol: Option<Protocol>,
    port: Option<u16>,
}

impl UrlDefaults {
    /// Creates fully wildcarded defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fixed host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets a fixed protocol.
    #[must_use]
    pub const fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Sets the protocol used for read-restricted resources.
    #[must_use]
    pub const fn with_restricted_protocol(mut self, protocol: Protocol) -> Self {
        self.restricted_protocol = Some(protocol);
        self
    }

    /// Sets a fixed port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Returns the fixed host, `None` for the wildcard.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Returns the fixed protocol, `None` for the wildcard.
    #[must_use]
    pub const fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    /// Returns the protocol for read-restricted resources.
    #[must_use]
    pub const fn restricted_protocol(&self) -> Option<Protocol> {
        self.restricted_protocol
    }

    /// Returns the fixed port, `None` for the wildcard.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    /// Creates a URL for `path` with host, protocol and port filled in.
    #[must_use]
    pub fn seed(&self, path: ResourcePath, collection: bool, restricted: bool) -> Url {
        let current = RequestContext::current();
        let request = current.as_ref().map(|ctx| ctx.request());

        let protocol = self
            .restricted_protocol
            .filter(|_| restricted)
            .or(self.protocol)
            .or_else(|| request.map(|r| r.protocol()))
            .unwrap_or_default();
        let host = self
            .host
            .clone()
            .or_else(|| request.map(|r| r.host().to_string()))
            .unwrap_or_else(guess_hostname);
        // the request port only applies when the request used the same scheme
        let port = self
            .port
            .or_else(|| {
                request
                    .filter(|r| r.protocol() == protocol)
                    .map(RequestInfo::port)
            })
            .filter(|port| *port != protocol.default_port());

        let mut url = Url::new(protocol, host, path);
        url.set_port(port);
        url.set_collection(collection);
        url
    }
}

/// Guesses the local host name.
#[must_use]
pub fn guess_hostname() -> String {
    std::env::var(HOSTNAME_ENV)
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Builds service-independent URLs for resources.
///
/// Canonical construction ignores the service tree entirely and never fails.
#[derive(Debug, Clone)]
pub struct CanonicalUrlConstructor {
    defaults: Arc<UrlDefaults>,
}

impl CanonicalUrlConstructor {
    /// Creates a constructor over `defaults`.
    #[must_use]
    pub const fn new(defaults: Arc<UrlDefaults>) -> Self {
        Self { defaults }
    }

    /// Returns the canonical URL for `resource`.
    #[must_use]
    pub fn construct(&self, resource: &Resource) -> Url {
        self.defaults.seed(
            resource.uri().clone(),
            resource.is_collection(),
            resource.is_read_restricted(),
        )
    }

    /// Returns the canonical URL for a bare path.
    #[must_use]
    pub fn construct_for_path(&self, path: &ResourcePath) -> Url {
        self.defaults.seed(path.clone(), false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ServiceDefinition, ServiceTreeBuilder};
    use http::Request;
    use mosaic_core::fixtures;

    fn bound_context(uri: &str) -> Arc<RequestContext> {
        let mut builder = ServiceTreeBuilder::new();
        builder.add(ServiceDefinition::new("root")).unwrap();
        let tree = builder.build().unwrap();
        let request = Request::builder().uri(uri).body(()).unwrap();
        Arc::new(RequestContext::new(
            Arc::clone(tree.service("root").unwrap()),
            fixtures::path("/"),
            RequestInfo::from_request(&request),
        ))
    }

    #[test]
    fn test_fixed_defaults() {
        let defaults = UrlDefaults::new()
            .with_host("www.example.org")
            .with_protocol(Protocol::Https)
            .with_port(443);
        let canonical = CanonicalUrlConstructor::new(Arc::new(defaults));
        let url = canonical.construct(&fixtures::folder("/documents"));
        assert_eq!(url.port(), None);
        assert_eq!(url.to_string(), "https://www.example.org/documents/");
    }

    #[test]
    fn test_restricted_protocol() {
        let defaults = UrlDefaults::new()
            .with_host("h")
            .with_protocol(Protocol::Http)
            .with_restricted_protocol(Protocol::Https);
        let canonical = CanonicalUrlConstructor::new(Arc::new(defaults));
        let secret = fixtures::article("/documents/secret").read_restricted(true);
        assert_eq!(canonical.construct(&secret).protocol(), Protocol::Https);
        assert_eq!(
            canonical
                .construct(&fixtures::article("/documents/foo"))
                .protocol(),
            Protocol::Http
        );
    }

    #[test]
    fn test_wildcards_follow_current_request() {
        let canonical = CanonicalUrlConstructor::new(Arc::new(UrlDefaults::new()));
        let ctx = bound_context("https://cms.example.org:8443/a");
        let url = RequestContext::sync_scope(ctx, || {
            canonical.construct_for_path(&fixtures::path("/other/x"))
        });
        assert_eq!(url.to_string(), "https://cms.example.org:8443/other/x");
    }

    #[test]
    fn test_request_port_needs_request_protocol() {
        let defaults = UrlDefaults::new().with_restricted_protocol(Protocol::Https);
        let canonical = CanonicalUrlConstructor::new(Arc::new(defaults));
        let secret = fixtures::article("/secret").read_restricted(true);
        let public = fixtures::article("/public");
        let (secret, public) = RequestContext::sync_scope(
            bound_context("http://cms.example.org:8080/a"),
            || (canonical.construct(&secret), canonical.construct(&public)),
        );
        assert_eq!(secret.to_string(), "https://cms.example.org/secret");
        assert_eq!(public.to_string(), "http://cms.example.org:8080/public");
    }

    #[test]
    fn test_wildcards_without_request_never_fail() {
        let canonical = CanonicalUrlConstructor::new(Arc::new(UrlDefaults::new()));
        let url = canonical.construct_for_path(&fixtures::path("/x"));
        assert_eq!(url.protocol(), Protocol::Http);
        assert!(!url.host().is_empty());
        assert_eq!(url.port(), None);
    }
}
