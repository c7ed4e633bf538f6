//! Request views handed to assertions.

use crate::params::QueryParams;
use crate::url::{Protocol, Url};
use http::header::HOST;
use http::{HeaderMap, Method, Request};
use mosaic_core::{Principal, Resource, ResourcePath};

/// Header set by TLS-terminating proxies.
pub const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// An owned snapshot of the parts of an HTTP request that routing reads.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    method: Method,
    protocol: Protocol,
    host: String,
    port: u16,
    path: String,
    query: QueryParams,
    headers: HeaderMap,
}

impl RequestInfo {
    /// Captures an incoming request.
    ///
    /// The protocol comes from the URI scheme, then `X-Forwarded-Proto`, else
    /// `http`. Host and port come from the URI authority, then the `Host`
    /// header, else `localhost` on the protocol's default port.
    #[must_use]
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let uri = request.uri();
        let headers = request.headers();

        let protocol: Protocol = uri
            .scheme_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| {
                headers
                    .get(FORWARDED_PROTO)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.split(',').next())
                    .and_then(|v| v.trim().parse().ok())
            })
            .unwrap_or_default();

        let authority = uri
            .authority()
            .map(|a| a.as_str().to_string())
            .or_else(|| {
                headers
                    .get(HOST)
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string)
            });
        let (host, port) = match authority.as_deref().map(split_authority) {
            Some((host, port)) => (host, port.unwrap_or_else(|| protocol.default_port())),
            None => ("localhost".to_string(), protocol.default_port()),
        };

        Self {
            method: request.method().clone(),
            protocol,
            host,
            port,
            path: uri.path().to_string(),
            query: uri.query().map(QueryParams::parse).unwrap_or_default(),
            headers: headers.clone(),
        }
    }

    /// Builds the request a client would send for `url`.
    #[must_use]
    pub fn from_url(method: Method, url: &Url) -> Self {
        let path = if url.is_collection() && !url.path().is_root() {
            format!("{}/", url.path())
        } else {
            url.path().to_string()
        };
        Self {
            method,
            protocol: url.protocol(),
            host: url.host().to_string(),
            port: url.effective_port(),
            path,
            query: url.params().clone(),
            headers: HeaderMap::new(),
        }
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request protocol.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Returns the requested host name, without port.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the effective port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the raw (still percent-encoded) request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the parsed query parameters.
    #[must_use]
    pub const fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Returns the request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

fn split_authority(authority: &str) -> (String, Option<u16>) {
    // userinfo is never used for routing
    let authority = authority.rsplit_once('@').map_or(authority, |(_, a)| a);
    match authority
        .rsplit_once(':')
        .and_then(|(host, port)| port.parse().ok().map(|port| (host, port)))
    {
        Some((host, port)) => (host.to_ascii_lowercase(), Some(port)),
        None => (authority.to_ascii_lowercase(), None),
    }
}

/// Everything an assertion may inspect while matching.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// The incoming request.
    pub request: &'a RequestInfo,
    /// The resolved resource path.
    pub uri: &'a ResourcePath,
    /// The addressed resource, when it could be retrieved.
    pub resource: Option<&'a Resource>,
    /// The authenticated principal, if any.
    pub principal: Option<&'a Principal>,
}

impl<'a> MatchContext<'a> {
    /// Creates a context without resource or principal.
    #[must_use]
    pub const fn new(request: &'a RequestInfo, uri: &'a ResourcePath) -> Self {
        Self {
            request,
            uri,
            resource: None,
            principal: None,
        }
    }

    /// Sets the addressed resource.
    #[must_use]
    pub const fn with_resource(mut self, resource: Option<&'a Resource>) -> Self {
        self.resource = resource;
        self
    }

    /// Sets the principal.
    #[must_use]
    pub const fn with_principal(mut self, principal: Option<&'a Principal>) -> Self {
        self.principal = principal;
        self
    }
}
