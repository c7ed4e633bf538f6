//! URL value type.
//!
//! A [`Url`] is built fresh for every construction call and handed to the
//! assertion chain, which writes protocol, host, port, path and parameters
//! into it. It is never shared between requests.

use crate::params::QueryParams;
use mosaic_core::{InvalidPath, ResourcePath};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported URL schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    /// Plain HTTP.
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// Returns the scheme name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Returns the port implied by the scheme.
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Self::Http)
        } else if s.eq_ignore_ascii_case("https") {
            Ok(Self::Https)
        } else {
            Err(UrlError::UnsupportedProtocol(s.to_string()))
        }
    }
}

/// Errors produced while parsing a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// Only `http` and `https` are supported.
    #[error("unsupported protocol '{0}'")]
    UnsupportedProtocol(String),

    /// An absolute URL without a host.
    #[error("URL '{0}' has no host")]
    MissingHost(String),

    /// The port is not a valid `u16`.
    #[error("invalid port '{0}'")]
    InvalidPort(String),

    /// The path is not a valid resource path.
    #[error(transparent)]
    InvalidPath(#[from] InvalidPath),

    /// The input is neither an absolute URL nor an absolute path.
    #[error("malformed URL '{0}'")]
    Malformed(String),
}

/// A URL under construction or ready for rendering.
///
/// # Example
///
/// ```rust
/// use mosaic_router::{Protocol, Url};
/// use mosaic_core::ResourcePath;
///
/// let mut url = Url::new(Protocol::Https, "www.example.org", ResourcePath::parse("/docs").unwrap());
/// url.set_collection(true);
/// url.params_mut().add("view", "list");
///
/// assert_eq!(url.to_string(), "https://www.example.org/docs/?view=list");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    protocol: Protocol,
    host: String,
    port: Option<u16>,
    path: ResourcePath,
    params: QueryParams,
    fragment: Option<String>,
    path_only: bool,
    collection: bool,
}

impl Url {
    /// Creates a URL without port, parameters or fragment.
    #[must_use]
    pub fn new(protocol: Protocol, host: impl Into<String>, path: ResourcePath) -> Self {
        Self {
            protocol,
            host: host.into(),
            port: None,
            path,
            params: QueryParams::new(),
            fragment: None,
            path_only: false,
            collection: false,
        }
    }

    /// Parses an absolute URL (`scheme://host[:port]/path?query#fragment`)
    /// or an absolute path (`/path?query#fragment`).
    ///
    /// A trailing slash on a non-root path marks the URL as a collection.
    /// Path segments are percent-decoded. A bare path parses to a path-only
    /// URL with host `localhost`.
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (input, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };

        let (protocol, host, port, raw_path, path_only) =
            if let Some((scheme, after)) = rest.split_once("://") {
                let protocol: Protocol = scheme.parse()?;
                let (authority, path) = match after.find('/') {
                    Some(idx) => (&after[..idx], &after[idx..]),
                    None => (after, "/"),
                };
                let (host, port) = match authority.rsplit_once(':') {
                    Some((host, port)) => {
                        let port = port
                            .parse::<u16>()
                            .map_err(|_| UrlError::InvalidPort(port.to_string()))?;
                        (host, Some(port))
                    }
                    None => (authority, None),
                };
                if host.is_empty() {
                    return Err(UrlError::MissingHost(input.to_string()));
                }
                (protocol, host.to_string(), port, path, false)
            } else if rest.starts_with('/') {
                (Protocol::Http, "localhost".to_string(), None, rest, true)
            } else {
                return Err(UrlError::Malformed(input.to_string()));
            };

        let decoded = urlencoding::decode(raw_path)
            .map_err(|_| UrlError::Malformed(input.to_string()))?;
        let path = ResourcePath::parse(&decoded)?;
        let collection = !path.is_root() && raw_path.ends_with('/');

        Ok(Self {
            protocol,
            host,
            port,
            path,
            params: query.map(QueryParams::parse).unwrap_or_default(),
            fragment,
            path_only,
            collection,
        })
    }

    /// Returns the protocol.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Sets the protocol.
    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.protocol = protocol;
    }

    /// Changes the protocol, dropping the port if the protocol differs.
    ///
    /// A port belongs to the scheme it was chosen for and does not carry
    /// over to the other one.
    pub fn switch_protocol(&mut self, protocol: Protocol) {
        if self.protocol != protocol {
            self.protocol = protocol;
            self.port = None;
        }
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Sets the host.
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
    }

    /// Returns the explicit port, if any.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns the explicit port or the protocol's default.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// Sets the port; `None` means the protocol default.
    pub fn set_port(&mut self, port: Option<u16>) {
        self.port = port;
    }

    /// Returns the path.
    #[must_use]
    pub const fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Replaces the path.
    pub fn set_path(&mut self, path: ResourcePath) {
        self.path = path;
    }

    /// Returns the query parameters.
    #[must_use]
    pub const fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Returns the query parameters for modification.
    pub fn params_mut(&mut self) -> &mut QueryParams {
        &mut self.params
    }

    /// Returns the fragment.
    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Sets or clears the fragment.
    pub fn set_fragment(&mut self, fragment: Option<String>) {
        self.fragment = fragment;
    }

    /// Returns `true` if the URL renders without scheme and authority.
    #[must_use]
    pub const fn is_path_only(&self) -> bool {
        self.path_only
    }

    /// Renders without scheme and authority when `true`.
    pub fn set_path_only(&mut self, path_only: bool) {
        self.path_only = path_only;
    }

    /// Returns `true` if the URL points at a collection.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        self.collection
    }

    /// Marks the URL as pointing at a collection (rendered with a trailing
    /// slash).
    pub fn set_collection(&mut self, collection: bool) {
        self.collection = collection;
    }

    /// Renders the path with percent-encoded segments.
    #[must_use]
    pub fn encoded_path(&self) -> String {
        if self.path.is_root() {
            return "/".to_string();
        }
        let mut out = String::with_capacity(self.path.as_str().len() + 1);
        for segment in self.path.segments() {
            out.push('/');
            out.push_str(&urlencoding::encode(segment));
        }
        if self.collection {
            out.push('/');
        }
        out
    }

    fn write_path_and_query(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded_path())?;
        if !self.params.is_empty() {
            write!(f, "?{}", self.params.to_query_string())?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", urlencoding::encode(fragment))?;
        }
        Ok(())
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.path_only {
            write!(f, "{}://{}", self.protocol, self.host)?;
            if let Some(port) = self.port {
                if port != self.protocol.default_port() {
                    write!(f, ":{port}")?;
                }
            }
        }
        self.write_path_and_query(f)
    }
}

impl FromStr for Url {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
