//! Host name assertion.

use super::{Assertion, Capability};
use crate::context::RequestContext;
use crate::request::MatchContext;
use crate::url::Url;
use mosaic_core::{MosaicError, MosaicResult};
use std::any::Any;

/// Host name that matches any host.
pub const ANY_HOST: &str = "*";

/// Matches requests addressed to one of a set of host names.
///
/// During construction the default host is written into the URL. A wildcard
/// default (`*`) takes the host of the current request, when one is active.
#[derive(Debug, Clone)]
pub struct HostNameAssertion {
    hosts: Vec<String>,
    default_host: String,
}

impl HostNameAssertion {
    /// Creates the assertion. The first host is the default.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `hosts` is empty.
    pub fn new<I, S>(hosts: I) -> MosaicResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: Vec<String> = hosts
            .into_iter()
            .map(|h| h.into().to_ascii_lowercase())
            .collect();
        let default_host = hosts
            .first()
            .cloned()
            .ok_or_else(|| MosaicError::configuration("host assertion needs at least one host"))?;
        Ok(Self {
            hosts,
            default_host,
        })
    }

    /// Overrides the host written during construction.
    #[must_use]
    pub fn with_default_host(mut self, host: impl Into<String>) -> Self {
        self.default_host = host.into().to_ascii_lowercase();
        self
    }

    /// Returns the configured hosts.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Returns the host written during construction.
    #[must_use]
    pub fn default_host(&self) -> &str {
        &self.default_host
    }

    fn is_wildcard(&self) -> bool {
        self.hosts.iter().any(|h| h == ANY_HOST)
    }

    fn allows(&self, host: &str) -> bool {
        self.is_wildcard() || self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }
}

impl Assertion for HostNameAssertion {
    fn kind(&self) -> &'static str {
        "host_name"
    }

    fn capability(&self) -> Capability {
        Capability::UrlWriter
    }

    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        Ok(self.allows(ctx.request.host()))
    }

    fn process_url(&self, url: &mut Url) {
        if self.default_host != ANY_HOST {
            url.set_host(self.default_host.clone());
        } else if let Some(current) = RequestContext::current() {
            url.set_host(current.request().host());
        }
    }

    fn conflicts(&self, other: &dyn Assertion) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|other| {
            !self.is_wildcard()
                && !other.is_wildcard()
                && !self.hosts.iter().any(|h| other.allows(h))
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
