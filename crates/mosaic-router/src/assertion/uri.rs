//! Resource path assertions.

use super::{Assertion, Capability};
use crate::request::MatchContext;
use crate::url::Url;
use mosaic_core::{MosaicError, MosaicResult, Principal, Resource, ResourcePath};
use regex::Regex;
use std::any::Any;

/// Matches a single resource path and writes it into constructed URLs.
#[derive(Debug, Clone)]
pub struct UriExactAssertion {
    path: ResourcePath,
}

impl UriExactAssertion {
    /// Creates the assertion.
    #[must_use]
    pub const fn new(path: ResourcePath) -> Self {
        Self { path }
    }

    /// Returns the configured path.
    #[must_use]
    pub const fn path(&self) -> &ResourcePath {
        &self.path
    }
}

impl Assertion for UriExactAssertion {
    fn kind(&self) -> &'static str {
        "uri_exact"
    }

    fn capability(&self) -> Capability {
        Capability::UrlWriter
    }

    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        Ok(*ctx.uri == self.path)
    }

    fn process_url(&self, url: &mut Url) {
        url.set_path(self.path.clone());
    }

    fn process_url_for(
        &self,
        url: &mut Url,
        resource: &Resource,
        _principal: Option<&Principal>,
        match_required: bool,
    ) -> bool {
        if match_required {
            return *resource.uri() == self.path;
        }
        self.process_url(url);
        true
    }

    fn conflicts(&self, other: &dyn Assertion) -> bool {
        let other = other.as_any();
        if let Some(exact) = other.downcast_ref::<Self>() {
            return exact.path != self.path;
        }
        if let Some(prefix) = other.downcast_ref::<UriPrefixAssertion>() {
            return !self.path.is_descendant_or_self_of(&prefix.prefix);
        }
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches every resource path at or below a prefix.
///
/// Prefixes respect segment boundaries: `/documents` covers
/// `/documents/foo` but not `/documentsfoo`.
#[derive(Debug, Clone)]
pub struct UriPrefixAssertion {
    prefix: ResourcePath,
}

impl UriPrefixAssertion {
    /// Creates the assertion.
    #[must_use]
    pub const fn new(prefix: ResourcePath) -> Self {
        Self { prefix }
    }

    /// Returns the configured prefix.
    #[must_use]
    pub const fn prefix(&self) -> &ResourcePath {
        &self.prefix
    }
}

impl Assertion for UriPrefixAssertion {
    fn kind(&self) -> &'static str {
        "uri_prefix"
    }

    fn capability(&self) -> Capability {
        Capability::ResourcePredicate
    }

    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        Ok(ctx.uri.is_descendant_or_self_of(&self.prefix))
    }

    fn process_url_for(
        &self,
        _url: &mut Url,
        resource: &Resource,
        _principal: Option<&Principal>,
        match_required: bool,
    ) -> bool {
        !match_required || resource.uri().is_descendant_or_self_of(&self.prefix)
    }

    fn conflicts(&self, other: &dyn Assertion) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| {
                !self.prefix.is_descendant_or_self_of(&other.prefix)
                    && !other.prefix.is_descendant_or_self_of(&self.prefix)
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches resource paths against a regular expression.
#[derive(Debug, Clone)]
pub struct UriRegexAssertion {
    pattern: Regex,
}

impl UriRegexAssertion {
    /// Compiles the pattern.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern does not compile.
    pub fn new(pattern: &str) -> MosaicResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            MosaicError::configuration(format!("invalid uri pattern '{pattern}': {e}"))
        })?;
        Ok(Self { pattern })
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Assertion for UriRegexAssertion {
    fn kind(&self) -> &'static str {
        "uri_regex"
    }

    fn capability(&self) -> Capability {
        Capability::ResourcePredicate
    }

    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        Ok(self.pattern.is_match(ctx.uri.as_str()))
    }

    fn process_url_for(
        &self,
        _url: &mut Url,
        resource: &Resource,
        _principal: Option<&Principal>,
        match_required: bool,
    ) -> bool {
        !match_required || self.pattern.is_match(resource.uri().as_str())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
