//! Services: the nodes of the resolution tree.
//!
//! A [`Service`] is created by [`ServiceTreeBuilder`](crate::ServiceTreeBuilder)
//! and never changes afterwards. Besides its own assertions it caches the
//! full root-first chain of ancestor and own assertions, which URL
//! construction replays.

use crate::assertion::Assertion;
use crate::canonical::{CanonicalUrlConstructor, UrlDefaults};
use crate::params::QueryParams;
use crate::postprocess::UrlPostProcessor;
use crate::url::Url;
use mosaic_core::{MosaicError, MosaicResult, Principal, Resource, ResourcePath};
use mosaic_telemetry::metrics::{outcome, record_url_construction};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Sibling priority.
///
/// Ordered services sort ascending and before every unordered service.
/// Services with equal order keep their registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceOrder {
    /// Explicit priority; lower values are tried first.
    Ordered(i32),
    /// No priority; tried after all ordered siblings.
    Unordered,
}

impl Default for ServiceOrder {
    fn default() -> Self {
        Self::Ordered(0)
    }
}

impl From<i32> for ServiceOrder {
    fn from(order: i32) -> Self {
        Self::Ordered(order)
    }
}

/// Index of a service inside its [`ServiceTree`](crate::ServiceTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId(pub(crate) usize);

impl ServiceId {
    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A node of the service tree.
pub struct Service {
    pub(crate) id: ServiceId,
    pub(crate) name: String,
    pub(crate) order: ServiceOrder,
    pub(crate) parent: Option<ServiceId>,
    pub(crate) ancestors: Vec<ServiceId>,
    pub(crate) children: Vec<ServiceId>,
    pub(crate) assertions: Vec<Arc<dyn Assertion>>,
    pub(crate) all_assertions: Vec<Arc<dyn Assertion>>,
    pub(crate) handler: Option<String>,
    pub(crate) attributes: BTreeMap<String, serde_json::Value>,
    pub(crate) interceptors: Vec<String>,
    pub(crate) post_processors: Vec<Arc<dyn UrlPostProcessor>>,
    pub(crate) all_post_processors: Vec<Arc<dyn UrlPostProcessor>>,
    pub(crate) defaults: Arc<UrlDefaults>,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("order", &self.order)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("assertions", &self.assertions)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl Service {
    /// Returns the service's id.
    #[must_use]
    pub const fn id(&self) -> ServiceId {
        self.id
    }

    /// Returns the unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the sibling priority.
    #[must_use]
    pub const fn order(&self) -> ServiceOrder {
        self.order
    }

    /// Returns the parent's id, `None` for roots.
    #[must_use]
    pub const fn parent(&self) -> Option<ServiceId> {
        self.parent
    }

    /// Returns `true` for root services.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns the ids of all ancestors, root first.
    #[must_use]
    pub fn ancestors(&self) -> &[ServiceId] {
        &self.ancestors
    }

    /// Returns the ids of the children in evaluation order.
    #[must_use]
    pub fn children(&self) -> &[ServiceId] {
        &self.children
    }

    /// Returns the number of ancestors.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Returns `true` if `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.ancestors.contains(&self.id)
    }

    /// Returns the service's own assertions.
    #[must_use]
    pub fn assertions(&self) -> &[Arc<dyn Assertion>] {
        &self.assertions
    }

    /// Returns ancestor assertions followed by own assertions, root first.
    #[must_use]
    pub fn all_assertions(&self) -> &[Arc<dyn Assertion>] {
        &self.all_assertions
    }

    /// Returns the handler reference.
    #[must_use]
    pub fn handler(&self) -> Option<&str> {
        self.handler.as_deref()
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    /// Returns all attributes.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.attributes
    }

    /// Returns inherited and own interceptors, root first.
    #[must_use]
    pub fn interceptors(&self) -> &[String] {
        &self.interceptors
    }

    /// Returns the service's own post-processors.
    #[must_use]
    pub fn post_processors(&self) -> &[Arc<dyn UrlPostProcessor>] {
        &self.post_processors
    }

    /// Returns ancestor post-processors followed by own, root first.
    #[must_use]
    pub fn all_post_processors(&self) -> &[Arc<dyn UrlPostProcessor>] {
        &self.all_post_processors
    }

    /// Constructs a URL that routes to this service for `resource`,
    /// verifying every assertion of the chain.
    ///
    /// # Errors
    ///
    /// See [`Service::construct_url_with`].
    pub fn construct_url(
        &self,
        resource: &Resource,
        principal: Option<&Principal>,
    ) -> MosaicResult<Url> {
        self.construct_url_with(resource, principal, None, true)
    }

    /// Constructs a URL that routes to this service for `resource`.
    ///
    /// The URL is seeded from the resource path (with a trailing slash for
    /// collections) and `params`. Every assertion of the chain is then
    /// replayed root first; with `match_assertions` each one must also
    /// accept the resource and principal. Post-processors run last.
    ///
    /// # Errors
    ///
    /// - [`MosaicError::NotLinkable`] if an assertion rejects the resource.
    ///   No URL is returned.
    /// - [`MosaicError::PostProcessor`] if a post-processor fails.
    pub fn construct_url_with(
        &self,
        resource: &Resource,
        principal: Option<&Principal>,
        params: Option<&QueryParams>,
        match_assertions: bool,
    ) -> MosaicResult<Url> {
        let mut url = self.defaults.seed(
            resource.uri().clone(),
            resource.is_collection(),
            resource.is_read_restricted(),
        );
        if let Some(params) = params {
            url.params_mut().extend_from(params);
        }

        for assertion in &self.all_assertions {
            if !assertion.process_url_for(&mut url, resource, principal, match_assertions) {
                debug!(
                    service = %self.name,
                    resource_uri = %resource.uri(),
                    assertion = assertion.kind(),
                    "service not linkable"
                );
                record_url_construction(&self.name, outcome::NOT_LINKABLE);
                return Err(MosaicError::not_linkable(
                    &self.name,
                    resource.uri().as_str(),
                ));
            }
        }

        self.post_process(&mut url, Some(resource))?;
        record_url_construction(&self.name, outcome::OK);
        debug!(service = %self.name, url = %url, "constructed url");
        Ok(url)
    }

    /// Constructs a URL and renders it.
    ///
    /// # Errors
    ///
    /// See [`Service::construct_url_with`].
    pub fn construct_link(
        &self,
        resource: &Resource,
        principal: Option<&Principal>,
        match_assertions: bool,
    ) -> MosaicResult<String> {
        self.construct_url_with(resource, principal, None, match_assertions)
            .map(|url| url.to_string())
    }

    /// Constructs a template URL for `path` without a resource.
    ///
    /// Each assertion contributes best-effort; nothing is verified.
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::PostProcessor`] if a post-processor fails.
    pub fn construct_url_for_path(&self, path: &ResourcePath) -> MosaicResult<Url> {
        let mut url = self.defaults.seed(path.clone(), false, false);
        for assertion in &self.all_assertions {
            assertion.process_url(&mut url);
        }
        self.post_process(&mut url, None)?;
        record_url_construction(&self.name, outcome::OK);
        Ok(url)
    }

    /// Returns the canonical URL for `resource`, ignoring every assertion.
    #[must_use]
    pub fn construct_canonical_url(&self, resource: &Resource) -> Url {
        CanonicalUrlConstructor::new(Arc::clone(&self.defaults)).construct(resource)
    }

    /// Returns the canonical URL for a bare path.
    #[must_use]
    pub fn construct_canonical_url_for_path(&self, path: &ResourcePath) -> Url {
        CanonicalUrlConstructor::new(Arc::clone(&self.defaults)).construct_for_path(path)
    }

    fn post_process(&self, url: &mut Url, resource: Option<&Resource>) -> MosaicResult<()> {
        for processor in &self.all_post_processors {
            if let Err(e) = processor.process(url, self, resource) {
                record_url_construction(&self.name, outcome::ERROR);
                return Err(MosaicError::post_processor(&self.name, e));
            }
        }
        Ok(())
    }
}
