//! Service tree construction and depth-first resolution.
//!
//! The tree is built once from a flat list of [`ServiceDefinition`]s, each
//! naming its parent. The builder validates parent links eagerly, so a
//! cycle is a startup error and never reaches request handling.
//!
//! # Resolution
//!
//! ```text
//!            A (always)                 /documents/foo (article) -> C
//!            │                          /documents/bar (folder)  -> B
//!            B (uri_prefix /documents)  /other                   -> A
//!            │
//!            C (resource_type article)
//! ```
//!
//! Roots and children are tried in [`ServiceOrder`]. A service matches when
//! all its own assertions match; its children are then tried and the first
//! matching child (recursively) wins over the parent.

use crate::assertion::{conflicting, Assertion};
use crate::canonical::{CanonicalUrlConstructor, UrlDefaults};
use crate::postprocess::UrlPostProcessor;
use crate::request::MatchContext;
use crate::service::{Service, ServiceId, ServiceOrder};
use crate::url::Url;
use indexmap::IndexMap;
use mosaic_core::{MosaicError, MosaicResult, Principal, Resource};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Configuration record for one service.
///
/// # Example
///
/// ```rust
/// use mosaic_router::{ServiceDefinition, ServiceTreeBuilder};
/// use mosaic_router::assertion::{AlwaysAssertion, UriPrefixAssertion};
/// use mosaic_core::ResourcePath;
///
/// let mut builder = ServiceTreeBuilder::new();
/// builder
///     .add(ServiceDefinition::new("site").assertion(AlwaysAssertion))
///     .unwrap()
///     .add(
///         ServiceDefinition::new("documents")
///             .parent("site")
///             .assertion(UriPrefixAssertion::new(ResourcePath::parse("/documents").unwrap())),
///     )
///     .unwrap();
///
/// let tree = builder.build().unwrap();
/// assert_eq!(tree.len(), 2);
/// assert_eq!(tree.service("documents").unwrap().depth(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    name: String,
    parent: Option<String>,
    order: ServiceOrder,
    handler: Option<String>,
    attributes: BTreeMap<String, serde_json::Value>,
    interceptors: Vec<String>,
    assertions: Vec<Arc<dyn Assertion>>,
    post_processors: Vec<Arc<dyn UrlPostProcessor>>,
}

impl ServiceDefinition {
    /// Creates a root definition with default order.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            order: ServiceOrder::default(),
            handler: None,
            attributes: BTreeMap::new(),
            interceptors: Vec::new(),
            assertions: Vec::new(),
            post_processors: Vec::new(),
        }
    }

    /// Sets the parent service by name.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Sets the sibling priority.
    #[must_use]
    pub fn order(mut self, order: impl Into<ServiceOrder>) -> Self {
        self.order = order.into();
        self
    }

    /// Sets the handler reference.
    #[must_use]
    pub fn handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Appends an interceptor reference.
    #[must_use]
    pub fn interceptor(mut self, interceptor: impl Into<String>) -> Self {
        self.interceptors.push(interceptor.into());
        self
    }

    /// Appends an assertion.
    #[must_use]
    pub fn assertion(self, assertion: impl Assertion) -> Self {
        self.shared_assertion(Arc::new(assertion))
    }

    /// Appends an already shared assertion.
    #[must_use]
    pub fn shared_assertion(mut self, assertion: Arc<dyn Assertion>) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Appends a URL post-processor.
    #[must_use]
    pub fn post_processor(mut self, processor: impl UrlPostProcessor + 'static) -> Self {
        self.post_processors.push(Arc::new(processor));
        self
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent name.
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

/// Collects service definitions and builds a validated [`ServiceTree`].
#[derive(Debug, Default)]
pub struct ServiceTreeBuilder {
    defaults: UrlDefaults,
    definitions: IndexMap<String, ServiceDefinition>,
}

impl ServiceTreeBuilder {
    /// Creates an empty builder with wildcard URL defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the defaults constructed URLs start from.
    #[must_use]
    pub fn with_defaults(mut self, defaults: UrlDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Adds a definition.
    ///
    /// Parents may be added later. If the parent is already known, the new
    /// link is checked for cycles immediately.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty or duplicate name, a
    /// service that is its own parent, or a parent link that closes a cycle.
    pub fn add(&mut self, definition: ServiceDefinition) -> MosaicResult<&mut Self> {
        let name = definition.name.clone();
        if name.trim().is_empty() {
            return Err(MosaicError::configuration("service name must not be empty"));
        }
        if self.definitions.contains_key(&name) {
            return Err(MosaicError::configuration(format!(
                "service '{name}' is defined twice"
            )));
        }
        if let Some(parent) = definition.parent.as_deref() {
            self.check_parent(&name, parent)?;
        }
        self.definitions.insert(name, definition);
        Ok(self)
    }

    /// Assigns a new parent to an already added service.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the service is unknown, or if
    /// `parent` is the service itself or one of its descendants.
    pub fn set_parent(&mut self, name: &str, parent: Option<&str>) -> MosaicResult<()> {
        if !self.definitions.contains_key(name) {
            return Err(MosaicError::configuration(format!(
                "unknown service '{name}'"
            )));
        }
        if let Some(parent) = parent {
            self.check_parent(name, parent)?;
        }
        if let Some(definition) = self.definitions.get_mut(name) {
            definition.parent = parent.map(ToString::to_string);
        }
        Ok(())
    }

    /// Returns the number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` if no definition was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    // Walks up from `parent`; reaching `name` means `parent` is `name` or
    // one of its descendants.
    fn check_parent(&self, name: &str, parent: &str) -> MosaicResult<()> {
        let mut current = Some(parent);
        let mut steps = 0usize;
        while let Some(ancestor) = current {
            if ancestor == name {
                return Err(MosaicError::configuration(format!(
                    "making '{parent}' the parent of '{name}' would create a cycle"
                )));
            }
            steps += 1;
            if steps > self.definitions.len() {
                break;
            }
            current = self
                .definitions
                .get(ancestor)
                .and_then(|d| d.parent.as_deref());
        }
        Ok(())
    }

    /// Validates all parent links and builds the tree.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a parent is unknown or the parent
    /// links contain a cycle.
    pub fn build(self) -> MosaicResult<ServiceTree> {
        let defaults = Arc::new(self.defaults);
        let definitions: Vec<ServiceDefinition> = self.definitions.into_values().collect();
        let by_name: HashMap<String, ServiceId> = definitions
            .iter()
            .enumerate()
            .map(|(idx, d)| (d.name.clone(), ServiceId(idx)))
            .collect();

        let mut parents: Vec<Option<ServiceId>> = Vec::with_capacity(definitions.len());
        for definition in &definitions {
            let parent = match definition.parent.as_deref() {
                Some(parent) => Some(*by_name.get(parent).ok_or_else(|| {
                    MosaicError::configuration(format!(
                        "service '{}' refers to unknown parent '{parent}'",
                        definition.name
                    ))
                })?),
                None => None,
            };
            parents.push(parent);
        }

        let mut roots: Vec<ServiceId> = Vec::new();
        let mut children: Vec<Vec<ServiceId>> = vec![Vec::new(); definitions.len()];
        for (idx, parent) in parents.iter().enumerate() {
            match parent {
                Some(parent) => children[parent.0].push(ServiceId(idx)),
                None => roots.push(ServiceId(idx)),
            }
        }
        let order_of = |id: &ServiceId| definitions[id.0].order;
        roots.sort_by_key(order_of);
        for siblings in &mut children {
            siblings.sort_by_key(order_of);
        }

        // Breadth-first from the roots so every parent is finished before
        // its children. Nodes never reached sit on a cycle.
        let mut ancestors: Vec<Option<Vec<ServiceId>>> = vec![None; definitions.len()];
        let mut all_assertions: Vec<Vec<Arc<dyn Assertion>>> = vec![Vec::new(); definitions.len()];
        let mut all_post_processors: Vec<Vec<Arc<dyn UrlPostProcessor>>> =
            vec![Vec::new(); definitions.len()];
        let mut interceptors: Vec<Vec<String>> = vec![Vec::new(); definitions.len()];
        let mut queue: VecDeque<ServiceId> = roots.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            let definition = &definitions[id.0];
            let (mut chain, mut assertions, mut processors, mut inherited) = match parents[id.0] {
                Some(parent) => (
                    ancestors[parent.0].clone().unwrap_or_default(),
                    all_assertions[parent.0].clone(),
                    all_post_processors[parent.0].clone(),
                    interceptors[parent.0].clone(),
                ),
                None => (Vec::new(), Vec::new(), Vec::new(), Vec::new()),
            };
            if let Some(parent) = parents[id.0] {
                chain.push(parent);
            }
            assertions.extend(definition.assertions.iter().cloned());
            processors.extend(definition.post_processors.iter().cloned());
            inherited.extend(definition.interceptors.iter().cloned());

            ancestors[id.0] = Some(chain);
            all_assertions[id.0] = assertions;
            all_post_processors[id.0] = processors;
            interceptors[id.0] = inherited;
            queue.extend(children[id.0].iter().copied());
        }

        if let Some(idx) = ancestors.iter().position(Option::is_none) {
            return Err(MosaicError::configuration(format!(
                "service '{}' is part of a parent cycle",
                definitions[idx].name
            )));
        }

        let services: Vec<Arc<Service>> = definitions
            .into_iter()
            .zip(parents)
            .zip(children)
            .zip(ancestors.into_iter().zip(all_assertions))
            .zip(all_post_processors.into_iter().zip(interceptors))
            .enumerate()
            .map(
                |(idx, ((((definition, parent), children), (chain, assertions)), (processors, interceptors)))| {
                    Arc::new(Service {
                        id: ServiceId(idx),
                        name: definition.name,
                        order: definition.order,
                        parent,
                        ancestors: chain.unwrap_or_default(),
                        children,
                        assertions: definition.assertions,
                        all_assertions: assertions,
                        handler: definition.handler,
                        attributes: definition.attributes,
                        interceptors,
                        post_processors: definition.post_processors,
                        all_post_processors: processors,
                        defaults: Arc::clone(&defaults),
                    })
                },
            )
            .collect();

        let tree = ServiceTree {
            services,
            by_name,
            roots,
            defaults,
        };
        for (a, b) in tree.overlapping_siblings() {
            warn!(
                first = %a.name(),
                second = %b.name(),
                "sibling services have no conflicting assertions; the first one shadows the second"
            );
        }
        debug!(services = tree.len(), roots = tree.roots.len(), "service tree built");
        Ok(tree)
    }
}

/// The immutable service tree.
#[derive(Debug)]
pub struct ServiceTree {
    services: Vec<Arc<Service>>,
    by_name: HashMap<String, ServiceId>,
    roots: Vec<ServiceId>,
    defaults: Arc<UrlDefaults>,
}

impl ServiceTree {
    /// Returns the service with `id`.
    #[must_use]
    pub fn get(&self, id: ServiceId) -> Option<&Arc<Service>> {
        self.services.get(id.0)
    }

    /// Returns the service named `name`.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Arc<Service>> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Returns the root services in evaluation order.
    pub fn roots(&self) -> impl Iterator<Item = &Arc<Service>> {
        self.roots.iter().map(|id| &self.services[id.0])
    }

    /// Returns the children of `service` in evaluation order.
    pub fn children<'a>(&'a self, service: &'a Service) -> impl Iterator<Item = &'a Arc<Service>> {
        service.children().iter().map(|id| &self.services[id.0])
    }

    /// Returns the parent of `service`.
    #[must_use]
    pub fn parent(&self, service: &Service) -> Option<&Arc<Service>> {
        service.parent().and_then(|id| self.get(id))
    }

    /// Returns the ancestors of `service`, root first.
    pub fn ancestors<'a>(&'a self, service: &'a Service) -> impl Iterator<Item = &'a Arc<Service>> {
        service.ancestors().iter().map(|id| &self.services[id.0])
    }

    /// Returns all services in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Service>> {
        self.services.iter()
    }

    /// Returns the number of services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if the tree has no services.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Returns the URL defaults shared by all services.
    #[must_use]
    pub const fn defaults(&self) -> &Arc<UrlDefaults> {
        &self.defaults
    }

    /// Returns a canonical URL constructor over the tree's defaults.
    #[must_use]
    pub fn canonical(&self) -> CanonicalUrlConstructor {
        CanonicalUrlConstructor::new(Arc::clone(&self.defaults))
    }

    /// Finds the deepest matching service along the first matching path.
    ///
    /// Returns `Ok(None)` if no root matches.
    ///
    /// # Errors
    ///
    /// Propagates the first assertion error, such as
    /// `AuthenticationRequired`, without trying further services.
    pub fn resolve(&self, ctx: &MatchContext<'_>) -> MosaicResult<Option<&Arc<Service>>> {
        for root in &self.roots {
            if let Some(found) = self.match_service(*root, ctx)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn match_service(
        &self,
        id: ServiceId,
        ctx: &MatchContext<'_>,
    ) -> MosaicResult<Option<&Arc<Service>>> {
        let service = &self.services[id.0];
        for assertion in service.assertions() {
            if !assertion.matches(ctx)? {
                trace!(
                    service = %service.name(),
                    assertion = assertion.kind(),
                    "assertion did not match"
                );
                return Ok(None);
            }
        }
        for child in service.children() {
            if let Some(found) = self.match_service(*child, ctx)? {
                return Ok(Some(found));
            }
        }
        Ok(Some(service))
    }

    /// Returns sibling pairs where neither service has an assertion that
    /// conflicts with one of the other's, so one may shadow the other.
    #[must_use]
    pub fn overlapping_siblings(&self) -> Vec<(&Arc<Service>, &Arc<Service>)> {
        let groups = std::iter::once(self.roots.as_slice())
            .chain(self.services.iter().map(|s| s.children()));
        let mut overlaps = Vec::new();
        for group in groups {
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    let (a, b) = (&self.services[a.0], &self.services[b.0]);
                    let disjoint = a.assertions().iter().any(|x| {
                        b.assertions()
                            .iter()
                            .any(|y| conflicting(x.as_ref(), y.as_ref()))
                    });
                    if !disjoint {
                        overlaps.push((a, b));
                    }
                }
            }
        }
        overlaps
    }

    /// Constructs a URL for the service named `name`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown service, otherwise see
    /// [`Service::construct_url_with`].
    pub fn construct_url(
        &self,
        name: &str,
        resource: &Resource,
        principal: Option<&Principal>,
    ) -> MosaicResult<Url> {
        self.service(name)
            .ok_or_else(|| MosaicError::configuration(format!("unknown service '{name}'")))?
            .construct_url(resource, principal)
    }

    /// Tries `candidates` in order and returns the first service that can
    /// link to `resource`, with its URL.
    ///
    /// Services that are not linkable are skipped. Returns `Ok(None)` when
    /// no candidate links.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown candidate and propagates
    /// any construction error other than `NotLinkable`.
    pub fn first_linkable<'a, I>(
        &self,
        candidates: I,
        resource: &Resource,
        principal: Option<&Principal>,
    ) -> MosaicResult<Option<(&Arc<Service>, Url)>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in candidates {
            let service = self
                .service(name)
                .ok_or_else(|| MosaicError::configuration(format!("unknown service '{name}'")))?;
            match service.construct_url(resource, principal) {
                Ok(url) => return Ok(Some((service, url))),
                Err(e) if e.is_not_linkable() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}
