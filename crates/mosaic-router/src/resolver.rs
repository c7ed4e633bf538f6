//! Request resolution.
//!
//! [`ServiceResolver`] turns an incoming request into a [`RequestContext`]:
//!
//! 1. The raw request path is percent-decoded, stripped of a configured
//!    prefix and normalised into a [`ResourcePath`].
//! 2. The addressed resource is retrieved with the trusted token. Not found
//!    and locked mean "no resource"; any other repository error aborts.
//! 3. The service tree is searched depth-first for the most specific match.
//!
//! [`ServiceResolver::dispatch`] additionally binds the context for the
//! duration of a handler future.

use crate::context::RequestContext;
use crate::request::{MatchContext, RequestInfo};
use crate::tree::ServiceTree;
use http::Request;
use mosaic_core::{MosaicError, MosaicResult, Principal, Repository, ResourcePath, Token};
use mosaic_telemetry::metrics::{outcome, record_resolution};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Token used for resource retrieval when none is configured.
pub const DEFAULT_TRUSTED_TOKEN: &str = "trusted";

/// Resolves requests against a service tree.
pub struct ServiceResolver<R> {
    tree: Arc<ServiceTree>,
    repository: Arc<R>,
    strip_prefixes: Vec<String>,
    trusted_token: Token,
}

impl<R> Clone for ServiceResolver<R> {
    fn clone(&self) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            repository: Arc::clone(&self.repository),
            strip_prefixes: self.strip_prefixes.clone(),
            trusted_token: self.trusted_token.clone(),
        }
    }
}

impl<R> std::fmt::Debug for ServiceResolver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceResolver")
            .field("services", &self.tree.len())
            .field("strip_prefixes", &self.strip_prefixes)
            .finish_non_exhaustive()
    }
}

impl<R: Repository> ServiceResolver<R> {
    /// Creates a resolver.
    #[must_use]
    pub fn new(tree: ServiceTree, repository: Arc<R>) -> Self {
        Self {
            tree: Arc::new(tree),
            repository,
            strip_prefixes: Vec::new(),
            trusted_token: Token::new(DEFAULT_TRUSTED_TOKEN),
        }
    }

    /// Sets the request-path prefixes removed before resolution.
    ///
    /// Prefixes only match at segment boundaries; trailing slashes are
    /// ignored.
    #[must_use]
    pub fn with_strip_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strip_prefixes = prefixes
            .into_iter()
            .map(|p| p.into().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    /// Sets the token used to retrieve the addressed resource.
    #[must_use]
    pub fn with_trusted_token(mut self, token: Token) -> Self {
        self.trusted_token = token;
        self
    }

    /// Returns the service tree.
    #[must_use]
    pub const fn tree(&self) -> &Arc<ServiceTree> {
        &self.tree
    }

    /// Returns the repository.
    #[must_use]
    pub const fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Turns a raw request path into a resource path.
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::Unresolved`] if the path does not decode or is
    /// not a valid absolute path.
    pub fn resolve_uri(&self, raw: &str) -> MosaicResult<ResourcePath> {
        let decoded = urlencoding::decode(raw).map_err(|_| MosaicError::unresolved(raw))?;
        let stripped = self
            .strip_prefixes
            .iter()
            .find_map(|prefix| {
                let rest = decoded.strip_prefix(prefix.as_str())?;
                (rest.is_empty() || rest.starts_with('/')).then_some(rest)
            })
            .unwrap_or(decoded.as_ref());
        let stripped = if stripped.is_empty() { "/" } else { stripped };
        ResourcePath::parse(stripped).map_err(|_| MosaicError::unresolved(raw))
    }

    /// Resolves an HTTP request.
    ///
    /// # Errors
    ///
    /// See [`ServiceResolver::resolve_info`].
    pub fn resolve<B>(
        &self,
        request: &Request<B>,
        principal: Option<Principal>,
        token: Option<Token>,
    ) -> impl Future<Output = MosaicResult<RequestContext>> + Send + '_ {
        self.resolve_info(RequestInfo::from_request(request), principal, token)
    }

    /// Resolves a captured request.
    ///
    /// The addressed resource is always retrieved with the trusted token;
    /// `token` is the principal's own token and is only bound to the
    /// resulting context.
    ///
    /// # Errors
    ///
    /// - [`MosaicError::Unresolved`] if the path is invalid or no service
    ///   matches.
    /// - [`MosaicError::Repository`] if retrieval fails with anything other
    ///   than not found or locked.
    /// - Any assertion error, such as
    ///   [`MosaicError::AuthenticationRequired`].
    pub async fn resolve_info(
        &self,
        request: RequestInfo,
        principal: Option<Principal>,
        token: Option<Token>,
    ) -> MosaicResult<RequestContext> {
        let started = Instant::now();
        let uri = match self.resolve_uri(request.path()) {
            Ok(uri) => uri,
            Err(e) => {
                record_resolution(None, outcome::UNRESOLVED, started.elapsed());
                return Err(e);
            }
        };

        let resource = match self
            .repository
            .retrieve(&self.trusted_token, &uri, true)
            .await
        {
            Ok(resource) => Some(resource),
            Err(e) if e.is_soft() => {
                debug!(resource_uri = %uri, reason = %e, "resolving without resource");
                None
            }
            Err(e) => {
                error!(resource_uri = %uri, error = %e, "resource retrieval failed");
                record_resolution(None, outcome::ERROR, started.elapsed());
                return Err(MosaicError::repository_with_source(
                    format!("failed to retrieve '{uri}'"),
                    e,
                ));
            }
        };

        let matched = {
            let ctx = MatchContext::new(&request, &uri)
                .with_resource(resource.as_ref())
                .with_principal(principal.as_ref());
            self.tree.resolve(&ctx).map(|found| found.map(Arc::clone))
        };
        let service = match matched {
            Ok(Some(service)) => service,
            Ok(None) => {
                debug!(resource_uri = %uri, "no service matched");
                record_resolution(None, outcome::UNRESOLVED, started.elapsed());
                return Err(MosaicError::unresolved(uri.as_str()));
            }
            Err(e) => {
                debug!(resource_uri = %uri, error = %e, "resolution aborted");
                record_resolution(None, outcome::ERROR, started.elapsed());
                return Err(e);
            }
        };

        let mut ctx = RequestContext::new(Arc::clone(&service), uri, request)
            .with_resource(resource)
            .with_principal(principal);
        if let Some(token) = token {
            ctx = ctx.with_security_token(token);
        }
        let principal = ctx
            .principal()
            .map_or_else(|| "anonymous".to_string(), Principal::log_id);
        debug!(
            request_id = %ctx.request_id(),
            service = %service.name(),
            resource_uri = %ctx.uri(),
            principal = %principal,
            "request resolved"
        );
        record_resolution(Some(service.name()), outcome::OK, started.elapsed());
        Ok(ctx)
    }

    /// Resolves `request` and runs `handler` with the context bound as the
    /// current request context.
    ///
    /// The binding is released when the handler future completes, including
    /// when it returns an error or is dropped.
    ///
    /// # Errors
    ///
    /// Returns resolution errors; the handler is not called in that case.
    pub fn dispatch<'a, B, F, Fut>(
        &'a self,
        request: &Request<B>,
        principal: Option<Principal>,
        token: Option<Token>,
        handler: F,
    ) -> impl Future<Output = MosaicResult<Fut::Output>> + 'a
    where
        F: FnOnce(Arc<RequestContext>) -> Fut + 'a,
        Fut: Future + 'a,
    {
        let resolving = self.resolve_info(RequestInfo::from_request(request), principal, token);
        async move {
            let ctx = Arc::new(resolving.await?);
            Ok(RequestContext::scope(Arc::clone(&ctx), handler(ctx)).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ServiceDefinition, ServiceTreeBuilder};
    use mosaic_core::fixtures;

    fn resolver() -> ServiceResolver<fixtures::InMemoryRepository> {
        let mut builder = ServiceTreeBuilder::new();
        builder.add(ServiceDefinition::new("root")).unwrap();
        ServiceResolver::new(builder.build().unwrap(), Arc::new(fixtures::sample_repository()))
            .with_strip_prefixes(["/site/", "/cms"])
    }

    #[test]
    fn test_resolve_uri_normalizes() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_uri("/documents/").unwrap().as_str(), "/documents");
        assert_eq!(resolver.resolve_uri("/").unwrap().as_str(), "/");
        assert_eq!(resolver.resolve_uri("/a%20b").unwrap().as_str(), "/a b");
    }

    #[test]
    fn test_resolve_uri_strips_prefix_at_segment_boundary() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_uri("/site/documents").unwrap().as_str(), "/documents");
        assert_eq!(resolver.resolve_uri("/site").unwrap().as_str(), "/");
        assert_eq!(resolver.resolve_uri("/cms/").unwrap().as_str(), "/");
        assert_eq!(resolver.resolve_uri("/sitemap").unwrap().as_str(), "/sitemap");
    }

    #[test]
    fn test_resolve_uri_rejects_relative_segments() {
        let err = resolver().resolve_uri("/a/../b").unwrap_err();
        assert!(matches!(err, MosaicError::Unresolved { .. }));
    }

    #[tokio::test]
    async fn test_resolve_binds_resource() {
        let resolver = resolver();
        let request = Request::builder().uri("/documents/foo").body(()).unwrap();
        let ctx = resolver.resolve(&request, None, None).await.unwrap();
        assert_eq!(ctx.service().name(), "root");
        assert_eq!(ctx.resource().map(|r| r.resource_type()), Some("article"));
    }

    #[tokio::test]
    async fn test_dispatch_scopes_context() {
        let resolver = resolver();
        let request = Request::builder().uri("/other").body(()).unwrap();
        let seen = resolver
            .dispatch(
                &request,
                Some(fixtures::reader()),
                Some(Token::new("bob-session")),
                |ctx| async move {
                    let current = RequestContext::current().unwrap();
                    assert_eq!(current.request_id(), ctx.request_id());
                    (
                        current.principal().map(|p| p.name().to_string()),
                        current.security_token().map(|t| t.as_str().to_string()),
                    )
                },
            )
            .await
            .unwrap();
        assert_eq!(seen.0.as_deref(), Some("bob"));
        assert_eq!(seen.1.as_deref(), Some("bob-session"));
        assert!(RequestContext::current().is_none());
    }
}
