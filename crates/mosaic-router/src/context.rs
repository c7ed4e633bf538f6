//! Request context and its per-task binding.
//!
//! The resolver binds a [`RequestContext`] for the duration of one request
//! with [`RequestContext::scope`]. Code running inside that future, such as
//! URL construction that needs "the current request" for wildcard hosts,
//! reads it with [`RequestContext::current`]. The binding lives in a tokio
//! task-local slot: each concurrently handled request sees its own context,
//! and the slot is released when the scoped future completes, fails or is
//! dropped.

use crate::request::RequestInfo;
use crate::service::Service;
use mosaic_core::{Principal, Resource, ResourcePath, Token};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

tokio::task_local! {
    static CURRENT_REQUEST: Arc<RequestContext>;
}

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps request IDs sortable in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The outcome of resolving one request.
///
/// Holds the matched service, the resolved resource path and the resource
/// (when it could be retrieved), the principal and the token the request
/// runs with.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    service: Arc<Service>,
    uri: ResourcePath,
    resource: Option<Resource>,
    principal: Option<Principal>,
    security_token: Option<Token>,
    request: RequestInfo,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context with a fresh request ID.
    #[must_use]
    pub fn new(service: Arc<Service>, uri: ResourcePath, request: RequestInfo) -> Self {
        Self {
            request_id: RequestId::new(),
            service,
            uri,
            resource: None,
            principal: None,
            security_token: None,
            request,
            started_at: Instant::now(),
        }
    }

    /// Returns a new context with the specified request ID.
    #[must_use]
    pub const fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns a new context with the addressed resource.
    #[must_use]
    pub fn with_resource(mut self, resource: Option<Resource>) -> Self {
        self.resource = resource;
        self
    }

    /// Returns a new context with the principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    /// Returns a new context with the principal's security token.
    #[must_use]
    pub fn with_security_token(mut self, token: Token) -> Self {
        self.security_token = Some(token);
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the matched service.
    #[must_use]
    pub const fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// Returns the resolved resource path.
    #[must_use]
    pub const fn uri(&self) -> &ResourcePath {
        &self.uri
    }

    /// Returns the addressed resource, if it was retrieved.
    #[must_use]
    pub const fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    /// Returns the principal, if authenticated.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns the principal's security token, if any.
    #[must_use]
    pub const fn security_token(&self) -> Option<&Token> {
        self.security_token.as_ref()
    }

    /// Returns the request snapshot.
    #[must_use]
    pub const fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Runs `future` with `ctx` bound as the current request context.
    pub async fn scope<F>(ctx: Arc<Self>, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_REQUEST.scope(ctx, future).await
    }

    /// Runs `f` synchronously with `ctx` bound as the current request
    /// context.
    pub fn sync_scope<F, R>(ctx: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT_REQUEST.sync_scope(ctx, f)
    }

    /// Returns the context bound to the running task, if any.
    #[must_use]
    pub fn current() -> Option<Arc<Self>> {
        CURRENT_REQUEST.try_with(Arc::clone).ok()
    }

    /// Returns `true` if a context is bound to the running task.
    #[must_use]
    pub fn is_active() -> bool {
        CURRENT_REQUEST.try_with(|_| ()).is_ok()
    }
}
