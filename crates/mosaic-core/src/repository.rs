//! Content repository contract.
//!
//! The routing layer consumes the repository through this trait only. The
//! resolver retrieves the addressed resource once per request; assertions
//! and URL construction work on the already-retrieved [`Resource`].

use crate::identity::{Principal, Token};
use crate::resource::{Privilege, Resource, ResourcePath, ResourceTypeTree};
use std::future::Future;
use thiserror::Error;

/// Errors returned by a [`Repository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No resource exists at the path.
    #[error("resource not found: {uri}")]
    NotFound {
        /// The requested path.
        uri: ResourcePath,
    },

    /// The resource is locked by another party.
    #[error("resource locked: {uri}")]
    Locked {
        /// The requested path.
        uri: ResourcePath,
    },

    /// The token does not grant the requested access.
    #[error("access to {uri} denied")]
    AuthorizationDenied {
        /// The requested path.
        uri: ResourcePath,
    },

    /// Any other storage failure.
    #[error("repository failure: {message}")]
    Failure {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl RepositoryError {
    /// Creates a failure error.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` for errors that mean "no resource" during resolution
    /// (not found and locked) rather than a fault.
    #[must_use]
    pub const fn is_soft(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Locked { .. })
    }
}

/// Storage backend consumed by the resolver.
///
/// Implementations must be safe to share between concurrently handled
/// requests.
pub trait Repository: Send + Sync + 'static {
    /// Retrieves the resource at `uri`.
    ///
    /// `for_processing` asks for the resource in the form used for internal
    /// processing rather than for display.
    fn retrieve(
        &self,
        token: &Token,
        uri: &ResourcePath,
        for_processing: bool,
    ) -> impl Future<Output = Result<Resource, RepositoryError>> + Send;

    /// Lists the direct children of a collection.
    fn list_children(
        &self,
        token: &Token,
        uri: &ResourcePath,
    ) -> impl Future<Output = Result<Vec<Resource>, RepositoryError>> + Send;

    /// Returns `true` if a resource exists at `uri`.
    fn exists(
        &self,
        token: &Token,
        uri: &ResourcePath,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Checks whether `principal` may perform `action` on `resource`.
    fn is_authorized(
        &self,
        resource: &Resource,
        action: Privilege,
        principal: Option<&Principal>,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Returns the resource type hierarchy.
    fn type_tree(&self) -> &ResourceTypeTree;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_errors() {
        let uri = ResourcePath::root();
        assert!(RepositoryError::NotFound { uri: uri.clone() }.is_soft());
        assert!(RepositoryError::Locked { uri: uri.clone() }.is_soft());
        assert!(!RepositoryError::AuthorizationDenied { uri }.is_soft());
        assert!(!RepositoryError::failure("io").is_soft());
    }

    #[test]
    fn test_error_display() {
        let err = RepositoryError::NotFound {
            uri: ResourcePath::parse("/a").unwrap(),
        };
        assert_eq!(err.to_string(), "resource not found: /a");
    }
}
