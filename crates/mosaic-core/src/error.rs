//! Error types for Mosaic.
//!
//! This module provides the [`MosaicError`] type, the error type shared by
//! service resolution (match direction) and URL construction (inverse
//! direction).
//!
//! # Recoverable vs fatal
//!
//! | Variant | Category | Caller reaction |
//! |---|---|---|
//! | `NotLinkable` | `NotLinkable` | try the next candidate service |
//! | `AuthenticationRequired` | `Authentication` | issue a challenge |
//! | `Unresolved` | `NotFound` | no service handles the request |
//! | `Repository` | `Repository` | abort request setup |
//! | `Configuration` | `Configuration` | abort startup |
//! | `PostProcessor` | `Internal` | surface as unexpected failure |
//! | `Internal` | `Internal` | surface as unexpected failure |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`MosaicError`].
pub type MosaicResult<T> = Result<T, MosaicError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A service cannot produce a URL for the given resource/principal.
    NotLinkable,
    /// A principal is required but absent.
    Authentication,
    /// No service matched the request.
    NotFound,
    /// The content repository failed.
    Repository,
    /// Startup configuration is invalid.
    Configuration,
    /// Unexpected failures.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::NotLinkable | Self::NotFound => StatusCode::NOT_FOUND,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Repository => StatusCode::BAD_GATEWAY,
            Self::Configuration | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error type for Mosaic.
///
/// # Example
///
/// ```
/// use mosaic_core::{ErrorCategory, MosaicError};
///
/// let err = MosaicError::not_linkable("documents", "/other/x");
/// assert!(err.is_not_linkable());
/// assert_eq!(err.category(), ErrorCategory::NotLinkable);
/// ```
#[derive(Error, Debug)]
pub enum MosaicError {
    /// An assertion rejected URL construction for a resource.
    #[error("service '{service}' cannot link to '{uri}'")]
    NotLinkable {
        /// The service URL construction was attempted for.
        service: String,
        /// The resource URI that was rejected.
        uri: String,
    },

    /// An assertion demands an authenticated principal.
    #[error("Authentication required: {message}")]
    AuthenticationRequired {
        /// Human-readable error message.
        message: String,
    },

    /// No root service (or descendant) matched the request.
    #[error("no service matched request for '{uri}'")]
    Unresolved {
        /// The resolved resource URI.
        uri: String,
    },

    /// A repository fault other than not-found or locked.
    #[error("Repository error: {message}")]
    Repository {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The service tree or one of its assertions is misconfigured.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// A URL post-processor failed after all assertions accepted.
    #[error("URL post-processing failed for service '{service}'")]
    PostProcessor {
        /// The service URL construction was attempted for.
        service: String,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl MosaicError {
    /// Creates a not-linkable error.
    #[must_use]
    pub fn not_linkable(service: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::NotLinkable {
            service: service.into(),
            uri: uri.into(),
        }
    }

    /// Creates an authentication-required error.
    #[must_use]
    pub fn authentication_required(message: impl Into<String>) -> Self {
        Self::AuthenticationRequired {
            message: message.into(),
        }
    }

    /// Creates an unresolved-request error.
    #[must_use]
    pub fn unresolved(uri: impl Into<String>) -> Self {
        Self::Unresolved { uri: uri.into() }
    }

    /// Creates a repository error.
    #[must_use]
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a repository error with a source error.
    pub fn repository_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Repository {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a post-processor error.
    pub fn post_processor(service: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::PostProcessor {
            service: service.into(),
            source: source.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotLinkable { .. } => ErrorCategory::NotLinkable,
            Self::AuthenticationRequired { .. } => ErrorCategory::Authentication,
            Self::Unresolved { .. } => ErrorCategory::NotFound,
            Self::Repository { .. } => ErrorCategory::Repository,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::PostProcessor { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns `true` for the "try the next service" construction signal.
    #[must_use]
    pub const fn is_not_linkable(&self) -> bool {
        matches!(self, Self::NotLinkable { .. })
    }

    /// Returns `true` if the outer request layer can recover from this error
    /// without treating it as a failure.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotLinkable { .. } | Self::AuthenticationRequired { .. } | Self::Unresolved { .. }
        )
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotLinkable { .. } => "NOT_LINKABLE",
            Self::AuthenticationRequired { .. } => "AUTHENTICATION_REQUIRED",
            Self::Unresolved { .. } => "UNRESOLVED",
            Self::Repository { .. } => "REPOSITORY_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::PostProcessor { .. } => "POST_PROCESSOR_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_not_linkable_error() {
        let error = MosaicError::not_linkable("documents", "/other/x");
        assert_eq!(error.category(), ErrorCategory::NotLinkable);
        assert!(error.is_not_linkable());
        assert!(error.is_recoverable());
        assert!(error.to_string().contains("documents"));
        assert!(error.to_string().contains("/other/x"));
    }

    #[test]
    fn test_authentication_required() {
        let error = MosaicError::authentication_required("principal missing");
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        assert!(!error.is_not_linkable());
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_repository_error_with_source() {
        let error = MosaicError::repository_with_source(
            "retrieve failed",
            std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
        );
        assert_eq!(error.category(), ErrorCategory::Repository);
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!error.is_recoverable());
        assert!(error.source().is_some());
    }

    #[test]
    fn test_post_processor_is_not_recoverable() {
        let error = MosaicError::post_processor("root", anyhow::anyhow!("boom"));
        assert_eq!(error.category(), ErrorCategory::Internal);
        assert!(!error.is_not_linkable());
        assert!(!error.is_recoverable());
        assert_eq!(error.error_code(), "POST_PROCESSOR_ERROR");
    }

    #[test]
    fn test_configuration_error() {
        let error = MosaicError::configuration("cycle detected");
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.to_string().contains("cycle detected"));
    }

    #[test]
    fn test_all_error_categories_have_status_codes() {
        let categories = [
            ErrorCategory::NotLinkable,
            ErrorCategory::Authentication,
            ErrorCategory::NotFound,
            ErrorCategory::Repository,
            ErrorCategory::Configuration,
            ErrorCategory::Internal,
        ];

        for category in categories {
            let status = category.default_status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "Category {:?} should map to error status code, got {}",
                category,
                status
            );
        }
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&ErrorCategory::NotLinkable).unwrap();
        assert_eq!(json, "\"not_linkable\"");
    }
}
