//! Assertion-driven service resolution for Mosaic.
//!
//! This crate routes requests to services arranged in a tree, and builds
//! URLs that route back to a given service.
//!
//! # Features
//!
//! - **Depth-first resolution**: ordered siblings, first match wins, the
//!   deepest matching service is selected
//! - **Two-way assertions**: every guard both tests requests and contributes
//!   to URLs under construction
//! - **Validated trees**: parent cycles and unknown parents fail at startup
//! - **Request scope**: the resolved [`RequestContext`] is bound per task
//!
//! # Example
//!
//! ```rust
//! use mosaic_core::fixtures;
//! use mosaic_router::assertion::{AlwaysAssertion, ResourceTypeAssertion, UriPrefixAssertion};
//! use mosaic_router::{ServiceDefinition, ServiceTreeBuilder};
//! use std::sync::Arc;
//!
//! let types = Arc::new(fixtures::sample_type_tree());
//! let mut builder = ServiceTreeBuilder::new();
//! builder
//!     .add(ServiceDefinition::new("site").assertion(AlwaysAssertion))
//!     .unwrap()
//!     .add(
//!         ServiceDefinition::new("documents")
//!             .parent("site")
//!             .assertion(UriPrefixAssertion::new(fixtures::path("/documents"))),
//!     )
//!     .unwrap()
//!     .add(
//!         ServiceDefinition::new("article")
//!             .parent("documents")
//!             .assertion(ResourceTypeAssertion::new("article", types).unwrap()),
//!     )
//!     .unwrap();
//! let tree = builder.build().unwrap();
//!
//! // The inverse direction: a URL for the article service.
//! let article = fixtures::article("/documents/foo");
//! let url = tree.construct_url("article", &article, None).unwrap();
//! assert_eq!(url.path().as_str(), "/documents/foo");
//!
//! // A folder cannot be linked through the article service.
//! let folder = fixtures::folder("/documents/bar");
//! let err = tree.construct_url("article", &folder, None).unwrap_err();
//! assert!(err.is_not_linkable());
//! ```

#![doc(html_root_url = "https://docs.rs/mosaic-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assertion;
mod canonical;
mod context;
mod params;
mod postprocess;
mod request;
mod resolver;
mod service;
mod tree;
mod url;

pub use assertion::{Assertion, Capability};
pub use canonical::{guess_hostname, CanonicalUrlConstructor, UrlDefaults, HOSTNAME_ENV};
pub use context::{RequestContext, RequestId};
pub use params::QueryParams;
pub use postprocess::{ParameterPostProcessor, SelectiveHttpsPostProcessor, UrlPostProcessor};
pub use request::{MatchContext, RequestInfo, FORWARDED_PROTO};
pub use resolver::{ServiceResolver, DEFAULT_TRUSTED_TOKEN};
pub use service::{Service, ServiceId, ServiceOrder};
pub use tree::{ServiceDefinition, ServiceTree, ServiceTreeBuilder};
pub use url::{Protocol, Url, UrlError};
