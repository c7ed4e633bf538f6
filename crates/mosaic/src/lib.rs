//! # Mosaic
//!
//! **Service resolution for a web content-management system**
//!
//! Mosaic decides which service handles a request, and builds URLs that
//! lead back to a chosen service:
//!
//! - **Service tree**: services guarded by assertions, searched depth-first
//! - **URL construction**: the same assertions write and verify URLs
//! - **Configuration**: the tree is declared in TOML or JSON and validated
//!   at startup
//! - **Observability**: structured logs and Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mosaic::prelude::*;
//!
//! let config = ConfigLoader::new()
//!     .with_production()
//!     .with_file("services.toml")?
//!     .with_env_prefix("MOSAIC")
//!     .load()?;
//! let _telemetry = mosaic::init_telemetry(&config)?;
//!
//! let resolver = mosaic::bootstrap(&config, Arc::new(repository))?;
//! let ctx = resolver.resolve(&request, principal, None).await?;
//! println!("{} handles {}", ctx.service().name(), ctx.uri());
//! ```

#![doc(html_root_url = "https://docs.rs/mosaic/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bootstrap;

pub use bootstrap::{bootstrap, build_assertion, build_tree, init_telemetry, url_defaults};

// Re-export core types
pub use mosaic_core as core;

// Re-export router types
pub use mosaic_router as router;

// Re-export configuration types
pub use mosaic_config as config;

// Re-export telemetry types
pub use mosaic_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use mosaic::prelude::*;
/// ```
pub mod prelude {
    pub use mosaic_core::{
        MosaicError, MosaicResult, Principal, Repository, Resource, ResourcePath, Token,
    };

    pub use mosaic_router::{
        Assertion, RequestContext, Service, ServiceDefinition, ServiceOrder, ServiceResolver,
        ServiceTree, ServiceTreeBuilder, Url,
    };

    pub use mosaic_config::{ConfigLoader, MosaicConfig};

    pub use std::sync::Arc;
}
