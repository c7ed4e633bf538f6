//! Typed configuration for Mosaic.
//!
//! - TOML and JSON files
//! - Environment variable overrides
//! - Strict parsing (unknown fields are errors)
//! - Validation of the service tree before anything is built
//!
//! # Configuration File Format
//!
//! ```toml
//! [web]
//! host = "www.example.org"     # or "*" for the request host
//! protocol = "*"
//! restricted_protocol = "https"
//! port = "*"
//! strip_prefixes = ["/cms"]
//!
//! [[services]]
//! name = "site"
//! assertions = [{ type = "always" }]
//!
//! [[services]]
//! name = "documents"
//! parent = "site"
//! order = 10
//! assertions = [{ type = "uri_prefix", prefix = "/documents" }]
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Web and telemetry values can be overridden with `PREFIX__SECTION__KEY`:
//!
//! - `MOSAIC__WEB__HOST=www.example.org`
//! - `MOSAIC__TELEMETRY__METRICS__ENABLED=false`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
