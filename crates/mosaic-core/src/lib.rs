//! # Mosaic Core
//!
//! Core types and traits for the Mosaic content-management routing layer.
//!
//! This crate provides the foundational types used throughout Mosaic:
//!
//! - [`MosaicError`] - Error taxonomy shared by resolution and URL construction
//! - [`Principal`] / [`Token`] - Who a request runs as, and the repository token
//! - [`ResourcePath`] / [`Resource`] / [`ResourceTypeTree`] - Resource model
//! - [`Repository`] - Content repository contract

#![doc(html_root_url = "https://docs.rs/mosaic-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod fixtures;
mod identity;
mod repository;
mod resource;

pub use error::{ErrorCategory, MosaicError, MosaicResult};
pub use identity::{Principal, Token};
pub use repository::{Repository, RepositoryError};
pub use resource::{InvalidPath, Privilege, Resource, ResourcePath, ResourceTypeTree};
