//! URL post-processors.
//!
//! Post-processors run after every assertion of the chain accepted the
//! resource. Unlike an assertion rejection, a post-processor error aborts
//! construction with [`MosaicError::PostProcessor`](mosaic_core::MosaicError::PostProcessor).

use crate::params::QueryParams;
use crate::service::Service;
use crate::url::{Protocol, Url};
use mosaic_core::Resource;
use std::fmt;

/// Final adjustment of a constructed URL.
pub trait UrlPostProcessor: Send + Sync + fmt::Debug {
    /// Adjusts `url`, built for `service`. `resource` is `None` for
    /// template construction.
    ///
    /// # Errors
    ///
    /// Any error aborts construction.
    fn process(&self, url: &mut Url, service: &Service, resource: Option<&Resource>)
        -> anyhow::Result<()>;
}

/// Serves read-restricted resources over HTTPS and everything else over
/// HTTP.
#[derive(Debug, Clone, Copy)]
pub struct SelectiveHttpsPostProcessor {
    restricted: Protocol,
    public: Protocol,
}

impl SelectiveHttpsPostProcessor {
    /// Creates the post-processor with the usual https/http split.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            restricted: Protocol::Https,
            public: Protocol::Http,
        }
    }
}

impl Default for SelectiveHttpsPostProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlPostProcessor for SelectiveHttpsPostProcessor {
    fn process(
        &self,
        url: &mut Url,
        _service: &Service,
        resource: Option<&Resource>,
    ) -> anyhow::Result<()> {
        let Some(resource) = resource else {
            return Ok(());
        };
        let target = if resource.is_read_restricted() {
            self.restricted
        } else {
            self.public
        };
        url.switch_protocol(target);
        Ok(())
    }
}

/// Sets fixed query parameters on every constructed URL.
#[derive(Debug, Clone, Default)]
pub struct ParameterPostProcessor {
    params: QueryParams,
}

impl ParameterPostProcessor {
    /// Creates the post-processor.
    #[must_use]
    pub const fn new(params: QueryParams) -> Self {
        Self { params }
    }
}

impl UrlPostProcessor for ParameterPostProcessor {
    fn process(
        &self,
        url: &mut Url,
        _service: &Service,
        _resource: Option<&Resource>,
    ) -> anyhow::Result<()> {
        for (name, value) in &self.params {
            url.params_mut().set(name, value);
        }
        Ok(())
    }
}
