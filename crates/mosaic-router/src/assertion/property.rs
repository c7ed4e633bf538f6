//! Resource property assertion.

use super::{Assertion, Capability};
use crate::request::MatchContext;
use crate::url::Url;
use mosaic_core::{MosaicError, MosaicResult, Principal, Resource};
use std::any::Any;

/// Matches resources that carry a property, optionally with a given value.
#[derive(Debug, Clone)]
pub struct PropertyAssertion {
    name: String,
    value: Option<String>,
}

impl PropertyAssertion {
    /// Matches resources where the property exists.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `name` is empty.
    pub fn exists(name: impl Into<String>) -> MosaicResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(MosaicError::configuration(
                "property assertion needs a property name",
            ));
        }
        Ok(Self { name, value: None })
    }

    /// Matches resources where the property equals `value`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `name` is empty.
    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> MosaicResult<Self> {
        let mut assertion = Self::exists(name)?;
        assertion.value = Some(value.into());
        Ok(assertion)
    }

    fn accepts(&self, resource: &Resource) -> bool {
        match (resource.property(&self.name), &self.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

impl Assertion for PropertyAssertion {
    fn kind(&self) -> &'static str {
        "property"
    }

    fn capability(&self) -> Capability {
        Capability::ResourcePredicate
    }

    fn matches(&self, ctx: &MatchContext<'_>) -> MosaicResult<bool> {
        Ok(ctx.resource.is_some_and(|resource| self.accepts(resource)))
    }

    fn process_url_for(
        &self,
        _url: &mut Url,
        resource: &Resource,
        _principal: Option<&Principal>,
        match_required: bool,
    ) -> bool {
        !match_required || self.accepts(resource)
    }

    fn conflicts(&self, other: &dyn Assertion) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|other| {
            self.name == other.name
                && matches!((&self.value, &other.value), (Some(a), Some(b)) if a != b)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
