//! Resource model.
//!
//! The routing layer only needs a thin view of repository content: the
//! resource's path, its type, whether it is a collection, its properties and
//! whether reading it is restricted. Storage, locking and ACLs stay behind
//! the [`Repository`](crate::Repository) contract.

use crate::error::{MosaicError, MosaicResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string is not a valid absolute resource path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPath {
    /// The path does not start with `/`.
    #[error("resource path must be absolute: '{0}'")]
    NotAbsolute(String),
    /// The path contains a `.` or `..` segment.
    #[error("resource path contains a relative segment: '{0}'")]
    RelativeSegment(String),
}

/// A normalised, absolute resource path.
///
/// Duplicate slashes collapse and a trailing slash is dropped, except for the
/// root path `/`.
///
/// # Example
///
/// ```rust
/// use mosaic_core::ResourcePath;
///
/// let path = ResourcePath::parse("/documents//foo/").unwrap();
/// assert_eq!(path.as_str(), "/documents/foo");
/// assert_eq!(path.name(), "foo");
/// assert_eq!(path.parent().unwrap().as_str(), "/documents");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath(String);

impl ResourcePath {
    /// Returns the root path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parses and normalises a path.
    pub fn parse(path: &str) -> Result<Self, InvalidPath> {
        if !path.starts_with('/') {
            return Err(InvalidPath::NotAbsolute(path.to_string()));
        }

        let mut normalized = String::with_capacity(path.len());
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(InvalidPath::RelativeSegment(path.to_string()));
            }
            normalized.push('/');
            normalized.push_str(segment);
        }

        if normalized.is_empty() {
            normalized.push('/');
        }
        Ok(Self(normalized))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the non-empty path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Returns the number of segments (0 for the root).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Returns the last segment, or an empty string for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments().last().unwrap_or("")
    }

    /// Returns the parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    /// Appends a single segment.
    pub fn join(&self, segment: &str) -> Result<Self, InvalidPath> {
        let joined = if self.is_root() {
            format!("/{segment}")
        } else {
            format!("{}/{segment}", self.0)
        };
        Self::parse(&joined)
    }

    /// Returns `true` if `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        if self == other {
            return false;
        }
        if self.is_root() {
            return true;
        }
        other
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Returns `true` if `self` equals `ancestor` or lies beneath it.
    #[must_use]
    pub fn is_descendant_or_self_of(&self, ancestor: &Self) -> bool {
        self == ancestor || ancestor.is_ancestor_of(self)
    }
}

impl Default for ResourcePath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourcePath {
    type Err = InvalidPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = InvalidPath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.0
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A repository resource as seen by the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    uri: ResourcePath,
    resource_type: String,
    collection: bool,
    read_restricted: bool,
    properties: BTreeMap<String, String>,
}

impl Resource {
    /// Creates a non-collection resource of the given type.
    #[must_use]
    pub fn new(uri: ResourcePath, resource_type: impl Into<String>) -> Self {
        Self {
            uri,
            resource_type: resource_type.into(),
            collection: false,
            read_restricted: false,
            properties: BTreeMap::new(),
        }
    }

    /// Marks the resource as a collection.
    #[must_use]
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    /// Marks reading the resource as restricted (not world-readable).
    #[must_use]
    pub fn read_restricted(mut self, restricted: bool) -> Self {
        self.read_restricted = restricted;
        self
    }

    /// Sets a property value.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Returns the resource path.
    #[must_use]
    pub fn uri(&self) -> &ResourcePath {
        &self.uri
    }

    /// Returns the resource type name.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns `true` for collections.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// Returns `true` if reading the resource is restricted.
    #[must_use]
    pub fn is_read_restricted(&self) -> bool {
        self.read_restricted
    }

    /// Returns a property value.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Returns all properties.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// Actions checked through [`Repository::is_authorized`](crate::Repository::is_authorized).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    /// Read the resource.
    Read,
    /// Read the resource for processing (may bypass some restrictions).
    ReadProcessed,
    /// Modify the resource.
    Write,
    /// Full control.
    All,
}

/// Resource type hierarchy.
///
/// Every type has at most one supertype. A supertype must be registered
/// before its subtypes, which keeps the hierarchy acyclic.
///
/// # Example
///
/// ```rust
/// use mosaic_core::ResourceTypeTree;
///
/// let types = ResourceTypeTree::new()
///     .with_type("resource", None).unwrap()
///     .with_type("document", Some("resource")).unwrap()
///     .with_type("article", Some("document")).unwrap();
///
/// assert!(types.is_a("article", "resource"));
/// assert!(!types.is_a("document", "article"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceTypeTree {
    supertypes: HashMap<String, Option<String>>,
}

impl ResourceTypeTree {
    /// Creates an empty type tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type with an optional supertype.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the type is already registered or
    /// the supertype is unknown.
    pub fn with_type(mut self, name: &str, supertype: Option<&str>) -> MosaicResult<Self> {
        self.insert(name, supertype)?;
        Ok(self)
    }

    /// Registers a type with an optional supertype.
    pub fn insert(&mut self, name: &str, supertype: Option<&str>) -> MosaicResult<()> {
        if self.supertypes.contains_key(name) {
            return Err(MosaicError::configuration(format!(
                "resource type '{name}' is already defined"
            )));
        }
        if let Some(parent) = supertype {
            if !self.supertypes.contains_key(parent) {
                return Err(MosaicError::configuration(format!(
                    "resource type '{name}' refers to unknown supertype '{parent}'"
                )));
            }
        }
        self.supertypes
            .insert(name.to_string(), supertype.map(ToString::to_string));
        Ok(())
    }

    /// Returns `true` if the type is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.supertypes.contains_key(name)
    }

    /// Returns the direct supertype of `name`.
    #[must_use]
    pub fn supertype(&self, name: &str) -> Option<&str> {
        self.supertypes.get(name).and_then(|p| p.as_deref())
    }

    /// Returns `true` if `name` equals `ancestor` or is one of its subtypes.
    #[must_use]
    pub fn is_a(&self, name: &str, ancestor: &str) -> bool {
        let mut current = Some(name);
        while let Some(ty) = current {
            if ty == ancestor {
                return true;
            }
            current = self.supertype(ty);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_normalizes_slashes() {
        assert_eq!(ResourcePath::parse("/").unwrap().as_str(), "/");
        assert_eq!(ResourcePath::parse("//").unwrap().as_str(), "/");
        assert_eq!(ResourcePath::parse("/a//b/").unwrap().as_str(), "/a/b");
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert!(matches!(
            ResourcePath::parse("a/b"),
            Err(InvalidPath::NotAbsolute(_))
        ));
        assert!(matches!(
            ResourcePath::parse("/a/../b"),
            Err(InvalidPath::RelativeSegment(_))
        ));
    }

    #[test]
    fn test_parent_and_name() {
        let path = ResourcePath::parse("/a/b/c").unwrap();
        assert_eq!(path.name(), "c");
        assert_eq!(path.depth(), 3);
        assert_eq!(path.parent().unwrap().as_str(), "/a/b");
        assert_eq!(
            ResourcePath::parse("/a").unwrap().parent(),
            Some(ResourcePath::root())
        );
        assert_eq!(ResourcePath::root().parent(), None);
        assert_eq!(ResourcePath::root().name(), "");
    }

    #[test]
    fn test_ancestry() {
        let docs = ResourcePath::parse("/documents").unwrap();
        let foo = ResourcePath::parse("/documents/foo").unwrap();
        let lookalike = ResourcePath::parse("/documentsfoo").unwrap();

        assert!(docs.is_ancestor_of(&foo));
        assert!(!docs.is_ancestor_of(&docs));
        assert!(!docs.is_ancestor_of(&lookalike));
        assert!(ResourcePath::root().is_ancestor_of(&docs));
        assert!(foo.is_descendant_or_self_of(&docs));
        assert!(docs.is_descendant_or_self_of(&docs));
    }

    #[test]
    fn test_join() {
        let root = ResourcePath::root();
        assert_eq!(root.join("a").unwrap().as_str(), "/a");
        let a = root.join("a").unwrap();
        assert_eq!(a.join("b").unwrap().as_str(), "/a/b");
        assert!(a.join("..").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let path = ResourcePath::parse("/a/b").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/a/b\"");
        let parsed: ResourcePath = serde_json::from_str("\"/a//b/\"").unwrap();
        assert_eq!(parsed, path);
        assert!(serde_json::from_str::<ResourcePath>("\"relative\"").is_err());
    }

    #[test]
    fn test_resource_builder() {
        let resource = Resource::new(ResourcePath::parse("/docs").unwrap(), "folder")
            .collection()
            .read_restricted(true)
            .with_property("title", "Docs");
        assert!(resource.is_collection());
        assert!(resource.is_read_restricted());
        assert_eq!(resource.property("title"), Some("Docs"));
        assert_eq!(resource.property("missing"), None);
    }

    #[test]
    fn test_type_tree_rejects_unknown_supertype() {
        let result = ResourceTypeTree::new().with_type("article", Some("document"));
        assert!(result.is_err());
    }

    #[test]
    fn test_type_tree_rejects_redefinition() {
        let result = ResourceTypeTree::new()
            .with_type("resource", None)
            .and_then(|t| t.with_type("resource", None));
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(segments in proptest::collection::vec("[a-z0-9]{0,6}", 0..6)) {
            let raw = format!("/{}", segments.join("/"));
            let once = ResourcePath::parse(&raw).unwrap();
            let twice = ResourcePath::parse(once.as_str()).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.is_root() || !once.as_str().ends_with('/'));
        }
    }
}
