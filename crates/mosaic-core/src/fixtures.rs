//! Test fixtures for Mosaic development and testing.
//!
//! This module provides an in-memory [`Repository`] and a small sample
//! content tree that tests across the workspace share.
//!
//! # Example
//!
//! ```
//! use mosaic_core::fixtures;
//!
//! let repository = fixtures::sample_repository();
//! assert!(repository.contains("/documents/foo"));
//! ```

use crate::identity::{Principal, Token};
use crate::repository::{Repository, RepositoryError};
use crate::resource::{Privilege, Resource, ResourcePath, ResourceTypeTree};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::future::{ready, Future};

/// Group whose members may write in the in-memory repository.
pub const WRITERS_GROUP: &str = "editors";

/// In-memory repository with injectable locks and faults.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    resources: RwLock<BTreeMap<ResourcePath, Resource>>,
    locked: RwLock<HashSet<ResourcePath>>,
    faulty: RwLock<HashSet<ResourcePath>>,
    types: ResourceTypeTree,
}

impl InMemoryRepository {
    /// Creates an empty repository using the given type tree.
    #[must_use]
    pub fn new(types: ResourceTypeTree) -> Self {
        Self {
            types,
            ..Self::default()
        }
    }

    /// Stores (or replaces) a resource.
    pub fn store(&self, resource: Resource) {
        self.resources
            .write()
            .insert(resource.uri().clone(), resource);
    }

    /// Marks a path as locked; retrieval reports [`RepositoryError::Locked`].
    pub fn lock(&self, uri: &str) {
        self.locked.write().insert(path(uri));
    }

    /// Marks a path as faulty; retrieval reports [`RepositoryError::Failure`].
    pub fn fail(&self, uri: &str) {
        self.faulty.write().insert(path(uri));
    }

    /// Returns `true` if a resource is stored at `uri`.
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.resources.read().contains_key(&path(uri))
    }

    fn lookup(&self, uri: &ResourcePath) -> Result<Resource, RepositoryError> {
        if self.faulty.read().contains(uri) {
            return Err(RepositoryError::failure(format!("injected fault at {uri}")));
        }
        if self.locked.read().contains(uri) {
            return Err(RepositoryError::Locked { uri: uri.clone() });
        }
        self.resources
            .read()
            .get(uri)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound { uri: uri.clone() })
    }
}

impl Repository for InMemoryRepository {
    fn retrieve(
        &self,
        _token: &Token,
        uri: &ResourcePath,
        _for_processing: bool,
    ) -> impl Future<Output = Result<Resource, RepositoryError>> + Send {
        ready(self.lookup(uri))
    }

    fn list_children(
        &self,
        _token: &Token,
        uri: &ResourcePath,
    ) -> impl Future<Output = Result<Vec<Resource>, RepositoryError>> + Send {
        let result = self.lookup(uri).map(|_| {
            self.resources
                .read()
                .values()
                .filter(|r| r.uri().parent().as_ref() == Some(uri))
                .cloned()
                .collect()
        });
        ready(result)
    }

    fn exists(
        &self,
        _token: &Token,
        uri: &ResourcePath,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send {
        ready(Ok(self.resources.read().contains_key(uri)))
    }

    fn is_authorized(
        &self,
        resource: &Resource,
        action: Privilege,
        principal: Option<&Principal>,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send {
        let allowed = match action {
            Privilege::Read | Privilege::ReadProcessed => {
                !resource.is_read_restricted() || principal.is_some()
            }
            Privilege::Write | Privilege::All => {
                principal.is_some_and(|p| p.is_member_of(WRITERS_GROUP))
            }
        };
        ready(Ok(allowed))
    }

    fn type_tree(&self) -> &ResourceTypeTree {
        &self.types
    }
}

/// Parses a fixture path.
///
/// # Panics
///
/// Panics if `uri` is not a valid absolute path. Fixture paths are literals.
#[must_use]
pub fn path(uri: &str) -> ResourcePath {
    ResourcePath::parse(uri).unwrap_or_else(|e| panic!("invalid fixture path: {e}"))
}

/// Creates the sample type hierarchy:
///
/// ```text
/// resource
/// ├── collection
/// │   └── folder
/// └── document
///     └── article
/// ```
#[must_use]
pub fn sample_type_tree() -> ResourceTypeTree {
    let mut types = ResourceTypeTree::new();
    for (name, parent) in [
        ("resource", None),
        ("collection", Some("resource")),
        ("folder", Some("collection")),
        ("document", Some("resource")),
        ("article", Some("document")),
    ] {
        if let Err(e) = types.insert(name, parent) {
            panic!("sample type tree is inconsistent: {e}");
        }
    }
    types
}

/// Creates an article resource.
#[must_use]
pub fn article(uri: &str) -> Resource {
    Resource::new(path(uri), "article")
}

/// Creates a folder (collection) resource.
#[must_use]
pub fn folder(uri: &str) -> Resource {
    Resource::new(path(uri), "folder").collection()
}

/// Creates a repository holding the sample content tree:
///
/// ```text
/// /                    folder
/// /documents           folder
/// /documents/foo       article
/// /documents/bar       folder
/// /documents/secret    article (read restricted)
/// /other               folder
/// /other/x             article
/// ```
#[must_use]
pub fn sample_repository() -> InMemoryRepository {
    let repository = InMemoryRepository::new(sample_type_tree());
    for resource in [
        folder("/"),
        folder("/documents"),
        article("/documents/foo").with_property("title", "Foo"),
        folder("/documents/bar"),
        article("/documents/secret").read_restricted(true),
        folder("/other"),
        article("/other/x"),
    ] {
        repository.store(resource);
    }
    repository
}

/// Creates a principal who is a member of the writers group.
#[must_use]
pub fn editor() -> Principal {
    Principal::new("alice")
        .with_domain("example.org")
        .with_group(WRITERS_GROUP)
}

/// Creates a principal without group memberships.
#[must_use]
pub fn reader() -> Principal {
    Principal::new("bob").with_domain("example.org")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> Token {
        Token::new("test")
    }

    #[test]
    fn test_retrieve_existing() {
        let repository = sample_repository();
        let resource = tokio_test::block_on(repository.retrieve(
            &token(),
            &path("/documents/foo"),
            false,
        ))
        .unwrap();
        assert_eq!(resource.resource_type(), "article");
        assert_eq!(resource.property("title"), Some("Foo"));
    }

    #[test]
    fn test_retrieve_missing_is_not_found() {
        let repository = sample_repository();
        let err = tokio_test::block_on(repository.retrieve(&token(), &path("/nope"), false))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_injected_lock_and_fault() {
        let repository = sample_repository();
        repository.lock("/documents/foo");
        repository.fail("/other/x");

        let locked = tokio_test::block_on(repository.retrieve(
            &token(),
            &path("/documents/foo"),
            false,
        ));
        assert!(matches!(locked, Err(RepositoryError::Locked { .. })));

        let faulty = tokio_test::block_on(repository.retrieve(&token(), &path("/other/x"), false));
        assert!(matches!(faulty, Err(RepositoryError::Failure { .. })));
    }

    #[test]
    fn test_list_children() {
        let repository = sample_repository();
        let children =
            tokio_test::block_on(repository.list_children(&token(), &path("/documents"))).unwrap();
        let names: Vec<_> = children.iter().map(|r| r.uri().name().to_string()).collect();
        assert_eq!(names, vec!["bar", "foo", "secret"]);
    }

    #[test]
    fn test_is_authorized() {
        let repository = sample_repository();
        let secret = article("/documents/secret").read_restricted(true);

        let anonymous =
            tokio_test::block_on(repository.is_authorized(&secret, Privilege::Read, None)).unwrap();
        assert!(!anonymous);

        let reader = reader();
        let read = tokio_test::block_on(repository.is_authorized(
            &secret,
            Privilege::Read,
            Some(&reader),
        ))
        .unwrap();
        assert!(read);

        let write = tokio_test::block_on(repository.is_authorized(
            &secret,
            Privilege::Write,
            Some(&reader),
        ))
        .unwrap();
        assert!(!write);

        let editor = editor();
        let write = tokio_test::block_on(repository.is_authorized(
            &secret,
            Privilege::Write,
            Some(&editor),
        ))
        .unwrap();
        assert!(write);
    }

    #[test]
    fn test_sample_types() {
        let types = sample_type_tree();
        assert!(types.is_a("article", "document"));
        assert!(types.is_a("folder", "resource"));
        assert!(!types.is_a("folder", "document"));
    }
}
