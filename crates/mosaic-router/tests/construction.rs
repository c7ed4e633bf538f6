//! URL construction, and resolving constructed URLs back to their service.

use http::Request;
use mosaic_core::fixtures::{self, InMemoryRepository};
use mosaic_core::{MosaicError, Resource};
use mosaic_router::assertion::{
    AlwaysAssertion, HostNameAssertion, InvertAssertion, ProtocolAssertion,
    ResourceTypeAssertion, UriPrefixAssertion, ANY_HOST,
};
use mosaic_router::{
    Protocol, RequestContext, SelectiveHttpsPostProcessor, Service, ServiceDefinition,
    ServiceResolver, ServiceTree, ServiceTreeBuilder, Url, UrlDefaults, UrlPostProcessor,
};
use proptest::prelude::*;
use std::sync::Arc;

fn defaults() -> UrlDefaults {
    UrlDefaults::new()
        .with_host("cms.example.org")
        .with_protocol(Protocol::Http)
}

fn builder() -> ServiceTreeBuilder {
    let types = Arc::new(fixtures::sample_type_tree());
    let mut builder = ServiceTreeBuilder::new().with_defaults(defaults());
    builder
        .add(ServiceDefinition::new("site").assertion(AlwaysAssertion))
        .unwrap()
        .add(
            ServiceDefinition::new("documents")
                .parent("site")
                .assertion(UriPrefixAssertion::new(fixtures::path("/documents"))),
        )
        .unwrap()
        .add(
            ServiceDefinition::new("article")
                .parent("documents")
                .assertion(ResourceTypeAssertion::new("article", types).unwrap()),
        )
        .unwrap();
    builder
}

fn tree() -> ServiceTree {
    builder().build().unwrap()
}

#[test]
fn test_prefix_service_links_inside_prefix_only() {
    let tree = tree();

    let err = tree
        .construct_url("documents", &fixtures::article("/other/x"), None)
        .unwrap_err();
    assert!(err.is_not_linkable());
    assert!(matches!(err, MosaicError::NotLinkable { ref service, .. } if service == "documents"));

    let url = tree
        .construct_url("documents", &fixtures::article("/documents/x"), None)
        .unwrap();
    assert_eq!(url.path().as_str(), "/documents/x");
    assert_eq!(url.to_string(), "http://cms.example.org/documents/x");
}

#[test]
fn test_canonical_url_ignores_assertions() {
    let tree = tree();
    let article = tree.service("article").unwrap();
    let folder = fixtures::folder("/other/bar");
    assert!(article.construct_url(&folder, None).unwrap_err().is_not_linkable());
    assert_eq!(
        article.construct_canonical_url(&folder).to_string(),
        "http://cms.example.org/other/bar/"
    );
    assert_eq!(
        article
            .construct_canonical_url_for_path(&fixtures::path("/other/x"))
            .to_string(),
        "http://cms.example.org/other/x"
    );
}

#[test]
fn test_collections_get_trailing_slash() {
    let url = tree()
        .construct_url("documents", &fixtures::folder("/documents/bar"), None)
        .unwrap();
    assert_eq!(url.to_string(), "http://cms.example.org/documents/bar/");
}

#[test]
fn test_ancestor_assertions_are_replayed() {
    // "article" accepts /other/x on its own, but its parent does not
    let err = tree()
        .construct_url("article", &fixtures::article("/other/x"), None)
        .unwrap_err();
    assert!(err.is_not_linkable());
}

#[test]
fn test_without_matching_writers_still_contribute() {
    let mut builder = ServiceTreeBuilder::new().with_defaults(defaults());
    builder
        .add(
            ServiceDefinition::new("secure")
                .assertion(ProtocolAssertion::new(Protocol::Https))
                .assertion(HostNameAssertion::new(["secure.example.org"]).unwrap())
                .assertion(UriPrefixAssertion::new(fixtures::path("/documents"))),
        )
        .unwrap();
    let tree = builder.build().unwrap();
    let service = tree.service("secure").unwrap();

    let resource = fixtures::article("/other/x");
    assert!(service.construct_link(&resource, None, true).is_err());
    assert_eq!(
        service.construct_link(&resource, None, false).unwrap(),
        "https://secure.example.org/other/x"
    );
}

#[tokio::test]
async fn test_constructed_url_resolves_to_its_service() {
    let resolver = ServiceResolver::new(tree(), Arc::new(fixtures::sample_repository()));
    let url = resolver
        .tree()
        .construct_url("article", &fixtures::article("/documents/foo"), None)
        .unwrap();

    let request = Request::builder().uri(url.to_string()).body(()).unwrap();
    let ctx = resolver.resolve(&request, None, None).await.unwrap();
    assert_eq!(ctx.service().name(), "article");
    assert_eq!(ctx.uri(), url.path());
    assert_eq!(ctx.request().host(), "cms.example.org");
}

#[tokio::test]
async fn test_wildcards_follow_current_request() {
    let types = Arc::new(fixtures::sample_type_tree());
    let mut builder = ServiceTreeBuilder::new();
    builder
        .add(
            ServiceDefinition::new("article")
                .assertion(HostNameAssertion::new([ANY_HOST]).unwrap())
                .assertion(ProtocolAssertion::any().prefer_request_protocol(true))
                .assertion(ResourceTypeAssertion::new("article", types).unwrap()),
        )
        .unwrap();
    let resolver: ServiceResolver<InMemoryRepository> =
        ServiceResolver::new(builder.build().unwrap(), Arc::new(fixtures::sample_repository()));

    let request = Request::builder()
        .uri("/documents/foo")
        .header(http::header::HOST, "intranet.example.org:8443")
        .header("x-forwarded-proto", "https")
        .body(())
        .unwrap();
    let link = resolver
        .dispatch(&request, None, None, |ctx| async move {
            ctx.service()
                .construct_link(&fixtures::article("/other/x"), None, true)
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link, "https://intranet.example.org:8443/other/x");
}

#[tokio::test]
async fn test_restricted_protocol_ignores_request_port() {
    let defaults = UrlDefaults::new().with_restricted_protocol(Protocol::Https);
    let mut builder = ServiceTreeBuilder::new().with_defaults(defaults);
    builder
        .add(ServiceDefinition::new("site").assertion(AlwaysAssertion))
        .unwrap();
    let resolver: ServiceResolver<InMemoryRepository> =
        ServiceResolver::new(builder.build().unwrap(), Arc::new(fixtures::sample_repository()));

    let request = Request::builder()
        .uri("http://cms.example.org/secret")
        .body(())
        .unwrap();
    let (secret, public) = resolver
        .dispatch(&request, None, None, |ctx| async move {
            let service = ctx.service();
            let secret = fixtures::article("/secret").read_restricted(true);
            (
                service.construct_link(&secret, None, true).unwrap(),
                service
                    .construct_link(&fixtures::article("/other/x"), None, true)
                    .unwrap(),
            )
        })
        .await
        .unwrap();
    assert_eq!(secret, "https://cms.example.org/secret");
    assert_eq!(public, "http://cms.example.org/other/x");
    assert_eq!(Url::parse(&secret).unwrap().effective_port(), 443);
}

#[tokio::test]
async fn test_protocol_assertion_drops_request_port() {
    let mut builder = ServiceTreeBuilder::new();
    builder
        .add(ServiceDefinition::new("site").assertion(AlwaysAssertion))
        .unwrap()
        .add(
            ServiceDefinition::new("plain")
                .parent("site")
                .assertion(ProtocolAssertion::new(Protocol::Http)),
        )
        .unwrap();
    let resolver: ServiceResolver<InMemoryRepository> =
        ServiceResolver::new(builder.build().unwrap(), Arc::new(fixtures::sample_repository()));
    let tree = Arc::clone(resolver.tree());

    let request = Request::builder()
        .uri("https://cms.example.org:8443/other")
        .body(())
        .unwrap();
    let (site, plain) = resolver
        .dispatch(&request, None, None, move |ctx| async move {
            let resource = fixtures::article("/other/x");
            (
                ctx.service().construct_link(&resource, None, true).unwrap(),
                tree.construct_url("plain", &resource, None).unwrap().to_string(),
            )
        })
        .await
        .unwrap();
    assert_eq!(site, "https://cms.example.org:8443/other/x");
    assert_eq!(plain, "http://cms.example.org/other/x");
}

#[test]
fn test_selective_https_by_read_restriction() {
    let mut builder = builder();
    builder
        .add(
            ServiceDefinition::new("view")
                .parent("article")
                .post_processor(SelectiveHttpsPostProcessor::new()),
        )
        .unwrap();
    let tree = builder.build().unwrap();

    let public = tree
        .construct_url("view", &fixtures::article("/documents/foo"), None)
        .unwrap();
    assert_eq!(public.protocol(), Protocol::Http);

    let secret = fixtures::article("/documents/secret").read_restricted(true);
    let restricted = tree.construct_url("view", &secret, None).unwrap();
    assert_eq!(restricted.to_string(), "https://cms.example.org/documents/secret");
}

#[derive(Debug)]
struct Rejecting;

impl UrlPostProcessor for Rejecting {
    fn process(
        &self,
        _url: &mut Url,
        service: &Service,
        _resource: Option<&Resource>,
    ) -> anyhow::Result<()> {
        anyhow::bail!("signing key unavailable for {}", service.name())
    }
}

#[test]
fn test_post_processor_failure_is_fatal() {
    let mut builder = builder();
    builder
        .add(
            ServiceDefinition::new("signed")
                .parent("documents")
                .post_processor(Rejecting),
        )
        .unwrap();
    let tree = builder.build().unwrap();

    let err = tree
        .construct_url("signed", &fixtures::article("/documents/foo"), None)
        .unwrap_err();
    assert!(matches!(err, MosaicError::PostProcessor { .. }));
    assert!(!err.is_not_linkable());

    // a failing post-processor is not skipped like a non-linkable service
    let result = tree.first_linkable(
        ["signed", "documents"],
        &fixtures::article("/documents/foo"),
        None,
    );
    assert!(result.is_err());
}

#[test]
fn test_first_linkable_skips_rejecting_services() {
    let tree = tree();
    let folder = fixtures::folder("/documents/bar");
    let (service, url) = tree
        .first_linkable(["article", "documents", "site"], &folder, None)
        .unwrap()
        .unwrap();
    assert_eq!(service.name(), "documents");
    assert_eq!(url.path().as_str(), "/documents/bar");

    let other = fixtures::folder("/other");
    assert!(tree
        .first_linkable(["article", "documents"], &other, None)
        .unwrap()
        .is_none());
}

#[test]
fn test_inverted_url_writer_is_rejected() {
    let err = InvertAssertion::new(Arc::new(ProtocolAssertion::new(Protocol::Https))).unwrap_err();
    assert!(matches!(err, MosaicError::Configuration { .. }));

    let not_documents =
        InvertAssertion::new(Arc::new(UriPrefixAssertion::new(fixtures::path("/documents"))))
            .unwrap();
    let mut builder = ServiceTreeBuilder::new().with_defaults(defaults());
    builder
        .add(ServiceDefinition::new("outside").assertion(not_documents))
        .unwrap();
    let tree = builder.build().unwrap();
    assert!(tree
        .construct_url("outside", &fixtures::article("/documents/foo"), None)
        .unwrap_err()
        .is_not_linkable());
    assert!(tree
        .construct_url("outside", &fixtures::article("/other/x"), None)
        .is_ok());
}

#[test]
fn test_template_urls_need_no_resource() {
    let tree = tree();
    let url = tree
        .service("article")
        .unwrap()
        .construct_url_for_path(&fixtures::path("/documents/new"))
        .unwrap();
    assert_eq!(url.to_string(), "http://cms.example.org/documents/new");
    assert!(!RequestContext::is_active());
}

proptest! {
    #[test]
    fn prop_constructed_documents_urls_resolve_back(
        segments in prop::collection::vec("[a-z0-9][a-z0-9 _-]{0,11}", 1..4)
    ) {
        let tree = tree();
        let uri = format!("/documents/{}", segments.join("/"));
        let resource = Resource::new(fixtures::path(&uri), "folder").collection();

        let url = tree.construct_url("documents", &resource, None).unwrap();
        let parsed = Url::parse(&url.to_string()).unwrap();
        prop_assert_eq!(parsed.path(), resource.uri());
        prop_assert!(parsed.is_collection());
    }
}
