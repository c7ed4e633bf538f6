//! Building a resolver from configuration.
//!
//! Configuration records are turned into router types here, so the router
//! never sees raw configuration and the configuration crate never depends
//! on the router.

use mosaic_config::{
    AssertionConfig, MosaicConfig, PostProcessorConfig, ServiceConfig, WebConfig,
};
use mosaic_core::{MosaicError, MosaicResult, Repository, ResourcePath, ResourceTypeTree, Token};
use mosaic_router::assertion::{
    AlwaysAssertion, HostNameAssertion, InvertAssertion, MethodAssertion, PrincipalAssertion,
    PropertyAssertion, ProtocolAssertion, ResourceTypeAssertion, UriExactAssertion,
    UriPrefixAssertion, UriRegexAssertion,
};
use mosaic_router::{
    Assertion, ParameterPostProcessor, Protocol, QueryParams, SelectiveHttpsPostProcessor,
    ServiceDefinition, ServiceOrder, ServiceResolver, ServiceTree, ServiceTreeBuilder,
    UrlDefaults,
};
use mosaic_telemetry::{TelemetryGuard, TelemetryResult};
use std::sync::Arc;
use tracing::info;

/// Validates `config` and builds a resolver over `repository`.
///
/// The repository's type tree backs every `resource_type` assertion.
///
/// # Errors
///
/// Returns [`MosaicError::Configuration`] if validation fails or the tree
/// cannot be built.
pub fn bootstrap<R: Repository>(
    config: &MosaicConfig,
    repository: Arc<R>,
) -> MosaicResult<ServiceResolver<R>> {
    config
        .validate()
        .map_err(|e| MosaicError::configuration(e.to_string()))?;
    let types = Arc::new(repository.type_tree().clone());
    let tree = build_tree(config, &types)?;
    info!(services = tree.len(), "service tree built");

    Ok(ServiceResolver::new(tree, repository)
        .with_strip_prefixes(config.web.strip_prefixes.iter().cloned())
        .with_trusted_token(Token::new(config.web.trusted_token.clone())))
}

/// Installs logging and metrics from the telemetry section.
///
/// # Errors
///
/// See [`mosaic_telemetry::init_telemetry`].
pub fn init_telemetry(config: &MosaicConfig) -> TelemetryResult<TelemetryGuard> {
    mosaic_telemetry::init_telemetry(&config.telemetry.to_telemetry_config())
}

/// Builds the service tree described by `config.services`.
///
/// # Errors
///
/// Returns [`MosaicError::Configuration`] for invalid records, unknown
/// parents and parent cycles.
pub fn build_tree(
    config: &MosaicConfig,
    types: &Arc<ResourceTypeTree>,
) -> MosaicResult<ServiceTree> {
    let mut builder = ServiceTreeBuilder::new().with_defaults(url_defaults(&config.web)?);
    for service in &config.services {
        builder.add(service_definition(service, types)?)?;
    }
    builder.build()
}

/// Converts the web section into URL defaults.
///
/// # Errors
///
/// Returns [`MosaicError::Configuration`] for unknown protocol names.
pub fn url_defaults(web: &WebConfig) -> MosaicResult<UrlDefaults> {
    let mut defaults = UrlDefaults::new();
    if let Some(host) = web.fixed_host() {
        defaults = defaults.with_host(host);
    }
    if let Some(protocol) = web.fixed_protocol() {
        defaults = defaults.with_protocol(protocol_named(protocol)?);
    }
    if let Some(protocol) = &web.restricted_protocol {
        defaults = defaults.with_restricted_protocol(protocol_named(protocol)?);
    }
    if let Some(port) = web.port.fixed() {
        defaults = defaults.with_port(port);
    }
    Ok(defaults)
}

/// Builds one assertion.
///
/// # Errors
///
/// Returns [`MosaicError::Configuration`] if the record is invalid, such as
/// an unknown resource type or an inverted URL writer.
pub fn build_assertion(
    config: &AssertionConfig,
    types: &Arc<ResourceTypeTree>,
) -> MosaicResult<Arc<dyn Assertion>> {
    let assertion: Arc<dyn Assertion> = match config {
        AssertionConfig::Always => Arc::new(AlwaysAssertion),
        AssertionConfig::UriExact { path } => Arc::new(UriExactAssertion::new(path_named(path)?)),
        AssertionConfig::UriPrefix { prefix } => {
            Arc::new(UriPrefixAssertion::new(path_named(prefix)?))
        }
        AssertionConfig::UriRegex { pattern } => Arc::new(UriRegexAssertion::new(pattern)?),
        AssertionConfig::Method { methods } => Arc::new(MethodAssertion::from_names(methods)?),
        AssertionConfig::Protocol {
            protocol,
            prefer_request_protocol,
        } => {
            let assertion = if protocol == mosaic_config::WILDCARD {
                ProtocolAssertion::any()
            } else {
                ProtocolAssertion::new(protocol_named(protocol)?)
            };
            Arc::new(assertion.prefer_request_protocol(*prefer_request_protocol))
        }
        AssertionConfig::HostName {
            hosts,
            default_host,
        } => {
            let mut assertion = HostNameAssertion::new(hosts)?;
            if let Some(host) = default_host {
                assertion = assertion.with_default_host(host);
            }
            Arc::new(assertion)
        }
        AssertionConfig::ResourceType {
            resource_type,
            exact,
        } => Arc::new(
            ResourceTypeAssertion::new(resource_type, Arc::clone(types))?.exact(*exact),
        ),
        AssertionConfig::Property { name, value } => Arc::new(match value {
            Some(value) => PropertyAssertion::equals(name, value)?,
            None => PropertyAssertion::exists(name)?,
        }),
        AssertionConfig::Principal {
            principals,
            groups,
            require_authentication,
        } => {
            let assertion = principals
                .iter()
                .fold(PrincipalAssertion::authenticated(), |a, p| a.with_principal(p));
            let assertion = groups.iter().fold(assertion, |a, g| a.with_group(g));
            Arc::new(assertion.require_authentication(*require_authentication))
        }
        AssertionConfig::Invert { assertion } => {
            Arc::new(InvertAssertion::new(build_assertion(assertion, types)?)?)
        }
    };
    Ok(assertion)
}

fn service_definition(
    config: &ServiceConfig,
    types: &Arc<ResourceTypeTree>,
) -> MosaicResult<ServiceDefinition> {
    let order = config
        .order
        .position()
        .map_or(ServiceOrder::Unordered, ServiceOrder::Ordered);
    let mut definition = ServiceDefinition::new(&config.name).order(order);
    if let Some(parent) = &config.parent {
        definition = definition.parent(parent);
    }
    if let Some(handler) = &config.handler {
        definition = definition.handler(handler);
    }
    for (name, value) in &config.attributes {
        definition = definition.attribute(name, value.clone());
    }
    for interceptor in &config.interceptors {
        definition = definition.interceptor(interceptor);
    }
    for assertion in &config.assertions {
        definition = definition.shared_assertion(build_assertion(assertion, types)?);
    }
    for processor in &config.post_processors {
        definition = match processor {
            PostProcessorConfig::SelectiveHttps => {
                definition.post_processor(SelectiveHttpsPostProcessor::new())
            }
            PostProcessorConfig::Parameters { params } => {
                let params: QueryParams = params
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str()))
                    .collect();
                definition.post_processor(ParameterPostProcessor::new(params))
            }
        };
    }
    Ok(definition)
}

fn protocol_named(name: &str) -> MosaicResult<Protocol> {
    name.parse()
        .map_err(|_| MosaicError::configuration(format!("unsupported protocol '{name}'")))
}

fn path_named(path: &str) -> MosaicResult<ResourcePath> {
    ResourcePath::parse(path)
        .map_err(|e| MosaicError::configuration(format!("invalid path '{path}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_config::PortSetting;
    use mosaic_core::fixtures;

    fn types() -> Arc<ResourceTypeTree> {
        Arc::new(fixtures::sample_type_tree())
    }

    #[test]
    fn test_url_defaults_from_web() {
        let web = WebConfig {
            host: "cms.example.org".to_string(),
            protocol: "http".to_string(),
            restricted_protocol: Some("https".to_string()),
            port: PortSetting::Number(8080),
            ..WebConfig::default()
        };
        let defaults = url_defaults(&web).unwrap();
        assert_eq!(defaults.host(), Some("cms.example.org"));
        assert_eq!(defaults.protocol(), Some(Protocol::Http));
        assert_eq!(defaults.restricted_protocol(), Some(Protocol::Https));
        assert_eq!(defaults.port(), Some(8080));

        let wildcard = url_defaults(&WebConfig::default()).unwrap();
        assert_eq!(wildcard.host(), None);
        assert_eq!(wildcard.protocol(), None);
        assert_eq!(wildcard.port(), None);
    }

    #[test]
    fn test_assertion_kinds() {
        let cases = [
            (AssertionConfig::Always, "always"),
            (
                AssertionConfig::UriPrefix {
                    prefix: "/documents".to_string(),
                },
                "uri_prefix",
            ),
            (
                AssertionConfig::Method {
                    methods: vec!["get".to_string()],
                },
                "method",
            ),
            (
                AssertionConfig::Protocol {
                    protocol: "*".to_string(),
                    prefer_request_protocol: true,
                },
                "protocol",
            ),
            (
                AssertionConfig::Property {
                    name: "title".to_string(),
                    value: None,
                },
                "property",
            ),
        ];
        for (config, kind) in cases {
            assert_eq!(build_assertion(&config, &types()).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_unknown_resource_type_rejected() {
        let config = AssertionConfig::ResourceType {
            resource_type: "image".to_string(),
            exact: false,
        };
        let err = build_assertion(&config, &types()).unwrap_err();
        assert!(matches!(err, MosaicError::Configuration { .. }));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let config = AssertionConfig::UriRegex {
            pattern: "(".to_string(),
        };
        assert!(build_assertion(&config, &types()).is_err());
    }

    #[test]
    fn test_unordered_service() {
        let mut config = ServiceConfig::new("fallback");
        config.order = mosaic_config::OrderConfig::Keyword("unordered".to_string());
        let mosaic = MosaicConfig::builder().service(config).build();
        let tree = build_tree(&mosaic, &types()).unwrap();
        assert_eq!(
            tree.service("fallback").unwrap().order(),
            ServiceOrder::Unordered
        );
    }
}
