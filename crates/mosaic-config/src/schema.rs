//! Configuration schema types.
//!
//! Every section rejects unknown fields. Services are a flat list of
//! records linked by parent name; the tree is assembled and checked for
//! cycles when the configuration is validated.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use mosaic_telemetry::LogFormat;

/// Wildcard accepted for host, protocol and port.
pub const WILDCARD: &str = "*";

/// Protocol names accepted in configuration.
pub const PROTOCOLS: [&str; 2] = ["http", "https"];

/// Canonical URL settings.
///
/// `*` means "take it from the current request".
///
/// # Example
///
/// ```
/// use mosaic_config::{PortSetting, WebConfig};
///
/// let web = WebConfig {
///     host: "www.example.org".to_string(),
///     port: PortSetting::Number(8080),
///     ..Default::default()
/// };
/// assert_eq!(web.port.fixed(), Some(8080));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WebConfig {
    /// Host name for constructed URLs, or `*`.
    #[serde(default = "default_wildcard")]
    pub host: String,

    /// `http`, `https` or `*`.
    #[serde(default = "default_wildcard")]
    pub protocol: String,

    /// Protocol for read-restricted resources; unset uses `protocol`.
    #[serde(default)]
    pub restricted_protocol: Option<String>,

    /// Port for constructed URLs, or `*`.
    #[serde(default)]
    pub port: PortSetting,

    /// Request-path prefixes removed before resolution.
    #[serde(default)]
    pub strip_prefixes: Vec<String>,

    /// Token used to retrieve the addressed resource.
    #[serde(default = "default_trusted_token")]
    pub trusted_token: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_wildcard(),
            protocol: default_wildcard(),
            restricted_protocol: None,
            port: PortSetting::default(),
            strip_prefixes: Vec::new(),
            trusted_token: default_trusted_token(),
        }
    }
}

impl WebConfig {
    /// Returns the fixed host, `None` for the wildcard.
    #[must_use]
    pub fn fixed_host(&self) -> Option<&str> {
        (self.host != WILDCARD).then_some(self.host.as_str())
    }

    /// Returns the fixed protocol name, `None` for the wildcard.
    #[must_use]
    pub fn fixed_protocol(&self) -> Option<&str> {
        (self.protocol != WILDCARD).then_some(self.protocol.as_str())
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::invalid_value("web.host", "must not be empty"));
        }
        if self.host.contains([':', '/']) {
            return Err(ConfigError::invalid_value(
                "web.host",
                format!("'{}' must be a bare host name; set the port separately", self.host),
            ));
        }
        if self.protocol != WILDCARD {
            check_protocol("web.protocol", &self.protocol)?;
        }
        if let Some(protocol) = &self.restricted_protocol {
            check_protocol("web.restricted_protocol", protocol)?;
        }
        self.port.validate("web.port")?;
        for (i, prefix) in self.strip_prefixes.iter().enumerate() {
            if !prefix.starts_with('/') {
                return Err(ConfigError::invalid_value(
                    format!("web.strip_prefixes[{i}]"),
                    format!("'{prefix}' must start with '/'"),
                ));
            }
        }
        if self.trusted_token.is_empty() {
            return Err(ConfigError::invalid_value("web.trusted_token", "must not be empty"));
        }
        Ok(())
    }
}

fn default_wildcard() -> String {
    WILDCARD.to_string()
}

fn default_trusted_token() -> String {
    "trusted".to_string()
}

fn check_protocol(field: &str, protocol: &str) -> Result<(), ConfigError> {
    if PROTOCOLS.contains(&protocol) {
        Ok(())
    } else {
        Err(ConfigError::invalid_value(
            field,
            format!("expected 'http' or 'https', got '{protocol}'"),
        ))
    }
}

/// A port number or the `*` wildcard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PortSetting {
    /// Fixed port.
    Number(u16),
    /// Must be `*`.
    Text(String),
}

impl Default for PortSetting {
    fn default() -> Self {
        Self::Text(WILDCARD.to_string())
    }
}

impl PortSetting {
    /// Returns the fixed port, `None` for the wildcard.
    #[must_use]
    pub fn fixed(&self) -> Option<u16> {
        match self {
            Self::Number(port) => Some(*port),
            Self::Text(_) => None,
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match self {
            Self::Number(0) => Err(ConfigError::invalid_value(field, "port 0 is not allowed")),
            Self::Text(text) if text != WILDCARD => Err(ConfigError::invalid_value(
                field,
                format!("expected a port number or '*', got '{text}'"),
            )),
            _ => Ok(()),
        }
    }
}

/// Sibling order of a service: a number, or `"unordered"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OrderConfig {
    /// Lower values are tried first.
    Position(i32),
    /// Must be `"unordered"`.
    Keyword(String),
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self::Position(0)
    }
}

impl OrderConfig {
    /// Keyword for services tried after all ordered siblings.
    pub const UNORDERED: &'static str = "unordered";

    /// Returns the position, `None` for unordered services.
    #[must_use]
    pub fn position(&self) -> Option<i32> {
        match self {
            Self::Position(position) => Some(*position),
            Self::Keyword(_) => None,
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match self {
            Self::Keyword(keyword) if keyword != Self::UNORDERED => Err(ConfigError::invalid_value(
                field,
                format!("expected a number or 'unordered', got '{keyword}'"),
            )),
            _ => Ok(()),
        }
    }
}

/// One service record.
///
/// ```toml
/// [[services]]
/// name = "article"
/// parent = "documents"
/// order = 10
/// handler = "article-view"
/// assertions = [{ type = "resource_type", resource_type = "article" }]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Unique service name.
    pub name: String,

    /// Parent service name; unset for roots.
    #[serde(default)]
    pub parent: Option<String>,

    /// Sibling order.
    #[serde(default)]
    pub order: OrderConfig,

    /// Handler reference.
    #[serde(default)]
    pub handler: Option<String>,

    /// Free-form attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,

    /// Interceptor references, in addition to the inherited ones.
    #[serde(default)]
    pub interceptors: Vec<String>,

    /// Guards, evaluated in order.
    #[serde(default)]
    pub assertions: Vec<AssertionConfig>,

    /// URL post-processors, after the inherited ones.
    #[serde(default)]
    pub post_processors: Vec<PostProcessorConfig>,
}

impl ServiceConfig {
    /// Creates a root service record without assertions.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            order: OrderConfig::default(),
            handler: None,
            attributes: BTreeMap::new(),
            interceptors: Vec::new(),
            assertions: Vec::new(),
            post_processors: Vec::new(),
        }
    }

    pub(crate) fn validate(&self, field: &str) -> Result<(), ConfigError> {
        self.order.validate(&format!("{field}.order"))?;
        for (i, assertion) in self.assertions.iter().enumerate() {
            assertion.validate(&format!("{field}.assertions[{i}]"))?;
        }
        Ok(())
    }
}

/// Assertion records, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AssertionConfig {
    /// Always matches.
    Always,

    /// Exact resource path.
    UriExact {
        /// Absolute path.
        path: String,
    },

    /// Resource path at or below a prefix.
    UriPrefix {
        /// Absolute path prefix.
        prefix: String,
    },

    /// Resource path matching a regular expression.
    UriRegex {
        /// Regular expression.
        pattern: String,
    },

    /// Request method.
    Method {
        /// Allowed method names.
        methods: Vec<String>,
    },

    /// Request protocol.
    Protocol {
        /// `http`, `https` or `*`.
        protocol: String,
        /// With `*`, construct URLs with the current request's protocol.
        #[serde(default)]
        prefer_request_protocol: bool,
    },

    /// Request host.
    HostName {
        /// Accepted host names; `*` accepts any.
        hosts: Vec<String>,
        /// Host written into constructed URLs; defaults to the first host.
        #[serde(default)]
        default_host: Option<String>,
    },

    /// Resource type.
    ResourceType {
        /// Type name.
        resource_type: String,
        /// Reject subtypes.
        #[serde(default)]
        exact: bool,
    },

    /// Resource property presence or value.
    Property {
        /// Property name.
        name: String,
        /// Required value; unset only requires presence.
        #[serde(default)]
        value: Option<String>,
    },

    /// Principal identity or group membership.
    Principal {
        /// Accepted principal names.
        #[serde(default)]
        principals: Vec<String>,
        /// Accepted groups.
        #[serde(default)]
        groups: Vec<String>,
        /// Fail anonymous requests instead of not matching.
        #[serde(default)]
        require_authentication: bool,
    },

    /// Negation of a predicate assertion.
    Invert {
        /// The negated assertion; must not write URL parts.
        assertion: Box<AssertionConfig>,
    },
}

impl AssertionConfig {
    /// Returns the `type` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::UriExact { .. } => "uri_exact",
            Self::UriPrefix { .. } => "uri_prefix",
            Self::UriRegex { .. } => "uri_regex",
            Self::Method { .. } => "method",
            Self::Protocol { .. } => "protocol",
            Self::HostName { .. } => "host_name",
            Self::ResourceType { .. } => "resource_type",
            Self::Property { .. } => "property",
            Self::Principal { .. } => "principal",
            Self::Invert { .. } => "invert",
        }
    }

    /// Returns `true` for assertions that write URL parts during
    /// construction.
    #[must_use]
    pub const fn writes_url(&self) -> bool {
        matches!(
            self,
            Self::UriExact { .. } | Self::Protocol { .. } | Self::HostName { .. }
        )
    }

    pub(crate) fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match self {
            Self::Always => Ok(()),
            Self::UriExact { path } => check_path(&format!("{field}.path"), path),
            Self::UriPrefix { prefix } => check_path(&format!("{field}.prefix"), prefix),
            Self::UriRegex { pattern } => non_empty(&format!("{field}.pattern"), pattern),
            Self::Method { methods } => {
                if methods.is_empty() {
                    return Err(ConfigError::invalid_value(
                        format!("{field}.methods"),
                        "at least one method is required",
                    ));
                }
                Ok(())
            }
            Self::Protocol { protocol, .. } => {
                if protocol == WILDCARD {
                    Ok(())
                } else {
                    check_protocol(&format!("{field}.protocol"), protocol)
                }
            }
            Self::HostName { hosts, .. } => {
                if hosts.is_empty() || hosts.iter().any(String::is_empty) {
                    return Err(ConfigError::invalid_value(
                        format!("{field}.hosts"),
                        "at least one non-empty host is required",
                    ));
                }
                Ok(())
            }
            Self::ResourceType { resource_type, .. } => {
                non_empty(&format!("{field}.resource_type"), resource_type)
            }
            Self::Property { name, .. } => non_empty(&format!("{field}.name"), name),
            Self::Principal { .. } => Ok(()),
            Self::Invert { assertion } => {
                if assertion.writes_url() {
                    return Err(ConfigError::invalid_value(
                        format!("{field}.assertion"),
                        format!("'{}' writes URL parts and cannot be inverted", assertion.kind()),
                    ));
                }
                assertion.validate(&format!("{field}.assertion"))
            }
        }
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        Err(ConfigError::invalid_value(field, "must not be empty"))
    } else {
        Ok(())
    }
}

fn check_path(field: &str, path: &str) -> Result<(), ConfigError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(ConfigError::invalid_value(
            field,
            format!("'{path}' must be an absolute path"),
        ))
    }
}

/// URL post-processor records, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum PostProcessorConfig {
    /// HTTPS for read-restricted resources, HTTP otherwise.
    SelectiveHttps,

    /// Fixed query parameters.
    Parameters {
        /// Parameter names and values.
        params: BTreeMap<String, String>,
    },
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Colour pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include file and line.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable the Prometheus recorder.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Scrape endpoint address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Name reported in logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl TelemetrySection {
    /// Converts the section into the telemetry crate's configuration.
    #[must_use]
    pub fn to_telemetry_config(&self) -> mosaic_telemetry::TelemetryConfig {
        let logging = mosaic_telemetry::LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            format: self.logging.format,
            ansi: self.logging.ansi_enabled,
            include_location: self.logging.include_location,
            ..mosaic_telemetry::LogConfig::default()
        };
        let metrics = mosaic_telemetry::MetricsConfig {
            enabled: self.metrics.enabled,
            addr: self.metrics.addr.clone(),
            ..mosaic_telemetry::MetricsConfig::default()
        };
        mosaic_telemetry::TelemetryConfig::builder()
            .service_name(self.service_name.clone())
            .logging(logging)
            .metrics(metrics)
            .build()
    }
}

fn default_service_name() -> String {
    "mosaic".to_string()
}

fn default_true() -> bool {
    true
}
