//! Root configuration type.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::{ConfigError, LogFormat, ServiceConfig, TelemetrySection, WebConfig};

/// Complete Mosaic configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use mosaic_config::MosaicConfig;
///
/// let config = MosaicConfig::default();
/// assert_eq!(config.web.host, "*");
/// assert!(config.services.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct MosaicConfig {
    /// Canonical URL settings.
    #[serde(default)]
    pub web: WebConfig,

    /// Service records, in registration order.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl MosaicConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> MosaicConfigBuilder {
        MosaicConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for the first offending field:
    /// - web settings that are not a host name, protocol or port
    /// - empty or duplicate service names
    /// - parents that are unknown, the service itself, or part of a cycle
    /// - assertions with empty required fields, or inverted URL writers
    /// - an unparseable metrics address while metrics are enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.web.validate()?;

        let mut names = HashSet::new();
        for (i, service) in self.services.iter().enumerate() {
            let field = format!("services[{i}]");
            if service.name.is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("{field}.name"),
                    "must not be empty",
                ));
            }
            if !names.insert(service.name.as_str()) {
                return Err(ConfigError::invalid_value(
                    format!("{field}.name"),
                    format!("duplicate service '{}'", service.name),
                ));
            }
            service.validate(&field)?;
        }

        let parents: HashMap<&str, Option<&str>> = self
            .services
            .iter()
            .map(|s| (s.name.as_str(), s.parent.as_deref()))
            .collect();
        for (i, service) in self.services.iter().enumerate() {
            let Some(parent) = service.parent.as_deref() else {
                continue;
            };
            let field = format!("services[{i}].parent");
            if parent == service.name {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("service '{parent}' cannot be its own parent"),
                ));
            }
            if !parents.contains_key(parent) {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("unknown service '{parent}'"),
                ));
            }
            // at most one step per service before a chain must have ended
            let mut current = Some(parent);
            for _ in 0..self.services.len() {
                current = current.and_then(|name| parents.get(name).copied().flatten());
                if current == Some(service.name.as_str()) {
                    return Err(ConfigError::invalid_value(
                        field,
                        format!("parent chain of '{}' forms a cycle", service.name),
                    ));
                }
            }
        }

        let metrics = &self.telemetry.metrics;
        if metrics.enabled && metrics.addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.addr",
                format!("invalid socket address: {}", metrics.addr),
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, no metrics listener.
    ///
    /// # Example
    ///
    /// ```
    /// use mosaic_config::MosaicConfig;
    ///
    /// let config = MosaicConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.ansi_enabled = true;
        config.telemetry.logging.include_location = true;
        config.telemetry.metrics.enabled = false;
        config
    }

    /// Production preset: JSON info logs, metrics enabled.
    ///
    /// # Example
    ///
    /// ```
    /// use mosaic_config::{LogFormat, MosaicConfig};
    ///
    /// let config = MosaicConfig::production();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.logging.ansi_enabled = false;
        config.telemetry.metrics.enabled = true;
        config
    }
}

/// Builder for [`MosaicConfig`].
#[derive(Debug, Default)]
pub struct MosaicConfigBuilder {
    web: Option<WebConfig>,
    services: Vec<ServiceConfig>,
    telemetry: Option<TelemetrySection>,
}

impl MosaicConfigBuilder {
    /// Sets the web section.
    #[must_use]
    pub fn web(mut self, web: WebConfig) -> Self {
        self.web = Some(web);
        self
    }

    /// Appends a service record.
    #[must_use]
    pub fn service(mut self, service: ServiceConfig) -> Self {
        self.services.push(service);
        self
    }

    /// Sets the telemetry section.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetrySection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Builds the configuration; unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> MosaicConfig {
        MosaicConfig {
            web: self.web.unwrap_or_default(),
            services: self.services,
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AssertionConfig;

    fn child(name: &str, parent: &str) -> ServiceConfig {
        ServiceConfig {
            parent: Some(parent.to_string()),
            ..ServiceConfig::new(name)
        }
    }

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::InvalidValue { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(MosaicConfig::default().validate().is_ok());
        assert!(MosaicConfig::development().validate().is_ok());
        assert!(MosaicConfig::production().validate().is_ok());
    }

    #[test]
    fn test_valid_tree() {
        let config = MosaicConfig::builder()
            .service(ServiceConfig::new("site"))
            .service(child("documents", "site"))
            .service(child("article", "documents"))
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_name() {
        let config = MosaicConfig::builder()
            .service(ServiceConfig::new("site"))
            .service(ServiceConfig::new("site"))
            .build();
        assert_eq!(field_of(config.validate().unwrap_err()), "services[1].name");
    }

    #[test]
    fn test_empty_name() {
        let config = MosaicConfig::builder().service(ServiceConfig::new("")).build();
        assert_eq!(field_of(config.validate().unwrap_err()), "services[0].name");
    }

    #[test]
    fn test_unknown_and_self_parent() {
        let unknown = MosaicConfig::builder().service(child("a", "missing")).build();
        assert_eq!(field_of(unknown.validate().unwrap_err()), "services[0].parent");

        let own = MosaicConfig::builder().service(child("a", "a")).build();
        let err = own.validate().unwrap_err();
        assert!(err.to_string().contains("own parent"));
    }

    #[test]
    fn test_parent_cycle() {
        let config = MosaicConfig::builder()
            .service(ServiceConfig::new("root"))
            .service(child("a", "c"))
            .service(child("b", "a"))
            .service(child("c", "b"))
            .build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cycle"), "{err}");
    }

    #[test]
    fn test_assertion_errors_carry_position() {
        let mut service = ServiceConfig::new("documents");
        service.assertions.push(AssertionConfig::Always);
        service.assertions.push(AssertionConfig::UriPrefix {
            prefix: "documents".to_string(),
        });
        let config = MosaicConfig::builder().service(service).build();
        assert_eq!(
            field_of(config.validate().unwrap_err()),
            "services[0].assertions[1].prefix"
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = MosaicConfig::default();
        config.telemetry.metrics.addr = "localhost".to_string();
        assert!(config.validate().is_err());

        config.telemetry.metrics.enabled = false;
        assert!(config.validate().is_ok());
    }
}
