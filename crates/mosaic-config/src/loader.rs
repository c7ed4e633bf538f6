//! Layered configuration loading.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, LogFormat, MosaicConfig, PortSetting};

/// Loads configuration in layers; later layers override earlier ones:
///
/// 1. Defaults or a preset
/// 2. A TOML or JSON file (or string)
/// 3. Environment variables `PREFIX__SECTION__KEY`
///
/// Services can only be configured through files.
///
/// # Example
///
/// ```no_run
/// use mosaic_config::ConfigLoader;
///
/// # fn main() -> Result<(), mosaic_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_file("services.toml")?
///     .with_env_prefix("MOSAIC")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: MosaicConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MosaicConfig::default(),
            env_prefix: None,
        }
    }

    /// Resets to default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = MosaicConfig::default();
        self
    }

    /// Starts from the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use mosaic_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert!(!config.telemetry.metrics.enabled);
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = MosaicConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = MosaicConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, has an
    /// unsupported extension, or does not parse (including unknown fields).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.config = Self::parse(&content, &extension).map_err(|e| match e {
            ConfigError::ValidationError(_) => ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            )),
            other => other,
        })?;
        Ok(self)
    }

    /// Loads a file if it exists.
    ///
    /// # Errors
    ///
    /// See [`ConfigLoader::with_file`].
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `format` ("toml" or "json").
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unsupported or parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use mosaic_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [web]
    ///     host = "www.example.org"
    ///
    ///     [[services]]
    ///     name = "site"
    ///     assertions = [{ type = "always" }]
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.services[0].name, "site");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = Self::parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Enables environment overrides with `prefix`.
    ///
    /// - `MOSAIC__WEB__HOST=www.example.org`
    /// - `MOSAIC__WEB__STRIP_PREFIXES=/cms,/site`
    /// - `MOSAIC__TELEMETRY__LOGGING__LEVEL=debug`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads variables from a `.env` file, if there is one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::validation_error(format!(
                "failed to load .env file: {e}"
            ))),
        }
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation
    /// fails.
    pub fn load(mut self) -> Result<MosaicConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> MosaicConfig {
        self.config
    }

    fn parse(content: &str, format: &str) -> Result<MosaicConfig, ConfigError> {
        match format {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration format: {format}"
            ))),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            // another variable that merely shares the prefix
            return Ok(());
        };
        let parts: Vec<&str> = rest.split("__").collect();
        let web = &mut self.config.web;
        let telemetry = &mut self.config.telemetry;

        match parts.as_slice() {
            ["WEB", "HOST"] => web.host = value.to_string(),
            ["WEB", "PROTOCOL"] => web.protocol = value.to_lowercase(),
            ["WEB", "RESTRICTED_PROTOCOL"] => {
                web.restricted_protocol = (!value.is_empty()).then(|| value.to_lowercase());
            }
            ["WEB", "PORT"] => {
                web.port = if value == crate::WILDCARD {
                    PortSetting::default()
                } else {
                    PortSetting::Number(value.parse().map_err(|_| {
                        ConfigError::env_parse_error(key, "expected port number or '*'")
                    })?)
                };
            }
            ["WEB", "STRIP_PREFIXES"] => {
                web.strip_prefixes = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ["WEB", "TRUSTED_TOKEN"] => web.trusted_token = value.to_string(),

            ["TELEMETRY", "SERVICE_NAME"] => telemetry.service_name = value.to_string(),
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                telemetry.logging.enabled = parse_bool(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => telemetry.logging.level = value.to_string(),
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                telemetry.logging.format = value
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected 'json' or 'pretty'"))?;
            }
            ["TELEMETRY", "LOGGING", "ANSI_ENABLED"] => {
                telemetry.logging.ansi_enabled = parse_bool(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                telemetry.logging.include_location = parse_bool(key, value)?;
            }
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                telemetry.metrics.enabled = parse_bool(key, value)?;
            }
            ["TELEMETRY", "METRICS", "ADDR"] => telemetry.metrics.addr = value.to_string(),

            _ => {}
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(key, "expected boolean")),
    }
}
