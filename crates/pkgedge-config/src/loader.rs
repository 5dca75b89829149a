//! Configuration loader with layered approach.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, EdgeConfig, Environment};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```
/// use pkgedge_config::ConfigLoader;
///
/// let toml = r#"
///     environment = "production"
///
///     [packages]
///     blacklist = ["evil-pkg"]
/// "#;
///
/// let config = ConfigLoader::new()
///     .with_string(toml, "toml")
///     .unwrap()
///     .load()
///     .unwrap();
///
/// assert_eq!(config.packages.blacklist, vec!["evil-pkg".to_string()]);
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: EdgeConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EdgeConfig::default(),
            env_prefix: None,
        }
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::missing(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format ("toml" or "json").
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__SECTION__KEY`, for example
    /// `PKGEDGE__SERVER__HTTP_ADDR=0.0.0.0:9000`. The deployment mode is
    /// `PKGEDGE__ENVIRONMENT`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load variables from a `.env` file, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or the final
    /// configuration is invalid.
    pub fn load(mut self) -> Result<EdgeConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> EdgeConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<EdgeConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let env_vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(&marker))
            .collect();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            ["ENVIRONMENT"] => {
                self.config.environment = value
                    .parse::<Environment>()
                    .map_err(|e| ConfigError::env(key, e.to_string()))?;
            }

            // Server section
            ["SERVER", "HTTP_ADDR"] => {
                self.config.server.http_addr = value.to_string();
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                self.config.server.shutdown_timeout_secs = parse_u64(key, value)?;
            }
            ["SERVER", "BODY_TIMEOUT_MS"] => {
                self.config.server.body_timeout_ms = parse_u64(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                self.config.server.max_body_bytes = parse_u64(key, value)?;
            }

            // Assets section
            ["ASSETS", "DIR"] => {
                self.config.assets.dir = value.to_string();
            }
            ["ASSETS", "INDEX_FILE"] => {
                self.config.assets.index_file = value.to_string();
            }
            ["ASSETS", "MAX_AGE_SECS"] => {
                self.config.assets.max_age_secs = parse_u64(key, value)?;
            }

            // Landing section
            ["LANDING", "PLACEHOLDER"] => {
                self.config.landing.placeholder = value.to_string();
            }
            ["LANDING", "MAX_AGE_SECS"] => {
                self.config.landing.max_age_secs = parse_u64(key, value)?;
            }
            ["LANDING", "CACHE_TAG"] => {
                self.config.landing.cache_tag = value.to_string();
            }

            // Stats section
            ["STATS", "URL"] => {
                self.config.stats.url = non_empty(value);
            }
            ["STATS", "TIMEOUT_MS"] => {
                self.config.stats.timeout_ms = parse_u64(key, value)?;
            }
            ["STATS", "BEARER_TOKEN"] => {
                self.config.stats.bearer_token = non_empty(value);
            }

            // Packages section
            ["PACKAGES", "MIRROR_DIR"] => {
                self.config.packages.mirror_dir = value.to_string();
            }
            ["PACKAGES", "BLACKLIST"] => {
                self.config.packages.blacklist = value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }
            ["PACKAGES", "MAX_AGE_SECS"] => {
                self.config.packages.max_age_secs = parse_u64(key, value)?;
            }

            // Logging section
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = non_empty(value);
            }
            ["LOGGING", "JSON"] => {
                self.config.logging.json = Some(
                    parse_bool(value)
                        .ok_or_else(|| ConfigError::env(key, "expected boolean"))?,
                );
            }

            // Unknown key - ignore
            _ => {}
        }

        Ok(())
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env(key, "expected integer"))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
