//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `DE_*`
//! environment variables, and merging them with proper precedence rules.
//! Precedence, lowest first: built-in defaults, XDG config, home config,
//! local config, environment, command line.

use crate::error::ExpiryError;
use crate::types::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Registry cache settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    /// Alternative registry locations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registries: Option<RegistriesConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Warning threshold in days
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<i64>,

    /// Critical threshold in days
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical: Option<i64>,

    /// Request timeout (as string, e.g., "30s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Capture raw RDAP bodies on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

/// Registry cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheConfig {
    /// Cache directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Freshness for responses without max-age (e.g., "1440m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

/// Registry locations, for mirrors and testing.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RegistriesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_ids_url: Option<String>,
}

impl FileConfig {
    /// Apply the file values on top of `config`.
    pub fn apply_to(&self, mut config: ResolverConfig) -> Result<ResolverConfig, ExpiryError> {
        if let Some(defaults) = &self.defaults {
            if let Some(timeout) = &defaults.timeout {
                config.timeout = parse_duration(timeout)?;
            }
            if let Some(debug) = defaults.debug {
                config.debug = debug;
            }
        }

        if let Some(cache) = &self.cache {
            if let Some(dir) = &cache.dir {
                config.cache_dir = PathBuf::from(dir);
            }
            if let Some(ttl) = &cache.ttl {
                config.cache_ttl = parse_duration(ttl)?;
            }
        }

        if let Some(registries) = &self.registries {
            if let Some(url) = &registries.bootstrap_url {
                config.bootstrap_url = url.clone();
            }
            if let Some(url) = &registries.registrar_ids_url {
                config.registrar_ids_url = url.clone();
            }
        }

        Ok(config)
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager;

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if parsing fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ExpiryError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ExpiryError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ExpiryError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            ExpiryError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Files that exist but fail to parse are reported and skipped.
    pub fn discover_and_load(&self) -> Result<FileConfig, ExpiryError> {
        let mut merged_config = FileConfig::default();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    debug!("Loaded configuration from {}", path.display());
                    merged_config = self.merge_configs(merged_config, config);
                }
                Err(e) => warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        Ok(merged_config)
    }

    /// Local configuration file in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./domain-expiry.toml", "./.domain-expiry.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Global configuration file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-expiry.toml", "domain-expiry.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// XDG configuration file, per the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-expiry").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower_defaults), Some(higher_defaults)) => Some(DefaultsConfig {
                    warning: higher_defaults.warning.or(lower_defaults.warning),
                    critical: higher_defaults.critical.or(lower_defaults.critical),
                    timeout: higher_defaults.timeout.or(lower_defaults.timeout),
                    debug: higher_defaults.debug.or(lower_defaults.debug),
                }),
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            cache: match (lower.cache, higher.cache) {
                (Some(lower_cache), Some(higher_cache)) => Some(CacheConfig {
                    dir: higher_cache.dir.or(lower_cache.dir),
                    ttl: higher_cache.ttl.or(lower_cache.ttl),
                }),
                (lower_cache, higher_cache) => higher_cache.or(lower_cache),
            },
            registries: match (lower.registries, higher.registries) {
                (Some(lower_reg), Some(higher_reg)) => Some(RegistriesConfig {
                    bootstrap_url: higher_reg.bootstrap_url.or(lower_reg.bootstrap_url),
                    registrar_ids_url: higher_reg
                        .registrar_ids_url
                        .or(lower_reg.registrar_ids_url),
                }),
                (lower_reg, higher_reg) => higher_reg.or(lower_reg),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ExpiryError> {
        if let Some(defaults) = &config.defaults {
            if let (Some(warning), Some(critical)) = (defaults.warning, defaults.critical) {
                if critical > warning {
                    return Err(ExpiryError::config(format!(
                        "Critical threshold ({}) must not exceed warning threshold ({})",
                        critical, warning
                    )));
                }
            }

            if let Some(timeout) = &defaults.timeout {
                parse_duration(timeout)?;
            }
        }

        if let Some(ttl) = config.cache.as_ref().and_then(|c| c.ttl.as_ref()) {
            parse_duration(ttl)?;
        }

        if let Some(registries) = &config.registries {
            for url in [&registries.bootstrap_url, &registries.registrar_ids_url]
                .into_iter()
                .flatten()
            {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(ExpiryError::config(format!(
                        "Registry URL '{}' must be http or https",
                        url
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via DE_* environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub warning: Option<i64>,
    pub critical: Option<i64>,
    pub timeout: Option<String>,
    pub cache_dir: Option<String>,
    pub debug: Option<bool>,
}

impl EnvConfig {
    /// Build from an arbitrary variable lookup.
    ///
    /// Invalid values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_config = EnvConfig::default();

        let days = |key: &str| {
            let val = lookup(key)?;
            match val.trim().parse::<i64>() {
                Ok(days) => {
                    debug!("Using {}={}", key, days);
                    Some(days)
                }
                Err(_) => {
                    warn!("Invalid {}='{}', must be a number of days", key, val);
                    None
                }
            }
        };

        // DE_WARNING / DE_CRITICAL - thresholds in days
        env_config.warning = days("DE_WARNING");
        env_config.critical = days("DE_CRITICAL");

        // DE_TIMEOUT - request timeout
        if let Some(timeout_str) = lookup("DE_TIMEOUT") {
            if parse_timeout_string(&timeout_str).is_some() {
                debug!("Using DE_TIMEOUT={}", timeout_str);
                env_config.timeout = Some(timeout_str);
            } else {
                warn!(
                    "Invalid DE_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                    timeout_str
                );
            }
        }

        // DE_CACHE_DIR - registry cache directory
        if let Some(dir) = lookup("DE_CACHE_DIR") {
            if !dir.trim().is_empty() {
                debug!("Using DE_CACHE_DIR={}", dir);
                env_config.cache_dir = Some(dir);
            }
        }

        // DE_DEBUG - raw body capture
        if let Some(val) = lookup("DE_DEBUG") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => env_config.debug = Some(true),
                "false" | "0" | "no" | "off" => env_config.debug = Some(false),
                _ => warn!("Invalid DE_DEBUG='{}', use true/false", val),
            }
        }

        env_config
    }

    /// Apply the environment values on top of `config`.
    pub fn apply_to(&self, mut config: ResolverConfig) -> Result<ResolverConfig, ExpiryError> {
        if let Some(timeout) = &self.timeout {
            config.timeout = parse_duration(timeout)?;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        Ok(config)
    }
}

/// Load configuration from the process environment.
pub fn load_env_config() -> EnvConfig {
    EnvConfig::from_lookup(|key| env::var(key).ok())
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
///
/// A bare number is taken as seconds.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    }
}

/// Parse a duration string, rejecting zero.
pub fn parse_duration(value: &str) -> Result<Duration, ExpiryError> {
    match parse_timeout_string(value) {
        Some(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ExpiryError::config(format!(
            "Invalid duration '{}'. Use format like '5s', '30s', '2m'",
            value
        ))),
    }
}
