//! Configuration loader using figment.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. A configuration file (`subhook.toml` with `toml-config`, `subhook.yaml` /
//!    `subhook.yml` with `yaml-config`)
//! 3. Environment variables (`SUBHOOK_*`)
//! 4. Programmatic merges
//!
//! Environment variables use `__` as the nesting separator:
//!
//! - `SUBHOOK_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `SUBHOOK_PUBSUB__SERVICE_ACCOUNT_JSON=/etc/sa.json` → `pubsub.SERVICE_ACCOUNT_JSON`
//! - `SUBHOOK_ACTIVATION__CALL_TIMEOUT_MS=5000` → `activation.call_timeout_ms = 5000`
//!
//! ```rust,ignore
//! use subhook_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./config/subhook.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::SubhookConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "SUBHOOK_";

/// Figment-backed configuration loader.
pub struct ConfigLoader {
    figment: Figment,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a directory to search for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a configuration value on top of every other source.
    pub fn merge(mut self, config: SubhookConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<SubhookConfig> {
        let figment = self.build_figment()?;

        let config: SubhookConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;
        validate_config(&config)?;

        debug!(
            credentials = config.pubsub.service_account_json.is_some(),
            logging_level = %config.logging.level,
            "Configuration loaded"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(SubhookConfig::default()));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else if let Some(path) = self.find_config_file() {
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            debug!("No configuration file found, using defaults");
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let user_figment = std::mem::take(&mut self.figment);
        Ok(figment.merge(user_figment))
    }

    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("subhook"));
        }
        paths
    }

    fn candidate_names() -> Vec<&'static str> {
        #[allow(unused_mut)]
        let mut names = Vec::new();
        #[cfg(feature = "toml-config")]
        names.push("subhook.toml");
        #[cfg(feature = "yaml-config")]
        names.extend(["subhook.yaml", "subhook.yml"]);
        names
    }

    /// First existing file across `search_paths × candidate_names`.
    fn find_config_file(&self) -> Option<PathBuf> {
        let names = Self::candidate_names();
        self.resolve_search_paths()
            .into_iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .find(|path| path.exists())
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<SubhookConfig> {
    ConfigLoader::new().load()
}
