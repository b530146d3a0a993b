//! Layered loading of [`EngineConfig`].
//!
//! Sources, lowest priority first:
//!
//! 1. [`EngineConfig::default`]
//! 2. `switchboard.{profile}.{ext}` in the first search path holding a config
//! 3. `switchboard.{ext}` in that same search path
//! 4. `SWITCHBOARD_*` environment variables, `__` separating nested keys
//! 5. values given to [`ConfigLoader::set`]
//!
//! `{ext}` is `toml` with the `toml-config` feature and `yaml`/`yml` with
//! `yaml-config`. Search paths default to the current directory followed by
//! the user config directory (`~/.config/switchboard` on Linux).
//!
//! ```rust,ignore
//! // SWITCHBOARD_WORKER_POOL_SIZE=16
//! // SWITCHBOARD_LOGGING__LEVEL=debug
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .set("command_prefix", "!")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::EngineConfig;
use super::validation::validate_config;

const FILE_STEM: &str = "switchboard";
const ENV_PREFIX: &str = "SWITCHBOARD_";
const PROFILE_VAR: &str = "SWITCHBOARD_PROFILE";

/// File extensions enabled by the format features, in search order.
fn extensions() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut extensions = Vec::new();
    #[cfg(feature = "toml-config")]
    extensions.push("toml");
    #[cfg(feature = "yaml-config")]
    extensions.extend(["yaml", "yml"]);
    extensions
}

fn default_search_paths() -> Vec<PathBuf> {
    std::env::current_dir()
        .ok()
        .into_iter()
        .chain(dirs::config_dir().map(|dir| dir.join(FILE_STEM)))
        .collect()
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    match path.extension().and_then(|ext| ext.to_str()).unwrap_or_default() {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        ext => Err(ConfigError::ParseError(format!(
            "unsupported or disabled configuration format '.{ext}' ({})",
            path.display()
        ))),
    }
}

/// Builds an [`EngineConfig`] from files, environment and explicit values.
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    profile: Option<String>,
    env: bool,
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader reading environment variables, with the profile taken from
    /// `SWITCHBOARD_PROFILE`.
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
            file: None,
            profile: std::env::var(PROFILE_VAR)
                .ok()
                .filter(|p| !p.is_empty())
                .map(|p| p.to_lowercase()),
            env: true,
            overrides: Figment::new(),
        }
    }

    /// Selects `switchboard.{profile}.{ext}` as the lower file layer.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into().to_lowercase());
        self
    }

    /// Adds a directory to search. Once any is added, the defaults are not
    /// searched.
    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching. It must exist.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Ignores `SWITCHBOARD_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Sets one value above every other source. `key` is a dotted path such
    /// as `"worker_pool_size"` or `"logging.level"`.
    pub fn set<V: Serialize>(mut self, key: &str, value: V) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<EngineConfig> {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));

        figment = match &self.file {
            Some(path) if !path.exists() => return Err(ConfigError::FileNotFound(path.clone())),
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                merge_file(figment, path)?
            }
            None => self.merge_search_paths(figment)?,
        };

        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        figment = figment.merge(self.overrides);

        let config: EngineConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        validate_config(&config)?;

        debug!(
            profile = self.profile.as_deref().unwrap_or("none"),
            workers = config.worker_pool_size,
            prefix = %config.command_prefix,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Merges the profile and base files of the first search path that has a
    /// base file.
    fn merge_search_paths(&self, mut figment: Figment) -> ConfigResult<Figment> {
        let search_paths = if self.search_paths.is_empty() {
            default_search_paths()
        } else {
            self.search_paths.clone()
        };

        for dir in &search_paths {
            let mut found = false;
            for ext in extensions() {
                if let Some(profile) = &self.profile {
                    let path = dir.join(format!("{FILE_STEM}.{profile}.{ext}"));
                    if path.exists() {
                        debug!(path = %path.display(), "Loading profile configuration");
                        figment = merge_file(figment, &path)?;
                    }
                }
                let path = dir.join(format!("{FILE_STEM}.{ext}"));
                if path.exists() {
                    info!(path = %path.display(), "Loading configuration file");
                    figment = merge_file(figment, &path)?;
                    found = true;
                }
            }
            if found {
                return Ok(figment);
            }
        }

        warn!("No configuration file found, using defaults");
        Ok(figment)
    }
}
