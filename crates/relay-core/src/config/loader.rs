//! Configuration loading with precedence
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. Config file (explicit path, or relay.yaml / relay.yml in the search dir)
//! 3. Environment variables (RELAY_* prefix)
//! 4. CLI flags (applied by the caller)

use crate::error::{Error, Result};
use crate::types::RelayConfig;
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::fs;

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["relay.yaml", "relay.yml"];

/// Configuration after all sources were applied
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RelayConfig,

    /// File the configuration was read from, if any
    pub source: Option<Utf8PathBuf>,
}

/// Loads `RelayConfig` from file and environment
pub struct ConfigLoader {
    search_dir: Utf8PathBuf,
}

impl ConfigLoader {
    /// Loader searching the current working directory
    pub fn new() -> Result<Self> {
        let cwd = env::current_dir()?;
        let search_dir = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|p| Error::invalid_config(format!("Non UTF-8 working directory: {}", p.display())))?;
        Ok(Self { search_dir })
    }

    /// Loader searching a custom directory
    pub fn with_dir(search_dir: Utf8PathBuf) -> Self {
        Self { search_dir }
    }

    pub fn search_dir(&self) -> &Utf8Path {
        &self.search_dir
    }

    /// Load and validate the configuration
    ///
    /// An explicit `path` must exist; without one, a missing config file
    /// means built-in defaults.
    pub fn load(&self, path: Option<&Utf8Path>) -> Result<LoadedConfig> {
        let (mut config, source) = match path {
            Some(p) => (Self::load_file(p)?, Some(p.to_owned())),
            None => match self.find_config() {
                Some(found) => (Self::load_file(&found)?, Some(found)),
                None => (RelayConfig::default(), None),
            },
        };

        Self::apply_env_overrides(&mut config)?;
        config.validate()?;

        if let Some(src) = &source {
            tracing::debug!(path = %src, "loaded relay configuration");
        }

        Ok(LoadedConfig { config, source })
    }

    fn find_config(&self) -> Option<Utf8PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| self.search_dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    fn load_file(path: &Utf8Path) -> Result<RelayConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;

        if content.trim().is_empty() {
            return Ok(RelayConfig::default());
        }

        let config: RelayConfig = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    fn apply_env_overrides(config: &mut RelayConfig) -> Result<()> {
        if let Ok(val) = env::var("RELAY_ENDPOINT") {
            config.network.endpoint = val;
        }

        if let Ok(val) = env::var("RELAY_API_KEY") {
            config.network.api_key = Some(val);
        }

        if let Ok(val) = env::var("RELAY_HTTP_TIMEOUT_SECS") {
            config.network.http_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("RELAY_HTTP_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("RELAY_FACTORY_ADDRESS") {
            config.contest.factory_address = Some(val);
        }

        Ok(())
    }
}
