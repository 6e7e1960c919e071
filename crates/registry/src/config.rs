//! Registry configuration.
//!
//! Loaded from a TOML file with a `[registry]` table. Every key is
//! optional.
//!
//! ```toml
//! [registry]
//! max_simulations = 1024
//! idle_timeout_secs = 1800
//! sweep_interval_secs = 60
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid registry config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid registry config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Upper bound on live simulations.
    pub max_simulations: usize,
    /// Idle timeout for simulations that do not carry their own.
    pub idle_timeout_secs: u64,
    /// Period of the background eviction sweep.
    pub sweep_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            max_simulations: 1024,
            idle_timeout_secs: 1800,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    registry: RegistryConfig,
}

impl RegistryConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(s)?;
        file.registry.checked()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    fn checked(self) -> Result<Self, ConfigError> {
        if self.max_simulations == 0 {
            return Err(ConfigError::Invalid(
                "max_simulations must be at least 1".to_string(),
            ));
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "idle_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}
