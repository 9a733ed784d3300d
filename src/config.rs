use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{DefbenchError, Result};
use crate::types::DEFAULT_REPEAT;

/// Default memory sampling cadence, in milliseconds.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 10;

/// Measurement settings, optionally loaded from `defbench/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    pub default_repeat: usize,
    pub sample_interval_ms: u64,
    pub capture_stderr: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            default_repeat: DEFAULT_REPEAT,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            capture_stderr: true,
        }
    }
}

impl BenchConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Loads configuration from `path` if given, otherwise from the user
    /// config directory when a config file exists there, otherwise defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => match default_config_path() {
                Some(p) if p.is_file() => Self::from_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| DefbenchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| DefbenchError::ConfigParse {
            path: path.to_path_buf(),
            detail: e.message().to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_repeat == 0 {
            return Err(DefbenchError::InvalidConfig(
                "default_repeat must be at least 1".to_string(),
            ));
        }
        if self.sample_interval_ms == 0 {
            return Err(DefbenchError::InvalidConfig(
                "sample_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/defbench/config.toml` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("defbench").join("config.toml"))
}
