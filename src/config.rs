//! Download settings, loadable from TOML.
//!
//! ```toml
//! root = "/srv/files"
//! io_buffer_size = 65536
//! disposition = "attachment"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::disposition::DispositionType;
use crate::stream::DEFAULT_BUFFER_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DownloadConfig {
    /// Directory that download identifiers are resolved against.
    pub root: PathBuf,
    /// Size of each chunk read from the resource while streaming.
    pub io_buffer_size: usize,
    pub disposition: DispositionType,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        DownloadConfig {
            root: PathBuf::from("."),
            io_buffer_size: DEFAULT_BUFFER_SIZE,
            disposition: DispositionType::Attachment,
        }
    }
}

impl DownloadConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DownloadConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.io_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "io_buffer_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
