//! Optional settings file supplying CLI defaults
//!
//! The file is only ever read. A missing file means "no defaults".

use super::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Defaults read from `settings.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorSettings {
    /// Serial port name
    pub port: Option<String>,
    /// Read timeout in milliseconds
    pub read_timeout_ms: Option<u64>,
}

impl SensorSettings {
    /// Load settings from `path`, returning defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            tracing::debug!("No settings file at {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings = toml::from_str(&content)?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
