//! Configuration module
//!
//! Handles the validated port configuration consumed by a read transaction
//! and the optional settings file the CLI reads its defaults from.

mod port;
mod settings;

pub use port::{
    is_valid_port_name, ConfigurationError, PortConfiguration, BAUD_RATE, DEFAULT_READ_TIMEOUT,
    LINE_TERMINATOR, MIN_READ_TIMEOUT,
};
pub use settings::SensorSettings;

use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "termicon", "tmsensor")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default location of the settings file
pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("settings.toml"))
}
