//! Resolve a port configuration from flags, environment and settings file
//!
//! Precedence: command-line flag (or its environment variable) > settings
//! file > built-in default.

use super::exit_codes::{CliResult, ExitCodes};
use crate::config::{PortConfiguration, SensorSettings, DEFAULT_READ_TIMEOUT};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Port used by `--simulate` when none is given
#[cfg(windows)]
pub const SIMULATED_PORT: &str = "COM1";
/// Port used by `--simulate` when none is given
#[cfg(not(windows))]
pub const SIMULATED_PORT: &str = "/dev/ttyS0";

/// Load the settings the flags do not already cover.
///
/// An explicitly named file must load cleanly. The implicit default file is
/// best effort: a broken one is reported and ignored. When the flags supply
/// every value no file is read at all.
pub fn load_settings(
    explicit: Option<&Path>,
    default_path: Option<PathBuf>,
    flags_complete: bool,
) -> Result<SensorSettings, CliResult> {
    if let Some(path) = explicit {
        return SensorSettings::load(path).map_err(CliResult::from);
    }
    if flags_complete {
        return Ok(SensorSettings::default());
    }

    let Some(path) = default_path else {
        return Ok(SensorSettings::default());
    };
    match SensorSettings::load(&path) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!("Ignoring settings file {}: {}", path.display(), e);
            Ok(SensorSettings::default())
        }
    }
}

/// Build the configuration for one read
pub fn resolve_config(
    port: Option<&str>,
    timeout_ms: Option<u64>,
    settings: &SensorSettings,
    simulate: bool,
) -> Result<PortConfiguration, CliResult> {
    let port = match (port, settings.port.as_deref()) {
        (Some(p), _) | (None, Some(p)) => p,
        (None, None) if simulate => SIMULATED_PORT,
        (None, None) => {
            return Err(CliResult::error(
                ExitCodes::INVALID_ARGS,
                "No port given: use --port, TMSENSOR_PORT or the settings file",
            ));
        }
    };
    let timeout = timeout_ms
        .or(settings.read_timeout_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_READ_TIMEOUT);

    PortConfiguration::with_timeout(port, timeout).map_err(CliResult::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[cfg(windows)]
    const PORT: &str = "COM3";
    #[cfg(not(windows))]
    const PORT: &str = "/dev/ttyUSB0";

    fn broken_settings() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bogus = 1").unwrap();
        file
    }

    #[test]
    fn test_flags_skip_settings_file() {
        let file = broken_settings();
        let settings = load_settings(None, Some(file.path().to_path_buf()), true).unwrap();
        assert_eq!(settings, SensorSettings::default());

        let config = resolve_config(Some(PORT), Some(2000), &settings, false).unwrap();
        assert_eq!(config.read_timeout(), Duration::from_millis(2000));
    }

    #[test]
    fn test_broken_default_file_is_ignored() {
        let file = broken_settings();
        let settings = load_settings(None, Some(file.path().to_path_buf()), false).unwrap();
        assert_eq!(settings, SensorSettings::default());
    }

    #[test]
    fn test_broken_explicit_file_is_an_error() {
        let file = broken_settings();
        let err = load_settings(Some(file.path()), None, true).unwrap_err();
        assert_eq!(err.code(), ExitCodes::CONFIG_ERROR);
        assert!(err.message().unwrap().contains("bogus"));
    }

    #[test]
    fn test_default_file_supplies_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"{}\"\nread_timeout_ms = 1500", PORT).unwrap();

        let settings = load_settings(None, Some(file.path().to_path_buf()), false).unwrap();
        let config = resolve_config(None, None, &settings, false).unwrap();
        assert_eq!(config.port_name(), PORT);
        assert_eq!(config.read_timeout(), Duration::from_millis(1500));

        let config = resolve_config(None, Some(3000), &settings, false).unwrap();
        assert_eq!(config.read_timeout(), Duration::from_millis(3000));
    }

    #[test]
    fn test_missing_port() {
        let err = resolve_config(None, None, &SensorSettings::default(), false).unwrap_err();
        assert_eq!(err.code(), ExitCodes::INVALID_ARGS);

        let config = resolve_config(None, None, &SensorSettings::default(), true).unwrap();
        assert_eq!(config.port_name(), SIMULATED_PORT);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = resolve_config(Some(PORT), Some(10), &SensorSettings::default(), false).unwrap_err();
        assert_eq!(err.code(), ExitCodes::CONFIG_ERROR);
    }
}
