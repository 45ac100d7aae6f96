//! Validated serial port configuration for one TM sensor

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Baud rate the TM sensor transmits at
pub const BAUD_RATE: u32 = 9600;

/// Byte terminating every sensor response (carriage return)
pub const LINE_TERMINATOR: u8 = b'\r';

/// Read timeout used when none is given
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Shortest read timeout accepted
pub const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1000);

#[cfg(windows)]
const PORT_NAME_PATTERN: &str = r"^COM[0-9]+$";
#[cfg(not(windows))]
const PORT_NAME_PATTERN: &str = r"^/dev/(tty|cu)\S+$";

#[cfg(windows)]
const PORT_NAME_HINT: &str = "COMx, where x is a number";
#[cfg(not(windows))]
const PORT_NAME_HINT: &str = "/dev/ttyXXX";

fn port_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PORT_NAME_PATTERN).expect("port name pattern is valid"))
}

/// Errors raised while building a configuration, before any I/O happens
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Port name does not match the platform's device naming
    #[error("Invalid port name '{name}': expected the form {hint}")]
    InvalidPortName {
        /// Rejected name
        name: String,
        /// Expected form
        hint: &'static str,
    },

    /// Read timeout below the accepted minimum
    #[error("Read timeout must be at least {} ms, got {} ms", MIN_READ_TIMEOUT.as_millis(), .0.as_millis())]
    TimeoutTooShort(Duration),

    /// Settings file could not be read
    #[error("Could not read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid TOML
    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Immutable description of the serial link to one sensor.
///
/// The electrical parameters (9600 baud, 8 data bits, no parity, one stop
/// bit) and the carriage-return terminator are fixed by the device and are
/// not part of the value; only the port name and read timeout vary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    port_name: String,
    read_timeout: Duration,
}

impl PortConfiguration {
    /// Create a configuration with the default read timeout
    pub fn new(port_name: &str) -> Result<Self, ConfigurationError> {
        Self::with_timeout(port_name, DEFAULT_READ_TIMEOUT)
    }

    /// Create a configuration with an explicit read timeout
    pub fn with_timeout(port_name: &str, read_timeout: Duration) -> Result<Self, ConfigurationError> {
        if !is_valid_port_name(port_name) {
            return Err(ConfigurationError::InvalidPortName {
                name: port_name.to_string(),
                hint: PORT_NAME_HINT,
            });
        }
        if read_timeout < MIN_READ_TIMEOUT {
            return Err(ConfigurationError::TimeoutTooShort(read_timeout));
        }

        Ok(Self {
            port_name: port_name.to_string(),
            read_timeout,
        })
    }

    /// Port name (e.g., COM3, /dev/ttyUSB0)
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Upper bound on waiting for one response line
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Baud rate
    pub fn baud_rate(&self) -> u32 {
        BAUD_RATE
    }

    /// Human-readable link description, e.g. `/dev/ttyUSB0 @ 9600 baud (8N1)`
    pub fn connection_info(&self) -> String {
        format!("{} @ {} baud (8N1)", self.port_name, BAUD_RATE)
    }
}

/// Whether `name` looks like a serial device on this platform
pub fn is_valid_port_name(name: &str) -> bool {
    !name.is_empty() && port_name_regex().is_match(name)
}
