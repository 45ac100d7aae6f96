//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::config::ConfigurationError;
use crate::core::transaction::{TransactionError, TransactionResult};
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Connection failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// No response in time
    pub const TIMEOUT: u8 = 4;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Device busy
    pub const DEVICE_BUSY: u8 = 13;

    /// Port not found
    pub const PORT_NOT_FOUND: u8 = 14;

    /// Data validation failed
    pub const VALIDATION_FAILED: u8 = 17;

    /// Internal error
    pub const INTERNAL_ERROR: u8 = 127;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Success without a message
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Success with a message
    pub fn success_with_message(msg: impl Into<String>) -> Self {
        Self::Success(Some(msg.into()))
    }

    /// Error with an explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) => Some(msg),
            Self::Error(_, msg) => Some(msg),
            Self::Success(None) => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

fn transaction_error_code(err: &TransactionError) -> u8 {
    match err {
        TransactionError::Io(TransportError::PortNotFound(_)) => ExitCodes::PORT_NOT_FOUND,
        TransactionError::Io(TransportError::PermissionDenied(_)) => ExitCodes::PERMISSION_DENIED,
        TransactionError::Io(TransportError::PortInUse(_)) => ExitCodes::DEVICE_BUSY,
        TransactionError::Io(_) => ExitCodes::CONNECTION_FAILED,
        TransactionError::Timeout(_) => ExitCodes::TIMEOUT,
        TransactionError::Format { .. } => ExitCodes::VALIDATION_FAILED,
        TransactionError::Parse { .. } | TransactionError::Unexpected(_) => {
            ExitCodes::INTERNAL_ERROR
        }
    }
}

impl From<&TransactionResult> for CliResult {
    fn from(result: &TransactionResult) -> Self {
        match result {
            TransactionResult::Success(reading) => Self::success_with_message(reading.to_string()),
            TransactionResult::Failure(err) => Self::Error(transaction_error_code(err), err.to_string()),
        }
    }
}

impl From<ConfigurationError> for CliResult {
    fn from(err: ConfigurationError) -> Self {
        Self::Error(ExitCodes::CONFIG_ERROR, err.to_string())
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Connection failed",
        4 => "No response from sensor",
        7 => "Permission denied",
        8 => "Configuration error",
        13 => "Device busy",
        14 => "Port not found",
        17 => "Invalid sensor data",
        127 => "Internal error",
        _ => "Unknown error",
    }
}

/// Print exit code table
pub fn print_exit_codes() {
    println!("Exit Codes:");
    for code in [0, 1, 2, 3, 4, 7, 8, 13, 14, 17, 127] {
        println!("  {:>3}  {}", code, exit_code_description(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::TemperatureReading;
    use std::time::Duration;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::error(3, "Connection failed");
        assert!(!error.is_success());
        assert_eq!(error.code(), 3);
        assert_eq!(error.message(), Some("Connection failed"));
    }

    #[test]
    fn test_from_transaction_result() {
        let ok = TransactionResult::Success(TemperatureReading::new(23.5));
        let result = CliResult::from(&ok);
        assert!(result.is_success());
        assert_eq!(result.message(), Some("23.5 °C"));

        let cases = [
            (TransactionError::Io(TransportError::PortNotFound("COM1".into())), ExitCodes::PORT_NOT_FOUND),
            (TransactionError::Io(TransportError::PermissionDenied("COM1".into())), ExitCodes::PERMISSION_DENIED),
            (TransactionError::Io(TransportError::PortInUse("COM1".into())), ExitCodes::DEVICE_BUSY),
            (TransactionError::Io(TransportError::NotConnected), ExitCodes::CONNECTION_FAILED),
            (TransactionError::Timeout(Duration::from_secs(5)), ExitCodes::TIMEOUT),
            (TransactionError::Format { raw: "23.5C".into() }, ExitCodes::VALIDATION_FAILED),
            (TransactionError::Unexpected("boom".into()), ExitCodes::INTERNAL_ERROR),
        ];
        for (err, code) in cases {
            let failed = TransactionResult::Failure(err);
            assert_eq!(CliResult::from(&failed).code(), code);
        }
    }

    #[test]
    fn test_from_configuration_error() {
        let err = ConfigurationError::TimeoutTooShort(Duration::from_millis(10));
        assert_eq!(CliResult::from(err).code(), ExitCodes::CONFIG_ERROR);
    }

    #[test]
    fn test_descriptions_cover_table() {
        for code in [0, 1, 2, 3, 4, 7, 8, 13, 14, 17, 127] {
            assert_ne!(exit_code_description(code), "Unknown error");
        }
        assert_eq!(exit_code_description(99), "Unknown error");
    }
}
