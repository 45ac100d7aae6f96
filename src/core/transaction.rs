//! Read transaction
//!
//! One call to [`TmSensor::read_temperature`] opens the port, runs the DTR
//! handshake, reads one line, validates and parses it, and closes the port.
//! Every failure along the way comes back as [`TransactionResult::Failure`];
//! nothing escapes to the caller, and the port is closed exactly once
//! before the call returns.
//!
//! There is no retry. A caller that wants one calls again; each call gets a
//! fresh session.

use super::protocol::{self, TemperatureReading};
use super::session::{SensorSession, SettleTimings};
use super::transport::{PortOpener, SystemPorts, TransportError};
use crate::config::PortConfiguration;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use thiserror::Error;

/// Errors that can end a read transaction
#[derive(Error, Debug)]
pub enum TransactionError {
    /// Opening, configuring or reading the port failed
    #[error(transparent)]
    Io(#[from] TransportError),

    /// No complete line arrived in time
    #[error("No response from sensor within {} ms", .0.as_millis())]
    Timeout(Duration),

    /// A line arrived but is not a TM reading
    #[error("Sensor returned data in an unexpected format: '{raw}'")]
    Format {
        /// Line as received
        raw: String,
    },

    /// A validated line failed numeric conversion
    #[error("Could not convert sensor reading '{raw}' to a number")]
    Parse {
        /// Line as received
        raw: String,
    },

    /// Anything else, including panics inside the transaction
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Failure classification for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Port missing, busy, denied or faulted
    Io,
    /// No line within the read timeout
    Timeout,
    /// Line did not match the wire format
    Format,
    /// Validated line did not convert
    Parse,
    /// Internal fault
    Unexpected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "io"),
            Self::Timeout => write!(f, "timeout"),
            Self::Format => write!(f, "format"),
            Self::Parse => write!(f, "parse"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}

impl TransactionError {
    /// Failure category
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Io(_) => FailureKind::Io,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Format { .. } => FailureKind::Format,
            Self::Parse { .. } => FailureKind::Parse,
            Self::Unexpected(_) => FailureKind::Unexpected,
        }
    }
}

/// Outcome of one read transaction
#[derive(Debug)]
pub enum TransactionResult {
    /// Sensor delivered a valid reading
    Success(TemperatureReading),
    /// Transaction failed; the port has been closed
    Failure(TransactionError),
}

impl TransactionResult {
    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The reading, if any
    pub fn reading(&self) -> Option<TemperatureReading> {
        match self {
            Self::Success(reading) => Some(*reading),
            Self::Failure(_) => None,
        }
    }

    /// Temperature in °C, if any
    pub fn temperature(&self) -> Option<f64> {
        self.reading().map(|r| r.celsius)
    }

    /// The error, if any
    pub fn error(&self) -> Option<&TransactionError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(e) => Some(e),
        }
    }

    /// Failure description; empty on success
    pub fn error_message(&self) -> String {
        self.error().map(ToString::to_string).unwrap_or_default()
    }

    /// Failure category, if failed
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error().map(TransactionError::kind)
    }

    /// Convert into a plain `Result`
    pub fn into_result(self) -> Result<TemperatureReading, TransactionError> {
        match self {
            Self::Success(reading) => Ok(reading),
            Self::Failure(e) => Err(e),
        }
    }
}

impl From<Result<TemperatureReading, TransactionError>> for TransactionResult {
    fn from(result: Result<TemperatureReading, TransactionError>) -> Self {
        match result {
            Ok(reading) => Self::Success(reading),
            Err(e) => Self::Failure(e),
        }
    }
}

/// A Papouch TM sensor on one serial port
#[derive(Debug, Clone)]
pub struct TmSensor<O = SystemPorts> {
    config: PortConfiguration,
    opener: O,
    timings: SettleTimings,
}

impl TmSensor<SystemPorts> {
    /// Sensor on a real serial port
    pub fn new(config: PortConfiguration) -> Self {
        Self::with_opener(config, SystemPorts)
    }
}

impl<O: PortOpener> TmSensor<O> {
    /// Sensor reached through `opener`
    pub fn with_opener(config: PortConfiguration, opener: O) -> Self {
        Self {
            config,
            opener,
            timings: SettleTimings::default(),
        }
    }

    /// Override the settle delays
    #[must_use]
    pub fn timings(mut self, timings: SettleTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Port configuration
    pub fn config(&self) -> &PortConfiguration {
        &self.config
    }

    /// The port opener
    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Run one read transaction.
    ///
    /// Blocks for the settle delays plus at most the read timeout.
    ///
    /// A panic inside the transaction comes back as
    /// [`TransactionError::Unexpected`], but the process panic hook still
    /// runs first; with the default hook that prints a "thread panicked"
    /// message to stderr. Applications that want it elsewhere install their
    /// own hook, as the `tmsensor` binary does.
    pub fn read_temperature(&self) -> TransactionResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run()));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(TransactionError::Unexpected(panic_message(payload.as_ref()))),
        };

        match &result {
            Ok(reading) => tracing::info!("{}: {}", self.config.port_name(), reading),
            Err(e) => tracing::debug!("{}: read failed ({}): {}", self.config.port_name(), e.kind(), e),
        }
        result.into()
    }

    fn run(&self) -> Result<TemperatureReading, TransactionError> {
        let mut session = SensorSession::open(&self.opener, &self.config, self.timings)?;

        let raw = protocol::read_line(session.link_mut()?, self.config.read_timeout())?;
        protocol::validate(&raw)?;
        let reading = protocol::parse(&raw)?;

        session.close();
        Ok(reading)
    }
}

impl<O: PortOpener + 'static> TmSensor<O> {
    /// Run one read transaction on the blocking thread pool
    pub async fn read_temperature_async(self) -> TransactionResult {
        match tokio::task::spawn_blocking(move || self.read_temperature()).await {
            Ok(result) => result,
            Err(e) => TransactionResult::Failure(TransactionError::Unexpected(e.to_string())),
        }
    }
}

/// Read the sensor on `config`'s port once
pub fn read_temperature(config: &PortConfiguration) -> TransactionResult {
    TmSensor::new(config.clone()).read_temperature()
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulator::SimulatedSensor;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn config() -> PortConfiguration {
        #[cfg(windows)]
        let name = "COM3";
        #[cfg(not(windows))]
        let name = "/dev/ttyUSB0";
        PortConfiguration::with_timeout(name, Duration::from_millis(1000)).unwrap()
    }

    #[test]
    fn test_result_accessors() {
        let ok = TransactionResult::Success(TemperatureReading::new(23.5));
        assert!(ok.is_success());
        assert_eq!(ok.temperature(), Some(23.5));
        assert_eq!(ok.error_message(), "");
        assert_eq!(ok.failure_kind(), None);

        let failed = TransactionResult::Failure(TransactionError::Timeout(Duration::from_secs(5)));
        assert!(!failed.is_success());
        assert_eq!(failed.temperature(), None);
        assert_eq!(failed.error_message(), "No response from sensor within 5000 ms");
        assert_eq!(failed.failure_kind(), Some(FailureKind::Timeout));
    }

    #[test]
    fn test_io_message_is_transparent() {
        let err = TransactionError::from(TransportError::PortNotFound("COM9".into()));
        assert_eq!(err.to_string(), "Port not found: COM9");
        assert_eq!(err.kind(), FailureKind::Io);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_read_is_not_a_warning() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let sensor = TmSensor::with_opener(config(), SimulatedSensor::reporting("23.5C"))
            .timings(SettleTimings::none());
        let result = tracing::subscriber::with_default(subscriber, || sensor.read_temperature());

        assert_eq!(result.failure_kind(), Some(FailureKind::Format));
        let logged = String::from_utf8_lossy(&capture.0.lock()).into_owned();
        assert!(logged.is_empty(), "unexpected log output: {logged}");
    }

    #[test]
    fn test_from_result() {
        let result: TransactionResult = Err(TransactionError::Format { raw: "x".into() }).into();
        assert_eq!(result.failure_kind(), Some(FailureKind::Format));
        assert!(result.into_result().is_err());
    }
}
