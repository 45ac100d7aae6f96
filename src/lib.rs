//! # TM Sensor Core Library
//!
//! Driver for the Papouch TM serial thermometer. The sensor sits on an
//! RS-232 or USB-serial port, starts transmitting when DTR is asserted and
//! reports lines such as `+023.5C`.
//!
//! ## Features
//!
//! - One blocking request/response transaction per call
//! - Power-up settle timing handled for you
//! - The port is always closed before the call returns
//! - Typed failures: I/O, timeout, format, parse
//! - Simulated sensor for tests and demos
//!
//! ## Example
//!
//! ```rust,no_run
//! use tmsensor_core::{PortConfiguration, TmSensor, TransactionResult};
//!
//! let config = PortConfiguration::new("/dev/ttyUSB0")?;
//! match TmSensor::new(config).read_temperature() {
//!     TransactionResult::Success(reading) => println!("{}", reading),
//!     TransactionResult::Failure(e) => eprintln!("read failed: {}", e),
//! }
//! # Ok::<(), tmsensor_core::ConfigurationError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes, OutputFormat};
pub use crate::config::{ConfigurationError, PortConfiguration, SensorSettings};
pub use crate::core::protocol::{RawReading, TemperatureReading};
pub use crate::core::session::{SensorSession, SessionState, SettleTimings};
pub use crate::core::simulator::{OpenFault, SensorBehavior, SimulatedSensor, SimulatorStats};
pub use crate::core::transaction::{
    read_temperature, FailureKind, TmSensor, TransactionError, TransactionResult,
};
pub use crate::core::transport::{PortOpener, SerialLink, SystemPorts, TransportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
