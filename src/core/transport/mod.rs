//! Transport layer for the sensor's serial link
//!
//! A transaction never touches `serialport` directly. It asks a
//! [`PortOpener`] for a [`SerialLink`] and drives that, so the same
//! sequence runs against real hardware or the simulated sensor.

mod serial;

pub use serial::{list_ports, PortSummary, SerialPortLink, SystemPorts};

use crate::config::PortConfiguration;
use std::time::Duration;
use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Port already in use
    #[error("Port already in use: {0}")]
    PortInUse(String),

    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Control line or buffer operation rejected by the driver
    #[error("Line control failed: {0}")]
    LineControl(String),

    /// Session has no open handle
    #[error("Not connected")]
    NotConnected,

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// One open serial handle, as seen by a sensor session
#[cfg_attr(test, mockall::automock)]
pub trait SerialLink: Send {
    /// Discard bytes already received but not yet read
    fn clear_input(&mut self) -> Result<(), TransportError>;

    /// Set the Data-Terminal-Ready line
    fn set_dtr(&mut self, level: bool) -> Result<(), TransportError>;

    /// Bound the next blocking read
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError>;

    /// Blocking read; `TimedOut` when nothing arrives within the timeout
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Stop using the handle. Resources are released when the link is dropped.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Acquires serial links
pub trait PortOpener: Send + Sync {
    /// Open the port named by `config` with the sensor's fixed line settings
    fn open(&self, config: &PortConfiguration) -> Result<Box<dyn SerialLink>, TransportError>;
}
