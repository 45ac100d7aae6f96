//! Virtual TM sensor
//!
//! A scriptable stand-in for the physical device, for tests and for
//! `tmsensor read --simulate`. It behaves like the real sensor in the ways
//! the transaction depends on: nothing is transmitted until DTR is asserted,
//! stale bytes sit in the input buffer until discarded, and reads block for
//! the configured timeout when the line is silent.
//!
//! Every open, close and release is counted so callers can check that a
//! transaction left no handle behind.

use super::transport::{PortOpener, SerialLink, TransportError};
use crate::config::PortConfiguration;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

/// How the simulated sensor responds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorBehavior {
    /// Transmit these bytes once DTR is asserted
    Respond(Vec<u8>),
    /// Never transmit
    Silent,
    /// Refuse to open the port
    FailOpen(OpenFault),
    /// Reject the DTR change
    FailDtr,
    /// Return a line-level I/O error on read
    FailRead,
    /// Panic inside read, as a driver bug would
    PanicOnRead,
}

impl SensorBehavior {
    /// Transmit `line` followed by the carriage-return terminator
    pub fn line(line: &str) -> Self {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(crate::config::LINE_TERMINATOR);
        Self::Respond(bytes)
    }
}

/// Open failure to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFault {
    /// Device absent
    NotFound,
    /// Access denied
    PermissionDenied,
    /// Another process holds the port
    Busy,
}

/// Counters for one simulated sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatorStats {
    /// Successful opens
    pub opens: u64,
    /// Calls to close
    pub closes: u64,
    /// Handles dropped
    pub releases: u64,
    /// DTR assertions
    pub dtr_asserted: u64,
    /// Stale bytes thrown away by input discards
    pub bytes_discarded: u64,
    /// Bytes handed to reads
    pub bytes_read: u64,
}

impl SimulatorStats {
    /// Handles opened but not yet released
    pub fn open_handles(&self) -> u64 {
        self.opens - self.releases
    }
}

/// Simulated sensor, usable as a [`PortOpener`]
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    behavior: Arc<RwLock<SensorBehavior>>,
    stale: Arc<RwLock<Vec<u8>>>,
    chunk_size: usize,
    fail_close: bool,
    stats: Arc<RwLock<SimulatorStats>>,
}

impl SimulatedSensor {
    /// Create a sensor with the given behavior
    pub fn new(behavior: SensorBehavior) -> Self {
        Self {
            behavior: Arc::new(RwLock::new(behavior)),
            stale: Arc::new(RwLock::new(Vec::new())),
            chunk_size: 4,
            fail_close: false,
            stats: Arc::new(RwLock::new(SimulatorStats::default())),
        }
    }

    /// Sensor that reports `line` on every transaction
    pub fn reporting(line: &str) -> Self {
        Self::new(SensorBehavior::line(line))
    }

    /// Leave `bytes` in the input buffer of the next opened handle
    #[must_use]
    pub fn stale_bytes(self, bytes: &[u8]) -> Self {
        *self.stale.write() = bytes.to_vec();
        self
    }

    /// Deliver at most `size` bytes per read
    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Make every close report an error
    #[must_use]
    pub fn fail_close(mut self, enable: bool) -> Self {
        self.fail_close = enable;
        self
    }

    /// Change behavior for subsequent transactions
    pub fn set_behavior(&self, behavior: SensorBehavior) {
        *self.behavior.write() = behavior;
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> SimulatorStats {
        *self.stats.read()
    }
}

impl PortOpener for SimulatedSensor {
    fn open(&self, config: &PortConfiguration) -> Result<Box<dyn SerialLink>, TransportError> {
        let behavior = self.behavior.read().clone();
        let name = config.port_name().to_string();
        if let SensorBehavior::FailOpen(fault) = behavior {
            return Err(match fault {
                OpenFault::NotFound => TransportError::PortNotFound(name),
                OpenFault::PermissionDenied => TransportError::PermissionDenied(name),
                OpenFault::Busy => TransportError::PortInUse(name),
            });
        }

        self.stats.write().opens += 1;
        tracing::debug!("Simulated sensor opened on {}", name);

        Ok(Box::new(SimulatedLink {
            behavior,
            input: self.stale.read().iter().copied().collect(),
            timeout: config.read_timeout(),
            chunk_size: self.chunk_size,
            fail_close: self.fail_close,
            closed: false,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct SimulatedLink {
    behavior: SensorBehavior,
    input: VecDeque<u8>,
    timeout: Duration,
    chunk_size: usize,
    fail_close: bool,
    closed: bool,
    stats: Arc<RwLock<SimulatorStats>>,
}

impl SerialLink for SimulatedLink {
    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.stats.write().bytes_discarded += self.input.len() as u64;
        self.input.clear();
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> Result<(), TransportError> {
        match &self.behavior {
            SensorBehavior::FailDtr => {
                Err(TransportError::LineControl("DTR change rejected".to_string()))
            }
            SensorBehavior::Respond(bytes) if level => {
                self.stats.write().dtr_asserted += 1;
                self.input.extend(bytes.iter().copied());
                Ok(())
            }
            _ => {
                if level {
                    self.stats.write().dtr_asserted += 1;
                }
                Ok(())
            }
        }
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.timeout = timeout;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::new(ErrorKind::NotConnected, "port closed"));
        }
        match self.behavior {
            SensorBehavior::FailRead => {
                return Err(std::io::Error::new(ErrorKind::BrokenPipe, "device unplugged"));
            }
            SensorBehavior::PanicOnRead => panic!("simulated driver fault"),
            _ => {}
        }

        if self.input.is_empty() {
            std::thread::sleep(self.timeout);
            return Err(ErrorKind::TimedOut.into());
        }

        let n = self.input.len().min(self.chunk_size).min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(self.input.drain(..n)) {
            *slot = byte;
        }
        self.stats.write().bytes_read += n as u64;
        Ok(n)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.stats.write().closes += 1;
        self.closed = true;
        if self.fail_close {
            return Err(TransportError::LineControl("simulated close failure".to_string()));
        }
        Ok(())
    }
}

impl Drop for SimulatedLink {
    fn drop(&mut self) {
        self.stats.write().releases += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PortConfiguration {
        #[cfg(windows)]
        let name = "COM4";
        #[cfg(not(windows))]
        let name = "/dev/ttyUSB1";
        PortConfiguration::new(name).unwrap()
    }

    #[test]
    fn test_transmits_only_after_dtr() {
        let sensor = SimulatedSensor::reporting("+021.0C").chunk_size(64);
        let mut link = sensor.open(&config()).unwrap();
        link.set_timeout(Duration::from_millis(1)).unwrap();

        let mut buf = [0u8; 16];
        let err = link.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);

        link.set_dtr(true).unwrap();
        let n = link.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"+021.0C\r");
    }

    #[test]
    fn test_stale_bytes_discarded() {
        let sensor = SimulatedSensor::reporting("+021.0C").stale_bytes(b"garbage");
        let mut link = sensor.open(&config()).unwrap();
        link.clear_input().unwrap();
        assert_eq!(sensor.stats().bytes_discarded, 7);
    }

    #[test]
    fn test_counts_open_close_release() {
        let sensor = SimulatedSensor::reporting("+021.0C");
        let mut link = sensor.open(&config()).unwrap();
        assert_eq!(sensor.stats().open_handles(), 1);

        link.close().unwrap();
        drop(link);

        let stats = sensor.stats();
        assert_eq!((stats.opens, stats.closes, stats.releases), (1, 1, 1));
        assert_eq!(stats.open_handles(), 0);
    }

    #[test]
    fn test_open_faults() {
        let sensor = SimulatedSensor::new(SensorBehavior::FailOpen(OpenFault::Busy));
        assert!(matches!(sensor.open(&config()), Err(TransportError::PortInUse(_))));
        assert_eq!(sensor.stats().opens, 0);
    }
}
