//! Serial port transport implementation

use super::{PortOpener, SerialLink, TransportError};
use crate::config::{PortConfiguration, BAUD_RATE};
use serde::Serialize;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use std::io::Read;
use std::time::Duration;

/// Opens ports through the operating system's serial driver
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortOpener for SystemPorts {
    fn open(&self, config: &PortConfiguration) -> Result<Box<dyn SerialLink>, TransportError> {
        let name = config.port_name();
        let port = serialport::new(name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| map_open_error(name, e))?;

        tracing::debug!("Opened {}", config.connection_info());
        Ok(Box::new(SerialPortLink::new(port)))
    }
}

fn map_open_error(name: &str, e: serialport::Error) -> TransportError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => TransportError::PortNotFound(name.to_string()),
        serialport::ErrorKind::Io(io_kind) => match io_kind {
            std::io::ErrorKind::NotFound => TransportError::PortNotFound(name.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                TransportError::PermissionDenied(name.to_string())
            }
            std::io::ErrorKind::AddrInUse | std::io::ErrorKind::WouldBlock => {
                TransportError::PortInUse(name.to_string())
            }
            _ => TransportError::ConnectionFailed(e.to_string()),
        },
        _ => TransportError::ConnectionFailed(e.to_string()),
    }
}

fn line_control(e: serialport::Error) -> TransportError {
    TransportError::LineControl(e.to_string())
}

/// [`SerialLink`] over a `serialport` handle
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
}

impl SerialPortLink {
    /// Wrap an already opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl SerialLink for SerialPortLink {
    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.port.clear(ClearBuffer::Input).map_err(line_control)
    }

    fn set_dtr(&mut self, level: bool) -> Result<(), TransportError> {
        self.port.write_data_terminal_ready(level).map_err(line_control)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.port.set_timeout(timeout).map_err(line_control)
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }

    // The OS handle itself is released when `port` is dropped.
    fn close(&mut self) -> Result<(), TransportError> {
        self.port.write_data_terminal_ready(false).map_err(line_control)?;
        self.port.clear(ClearBuffer::All).map_err(line_control)
    }
}

/// Summary of one serial port found on the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSummary {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,
    /// "usb", "pci", "bluetooth" or "unknown"
    pub kind: &'static str,
    /// USB product string, when known
    pub product: Option<String>,
}

/// List available serial ports, sorted by name
pub fn list_ports() -> Result<Vec<PortSummary>, TransportError> {
    let ports = serialport::available_ports().map_err(|e| TransportError::IoError(e.into()))?;

    let mut summaries: Vec<PortSummary> = ports
        .into_iter()
        .map(|info| {
            let (kind, product) = match info.port_type {
                SerialPortType::UsbPort(usb) => ("usb", usb.product),
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                SerialPortType::Unknown => ("unknown", None),
            };
            PortSummary {
                name: info.port_name,
                kind,
                product,
            }
        })
        .collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_no_device() {
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        assert!(matches!(map_open_error("COM7", err), TransportError::PortNotFound(p) if p == "COM7"));
    }

    #[test]
    fn test_map_permission_denied() {
        let err = serialport::Error::new(
            serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied),
            "denied",
        );
        assert!(matches!(
            map_open_error("/dev/ttyUSB0", err),
            TransportError::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_map_other_errors() {
        let err = serialport::Error::new(serialport::ErrorKind::InvalidInput, "bad baud");
        let mapped = map_open_error("/dev/ttyUSB0", err);
        assert!(matches!(mapped, TransportError::ConnectionFailed(ref m) if m.contains("bad baud")));
    }

    #[test]
    fn test_list_ports() {
        // Only checks that enumeration does not panic on this host
        if let Ok(ports) = list_ports() {
            for port in &ports {
                println!("Found port: {} [{}]", port.name, port.kind);
            }
        }
    }
}
