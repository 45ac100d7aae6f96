//! Papouch TM temperature protocol
//!
//! Once DTR is asserted the sensor transmits readings as ASCII lines:
//!
//! ```text
//! +023.5C\r
//! ```
//!
//! A sign, exactly three digits, a decimal point, one digit and a `C`
//! suffix, terminated by a carriage return.

use crate::config::LINE_TERMINATOR;
use crate::core::transaction::TransactionError;
use crate::core::transport::SerialLink;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Longest line accepted before the terminator. A valid reading is 7 bytes.
pub const MAX_LINE_LEN: usize = 32;

const WIRE_FORMAT: &str = r"^[+-][0-9]{3}\.[0-9]C$";

/// Characters of a valid line holding the number (sign, digits, point, digit)
const NUMERIC_LEN: usize = 6;

fn wire_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(WIRE_FORMAT).expect("wire format pattern is valid"))
}

/// One line received from the sensor, terminator stripped, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReading(String);

impl RawReading {
    /// Wrap received text
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Line text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }
}

impl fmt::Display for RawReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A temperature as delivered by the sensor, in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureReading {
    /// Degrees Celsius, one decimal digit
    pub celsius: f64,
}

impl TemperatureReading {
    /// Create a reading
    pub fn new(celsius: f64) -> Self {
        Self { celsius }
    }
}

impl fmt::Display for TemperatureReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} °C", self.celsius)
    }
}

/// Read one terminated line, waiting at most `timeout` in total.
///
/// Bytes after the terminator in the same chunk are dropped; one transaction
/// only ever consumes one line.
pub fn read_line(link: &mut dyn SerialLink, timeout: Duration) -> Result<RawReading, TransactionError> {
    let deadline = Instant::now() + timeout;
    let mut line: Vec<u8> = Vec::with_capacity(MAX_LINE_LEN);
    let mut chunk = [0u8; MAX_LINE_LEN];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(timed_out(timeout, &line));
        }
        link.set_timeout(remaining)?;

        match link.read(&mut chunk) {
            Ok(0) => {
                return Err(TransactionError::Io(
                    std::io::Error::new(ErrorKind::UnexpectedEof, "serial link closed").into(),
                ));
            }
            Ok(n) => {
                let received = &chunk[..n];
                if let Some(end) = received.iter().position(|&b| b == LINE_TERMINATOR) {
                    line.extend_from_slice(&received[..end]);
                    if line.len() > MAX_LINE_LEN {
                        return Err(too_long(&line));
                    }
                    let raw = RawReading::from_bytes(&line);
                    tracing::debug!("Received line {:?}", raw.as_str());
                    return Ok(raw);
                }
                line.extend_from_slice(received);
                if line.len() > MAX_LINE_LEN {
                    return Err(too_long(&line));
                }
            }
            Err(ref e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransactionError::Io(e.into())),
        }
    }
}

fn timed_out(timeout: Duration, partial: &[u8]) -> TransactionError {
    if !partial.is_empty() {
        tracing::debug!("Timed out with partial line {:?}", String::from_utf8_lossy(partial));
    }
    TransactionError::Timeout(timeout)
}

fn too_long(line: &[u8]) -> TransactionError {
    TransactionError::Format {
        raw: String::from_utf8_lossy(line).into_owned(),
    }
}

/// Check a line against the wire format
pub fn validate(raw: &RawReading) -> Result<(), TransactionError> {
    if wire_format().is_match(raw.as_str()) {
        Ok(())
    } else {
        Err(TransactionError::Format {
            raw: raw.as_str().to_string(),
        })
    }
}

/// Parse a validated line.
///
/// Rust's float parsing always uses `.` as the decimal separator, whatever
/// the host locale.
pub fn parse(raw: &RawReading) -> Result<TemperatureReading, TransactionError> {
    let parse_error = || TransactionError::Parse {
        raw: raw.as_str().to_string(),
    };

    let numeric = raw.as_str().get(..NUMERIC_LEN).ok_or_else(parse_error)?;
    let celsius: f64 = numeric.parse().map_err(|_| parse_error())?;
    Ok(TemperatureReading::new(celsius))
}
