//! Protocol implementations
//!
//! Provides the line reader and parser for the Papouch TM sensor's ASCII
//! protocol.

pub mod tm;

pub use tm::{parse, read_line, validate, RawReading, TemperatureReading, MAX_LINE_LEN};
