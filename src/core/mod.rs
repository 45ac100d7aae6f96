//! Core module containing the sensor driver
//!
//! This module provides:
//! - Transport layer: the serial link seam and its `serialport` backend
//! - Session management with the sensor's settle timing
//! - The TM line protocol (read, validate, parse)
//! - The read transaction
//! - A virtual sensor for testing

pub mod protocol;
pub mod session;
pub mod simulator;
pub mod transaction;
pub mod transport;
