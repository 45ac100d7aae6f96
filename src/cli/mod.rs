//! CLI Module
//!
//! Provides command-line interface functionality including:
//! - Exit codes for automation
//! - Output formatting for readings
//! - Configuration resolution and failure reporting

pub mod exit_codes;
pub mod output;
pub mod report;
pub mod resolve;

pub use exit_codes::{exit_code_description, print_exit_codes, CliResult, ExitCodes};
pub use output::{format_ports, format_result, OutputFormat};
pub use report::{describe_panic, error_report};
pub use resolve::{load_settings, resolve_config, SIMULATED_PORT};
