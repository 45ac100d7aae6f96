//! Reporting failures that did not reach stdout

use super::exit_codes::CliResult;
use std::any::Any;
use std::panic::Location;

/// The stderr line for `result`, if one is owed.
///
/// `printed` says the outcome was already written to stdout as a formatted
/// result (JSON or CSV); everything else that failed gets reported here,
/// whatever the output format.
pub fn error_report(result: &CliResult, printed: bool) -> Option<String> {
    match result {
        CliResult::Error(_, msg) if !printed => Some(format!("Error: {}", msg)),
        _ => None,
    }
}

/// One-line description of a panic for the diagnostics log
pub fn describe_panic(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> String {
    let message = crate::core::transaction::panic_message(payload);
    match location {
        Some(loc) => format!("panic at {}:{}: {}", loc.file(), loc.line(), message),
        None => format!("panic: {}", message),
    }
}
