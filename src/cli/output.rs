//! Output formatting for readings and port listings

use crate::config::PortConfiguration;
use crate::core::transaction::TransactionResult;
use crate::core::transport::PortSummary;
use chrono::{DateTime, Utc};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object
    Json,
    /// CSV row with header
    Csv,
}

/// Format the outcome of one transaction
pub fn format_result(
    result: &TransactionResult,
    config: &PortConfiguration,
    at: DateTime<Utc>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => match result {
            TransactionResult::Success(reading) => reading.to_string(),
            TransactionResult::Failure(e) => format!("Error: {}", e),
        },
        OutputFormat::Json => serde_json::json!({
            "port": config.port_name(),
            "timestamp": at.to_rfc3339(),
            "success": result.is_success(),
            "temperature_c": result.temperature(),
            "error": result.error_message(),
            "failure_kind": result.failure_kind(),
        })
        .to_string(),
        OutputFormat::Csv => {
            let temperature = result
                .temperature()
                .map(|t| format!("{:.1}", t))
                .unwrap_or_default();
            let kind = result.failure_kind().map(|k| k.to_string()).unwrap_or_default();
            format!(
                "timestamp,port,temperature_c,failure_kind,error\n{},{},{},{},{}",
                at.to_rfc3339(),
                csv_field(config.port_name()),
                temperature,
                kind,
                csv_field(&result.error_message())
            )
        }
    }
}

/// Format a port listing
pub fn format_ports(ports: &[PortSummary], detailed: bool, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(ports).unwrap_or_else(|_| "[]".into()),
        OutputFormat::Csv => {
            let mut out = String::from("name,type,product");
            for port in ports {
                out.push_str(&format!(
                    "\n{},{},{}",
                    csv_field(&port.name),
                    port.kind,
                    csv_field(port.product.as_deref().unwrap_or(""))
                ));
            }
            out
        }
        OutputFormat::Text if detailed => {
            let mut out = format!("Available Serial Ports:\n{:-<60}", "");
            for port in ports {
                out.push_str(&format!("\n  {} [{}]", port.name, port.kind));
                if let Some(product) = &port.product {
                    out.push_str(&format!(" {}", product));
                }
            }
            out
        }
        OutputFormat::Text => ports
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
