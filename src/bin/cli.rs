//! tmsensor CLI - Command-line interface
//!
//! Reads a Papouch TM sensor once and prints the result, for shell scripts
//! and cron jobs. Polling is left to the caller.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tmsensor_core::cli::{
    describe_panic, error_report, format_ports, format_result, load_settings, print_exit_codes,
    resolve_config,
};
use tmsensor_core::config::settings_path;
use tmsensor_core::core::transport::list_ports;
use tmsensor_core::{CliResult, ExitCodes, OutputFormat, SettleTimings, SimulatedSensor, TmSensor};
use tracing_subscriber::EnvFilter;

/// tmsensor CLI
#[derive(Parser, Debug)]
#[command(
    name = "tmsensor",
    author = "Termicon Team",
    version,
    about = "Read a Papouch TM serial thermometer",
    long_about = None
)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Emit diagnostics as JSON
    #[arg(long)]
    log_json: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(short, long, env = "TMSENSOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Take one temperature reading
    Read {
        /// Serial port name (e.g., COM3, /dev/ttyUSB0)
        #[arg(short, long, env = "TMSENSOR_PORT")]
        port: Option<String>,

        /// Read timeout in milliseconds (at least 1000)
        #[arg(short, long, env = "TMSENSOR_TIMEOUT_MS")]
        timeout: Option<u64>,

        /// Talk to a simulated sensor that sends LINE instead of a real port
        #[arg(long, value_name = "LINE")]
        simulate: Option<String>,
    },

    /// List available serial ports
    ListPorts {
        /// Show detailed info
        #[arg(short, long)]
        detailed: bool,
    },

    /// Print the exit code table
    ExitCodes,
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("{}", describe_panic(info.payload(), info.location()));
    }));
}

/// Result of a command, and whether it already reached stdout
struct Outcome {
    result: CliResult,
    printed: bool,
}

impl From<CliResult> for Outcome {
    fn from(result: CliResult) -> Self {
        Self {
            result,
            printed: false,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    install_panic_hook();

    tracing::debug!("Starting tmsensor v{}", tmsensor_core::VERSION);

    let outcome = match run(&cli).await {
        Ok(outcome) => outcome,
        Err(e) => CliResult::error(ExitCodes::ERROR, format!("{:#}", e)).into(),
    };

    if let Some(report) = error_report(&outcome.result, outcome.printed) {
        eprintln!("{}", report);
    }
    outcome.result.to_exit_code()
}

async fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    match &cli.command {
        Commands::Read {
            port,
            timeout,
            simulate,
        } => Ok(read(cli, port.as_deref(), *timeout, simulate.as_deref()).await),
        Commands::ListPorts { detailed } => {
            let ports = list_ports()?;
            if ports.is_empty() && matches!(cli.format, OutputFormat::Text) {
                if !cli.quiet {
                    println!("No serial ports found.");
                }
            } else {
                println!("{}", format_ports(&ports, *detailed, cli.format));
            }
            Ok(CliResult::success().into())
        }
        Commands::ExitCodes => {
            print_exit_codes();
            Ok(CliResult::success().into())
        }
    }
}

async fn read(
    cli: &Cli,
    port: Option<&str>,
    timeout_ms: Option<u64>,
    simulate: Option<&str>,
) -> Outcome {
    let flags_complete = port.is_some() && timeout_ms.is_some();
    let settings = match load_settings(cli.config.as_deref(), settings_path(), flags_complete) {
        Ok(settings) => settings,
        Err(result) => return result.into(),
    };
    let config = match resolve_config(port, timeout_ms, &settings, simulate.is_some()) {
        Ok(config) => config,
        Err(result) => return result.into(),
    };

    let result = match simulate {
        Some(line) => {
            TmSensor::with_opener(config.clone(), SimulatedSensor::reporting(line))
                .timings(SettleTimings::none())
                .read_temperature_async()
                .await
        }
        None => TmSensor::new(config.clone()).read_temperature_async().await,
    };

    let at = chrono::Utc::now();
    let printed = result.is_success() || !matches!(cli.format, OutputFormat::Text);
    if printed {
        println!("{}", format_result(&result, &config, at, cli.format));
    }
    Outcome {
        result: CliResult::from(&result),
        printed,
    }
}
