//! Wayguide CLI - Command-line interface
//!
//! This binary provides route inspection and drive simulation on top of the
//! wayguide library.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use commands::route_info::{self, RouteInfoArgs};
use commands::simulate::{self, SimulateArgs};
use error::CliError;

#[derive(Parser)]
#[command(name = "wayguide")]
#[command(version = wayguide::VERSION)]
#[command(about = "Replay routes and simulate drives against the navigation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of an OSRM routing document
    RouteInfo {
        /// Path to an OSRM route/v1 JSON document
        route: String,
    },

    /// Drive a synthetic traveler along a route through a live session
    Simulate {
        /// Path to an OSRM route/v1 JSON document
        route: String,

        /// Travel speed in meters per second
        #[arg(long, default_value = "13.9")]
        speed_mps: f64,

        /// Milliseconds between position fixes
        #[arg(long, default_value = "200")]
        interval_ms: u64,

        /// Step index at which to leave the route
        #[arg(long, requires = "deviate_m")]
        deviate_at: Option<usize>,

        /// Sideways offset in meters while deviating
        #[arg(long, requires = "deviate_at")]
        deviate_m: Option<f64>,

        /// Routing document served when the session requests a reroute
        #[arg(long)]
        reroute_file: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        error.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    init_logging()?;
    tracing::info!(version = wayguide::VERSION, "Wayguide CLI starting");

    match cli.command {
        Commands::RouteInfo { route } => route_info::run(RouteInfoArgs { route }),
        Commands::Simulate {
            route,
            speed_mps,
            interval_ms,
            deviate_at,
            deviate_m,
            reroute_file,
        } => simulate::run(SimulateArgs {
            route,
            speed_mps,
            interval_ms,
            deviate_at,
            deviate_m,
            reroute_file,
        }),
    }
}

/// Installs a compact stderr subscriber honoring `RUST_LOG`.
fn init_logging() -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}
