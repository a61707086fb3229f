//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use wayguide::RoutingError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to read a routing document from disk
    FileRead { path: String, error: std::io::Error },
    /// Failed to parse a routing document
    RouteParse { path: String, error: RoutingError },
    /// Failed to start the async runtime
    RuntimeInit(std::io::Error),
    /// Simulation could not run against the parsed route
    Simulation(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        if let CliError::RouteParse { .. } = self {
            eprintln!();
            eprintln!("Expected an OSRM route/v1 response document, e.g.:");
            eprintln!(
                "  curl 'https://router.project-osrm.org/route/v1/driving/\
                 <lon>,<lat>;<lon>,<lat>?overview=full&geometries=geojson&steps=true'"
            );
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read route file '{}': {}", path, error)
            }
            CliError::RouteParse { path, error } => {
                write!(f, "Failed to parse route file '{}': {}", path, error)
            }
            CliError::RuntimeInit(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Simulation(msg) => write!(f, "Simulation error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::FileRead { error, .. } => Some(error),
            CliError::RouteParse { error, .. } => Some(error),
            CliError::RuntimeInit(e) => Some(e),
            _ => None,
        }
    }
}
