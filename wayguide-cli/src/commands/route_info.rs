//! Route-info command - summarize a routing document.

use std::fs;

use wayguide::eta::format_duration;
use wayguide::instruction::{direction_for_maneuver, format_distance};
use wayguide::route::{parse_osrm_route, Route};

use crate::error::CliError;

/// Arguments for the route-info command.
pub struct RouteInfoArgs {
    pub route: String,
}

/// Run the route-info command.
pub fn run(args: RouteInfoArgs) -> Result<(), CliError> {
    let route = load_route(&args.route)?;

    println!("Route: {}", args.route);
    println!("  Distance: {}", format_distance(route.total_distance_m()));
    println!("  Duration: {}", format_duration(route.total_duration_s()));
    println!("  Steps: {}", route.step_count());
    println!();

    for (index, step) in route.steps().enumerate() {
        let direction = direction_for_maneuver(&step.maneuver);
        println!(
            "  {:>3}. [{}] {} ({})",
            index + 1,
            direction,
            step.instruction,
            format_distance(step.distance_m)
        );
    }

    Ok(())
}

/// Reads and parses an OSRM routing document from disk.
pub fn load_route(path: &str) -> Result<Route, CliError> {
    let body = fs::read_to_string(path).map_err(|error| CliError::FileRead {
        path: path.to_owned(),
        error,
    })?;
    parse_osrm_route(&body).map_err(|error| CliError::RouteParse {
        path: path.to_owned(),
        error,
    })
}
