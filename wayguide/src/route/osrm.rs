//! OSRM route document parsing.
//!
//! The routing backends this engine descends from speak the OSRM `route/v1`
//! response shape (`overview=full&geometries=geojson`): distances in meters,
//! durations in seconds, GeoJSON coordinates as `[lon, lat]` pairs, and an
//! optional per-leg step breakdown with maneuver type/modifier. This module
//! holds the serde model of that document and the conversion into [`Route`].
//!
//! The engine itself never performs HTTP; documents arrive from collaborators,
//! replay files, or test fixtures.

use serde::Deserialize;

use super::{Leg, Maneuver, Route, Step};
use crate::error::RoutingError;
use crate::geo::Point;

#[derive(Debug, Deserialize)]
struct OsrmDocument {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    geometry: Option<OsrmGeometry>,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    duration: f64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    geometry: Option<OsrmGeometry>,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    maneuver_type: String,
    #[serde(default)]
    modifier: Option<String>,
    #[serde(default)]
    location: Option<[f64; 2]>,
}

/// Parses an OSRM route document into a [`Route`].
///
/// Takes the first route in the document. Documents without a step breakdown
/// fall back to the overview geometry (a route with zero steps).
///
/// # Errors
///
/// [`RoutingError::Backend`] for malformed JSON, a non-"Ok" response code, or
/// a route without geometry; [`RoutingError::NoRouteFound`] when the document
/// carries no routes.
pub fn parse_osrm_route(json: &str) -> Result<Route, RoutingError> {
    let document: OsrmDocument = serde_json::from_str(json).map_err(|e| RoutingError::Backend {
        message: format!("malformed route document: {e}"),
    })?;

    if let Some(code) = &document.code {
        if code != "Ok" {
            return Err(RoutingError::Backend {
                message: format!("backend returned code {code:?}"),
            });
        }
    }

    let raw = document
        .routes
        .into_iter()
        .next()
        .ok_or(RoutingError::NoRouteFound)?;

    convert_route(raw)
}

fn convert_route(raw: OsrmRoute) -> Result<Route, RoutingError> {
    let has_steps = raw.legs.iter().any(|leg| !leg.steps.is_empty());

    let route = if has_steps {
        let legs = raw.legs.into_iter().map(convert_leg).collect();
        Route::from_legs(legs, raw.distance, raw.duration)
    } else {
        let points = raw
            .geometry
            .map(|g| to_points(&g.coordinates))
            .unwrap_or_default();
        Route::from_polyline(points, raw.distance, raw.duration)
    };

    if !route.has_geometry() {
        return Err(RoutingError::Backend {
            message: "route document has no geometry".to_owned(),
        });
    }

    Ok(route)
}

fn convert_leg(raw: OsrmLeg) -> Leg {
    Leg {
        steps: raw.steps.into_iter().map(convert_step).collect(),
        distance_m: raw.distance,
        duration_s: raw.duration,
    }
}

fn convert_step(raw: OsrmStep) -> Step {
    let polyline = raw
        .geometry
        .map(|g| to_points(&g.coordinates))
        .unwrap_or_default();

    let location = raw
        .maneuver
        .location
        .map(|c| Point::new(c[1], c[0]))
        .or_else(|| polyline.first().copied())
        .unwrap_or(Point::new(0.0, 0.0));

    let instruction = instruction_text(
        &raw.maneuver.maneuver_type,
        raw.maneuver.modifier.as_deref(),
        &raw.name,
    );

    Step {
        instruction,
        name: raw.name,
        maneuver: Maneuver {
            maneuver_type: raw.maneuver.maneuver_type,
            modifier: raw.maneuver.modifier,
            location,
        },
        polyline,
        distance_m: raw.distance,
        duration_s: raw.duration,
    }
}

/// GeoJSON order is `[lon, lat]`.
fn to_points(coordinates: &[[f64; 2]]) -> Vec<Point> {
    coordinates.iter().map(|c| Point::new(c[1], c[0])).collect()
}

/// Synthesizes human-facing instruction text from a maneuver descriptor.
fn instruction_text(maneuver_type: &str, modifier: Option<&str>, name: &str) -> String {
    let phrase = match maneuver_type {
        "arrive" => return "You have arrived at your destination".to_owned(),
        "depart" => "Head out",
        "continue" | "new name" => "Continue",
        "merge" => "Merge",
        "on ramp" => "Take the ramp",
        "off ramp" => "Take the exit",
        "roundabout" | "rotary" => "Enter the roundabout",
        "turn" | "fork" | "end of road" => turn_phrase(modifier),
        _ => "Continue",
    };

    if name.is_empty() {
        phrase.to_owned()
    } else {
        format!("{phrase} onto {name}")
    }
}

fn turn_phrase(modifier: Option<&str>) -> &'static str {
    match modifier {
        Some("left") => "Turn left",
        Some("slight left") => "Slight left",
        Some("sharp left") => "Sharp left",
        Some("right") => "Turn right",
        Some("slight right") => "Slight right",
        Some("sharp right") => "Sharp right",
        Some("uturn") => "Make a U-turn",
        _ => "Continue straight",
    }
}
