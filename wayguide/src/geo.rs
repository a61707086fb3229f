//! Geospatial math for route tracking.
//!
//! Pure functions over WGS84 coordinates (lat/lon in degrees): great-circle
//! distance, projection of a position onto a route polyline, and cumulative
//! remaining distance. No state, no side effects.
//!
//! Distances use a spherical-earth haversine; per-segment projection uses a
//! planar approximation with latitude-scaled longitude, which is accurate for
//! the short segments routing backends emit (well under 10 km).

use crate::position::Position;

/// Earth radius in meters (spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// One polyline vertex.
///
/// Routes carry these instead of full [`Position`] fixes: a vertex has no
/// timestamp, speed, or accuracy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Point {
    /// Creates a vertex at the given coordinates.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<&Position> for Point {
    fn from(fix: &Position) -> Self {
        Self {
            lat: fix.latitude,
            lon: fix.longitude,
        }
    }
}

/// Result of projecting a position onto a polyline.
#[derive(Debug, Clone, Copy)]
pub struct PolylineProjection {
    /// Nearest point on the polyline.
    pub point: Point,
    /// Index of the segment whose projection was nearest (0-based, segment
    /// `i` spans vertices `i` and `i + 1`).
    pub segment_index: usize,
    /// Distance from the position to the nearest point, in meters.
    pub distance_m: f64,
    /// Distance along the polyline from its start to the projected point,
    /// in meters.
    pub distance_along_m: f64,
}

/// Haversine distance between two points in meters.
///
/// Deterministic and side-effect free. Non-finite coordinates yield 0.0
/// rather than poisoning downstream arithmetic with NaN.
pub fn distance_meters(a: Point, b: Point) -> f64 {
    if !(a.lat.is_finite() && a.lon.is_finite() && b.lat.is_finite() && b.lon.is_finite()) {
        return 0.0;
    }

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Total length of a polyline in meters.
pub fn polyline_length_m(points: &[Point]) -> f64 {
    points.windows(2).map(|w| distance_meters(w[0], w[1])).sum()
}

/// Initial bearing from `a` to `b` in degrees (0-360, 0 = north).
pub fn bearing_degrees(a: Point, b: Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let mut bearing = y.atan2(x).to_degrees();
    if bearing < 0.0 {
        bearing += 360.0;
    }
    bearing
}

/// Projects a position onto the nearest segment of a polyline.
///
/// Scans every segment, computing the clamped perpendicular projection and
/// its distance; keeps the nearest. The comparison is strict, so on an exact
/// tie the earliest segment wins, which keeps progress monotonic when a route
/// doubles back near itself. Linear in polyline length with no early exit.
///
/// Returns `None` if the polyline has fewer than 2 vertices.
pub fn closest_point_on_polyline(position: Point, polyline: &[Point]) -> Option<PolylineProjection> {
    if polyline.len() < 2 {
        return None;
    }

    let mut best: Option<PolylineProjection> = None;
    let mut cumulative = 0.0;

    for (i, segment) in polyline.windows(2).enumerate() {
        let a = segment[0];
        let b = segment[1];
        let seg_len = distance_meters(a, b);

        let projected = project_on_segment(position, a, b);
        let dist = distance_meters(position, projected);
        let along = cumulative + distance_meters(a, projected);

        let is_better = match &best {
            Some(prev) => dist < prev.distance_m,
            None => true,
        };

        if is_better {
            best = Some(PolylineProjection {
                point: projected,
                segment_index: i,
                distance_m: dist,
                distance_along_m: along,
            });
        }

        cumulative += seg_len;
    }

    best
}

/// Remaining distance from a position to the end of a polyline, in meters.
///
/// The sum of: the distance from `position` to its projection on segment
/// `from_segment_index`, the distance from that projection to the segment's
/// end, and the lengths of all later segments. Out-of-range segment indices
/// clamp to the final segment.
///
/// Returns 0.0 for polylines with fewer than 2 vertices.
pub fn remaining_distance_m(position: Point, polyline: &[Point], from_segment_index: usize) -> f64 {
    if polyline.len() < 2 {
        return 0.0;
    }

    let seg = from_segment_index.min(polyline.len() - 2);
    let a = polyline[seg];
    let b = polyline[seg + 1];

    let projected = project_on_segment(position, a, b);
    let to_polyline = distance_meters(position, projected);
    let to_segment_end = distance_meters(projected, b);
    let rest: f64 = polyline[seg + 1..]
        .windows(2)
        .map(|w| distance_meters(w[0], w[1]))
        .sum();

    to_polyline + to_segment_end + rest
}

/// Projects a point onto a line segment, clamped to the segment's endpoints.
///
/// Planar approximation with longitude scaled by the cosine of the segment's
/// mean latitude. Degenerate (near zero-length) segments project to their
/// first endpoint.
fn project_on_segment(p: Point, a: Point, b: Point) -> Point {
    let cos_lat = ((a.lat + b.lat) / 2.0).to_radians().cos();

    let dx = (b.lon - a.lon) * cos_lat;
    let dy = b.lat - a.lat;
    let px = (p.lon - a.lon) * cos_lat;
    let py = p.lat - a.lat;

    let seg_len_sq = dx * dx + dy * dy;
    if seg_len_sq < 1e-20 {
        return a;
    }

    let t = ((px * dx + py * dy) / seg_len_sq).clamp(0.0, 1.0);

    Point {
        lat: a.lat + t * (b.lat - a.lat),
        lon: a.lon + t * (b.lon - a.lon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> Point {
        Point::new(lat, lon)
    }

    // ==================== Distance ====================

    #[test]
    fn distance_same_point_is_zero() {
        let p = pt(37.7749, -122.4194);
        assert!(distance_meters(p, p).abs() < 0.01);
    }

    #[test]
    fn distance_one_equator_degree() {
        // One degree of longitude at the equator, radius 6,371,000 m.
        let dist = distance_meters(pt(0.0, 0.0), pt(0.0, 1.0));
        assert!(
            (dist - 111_195.0).abs() < 100.0,
            "expected ~111.2 km, got {dist:.0} m"
        );
    }

    #[test]
    fn distance_san_francisco_sample() {
        // Downtown SF, ~1.4 km diagonal.
        let a = pt(37.7749, -122.4194);
        let b = pt(37.7849, -122.4094);
        let dist = distance_meters(a, b);
        assert!(
            dist > 1_300.0 && dist < 1_500.0,
            "expected ~1.4 km, got {dist:.0} m"
        );
    }

    #[test]
    fn distance_non_finite_input_is_zero() {
        assert_eq!(distance_meters(pt(f64::NAN, 0.0), pt(0.0, 0.0)), 0.0);
        assert_eq!(distance_meters(pt(0.0, 0.0), pt(0.0, f64::INFINITY)), 0.0);
    }

    #[test]
    fn polyline_length_sums_segments() {
        let line = vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(0.0, 2.0)];
        let len = polyline_length_m(&line);
        assert!(
            (len - 222_390.0).abs() < 200.0,
            "expected ~222.4 km, got {len:.0} m"
        );
    }

    // ==================== Bearing ====================

    #[test]
    fn bearing_due_east() {
        let b = bearing_degrees(pt(0.0, 0.0), pt(0.0, 1.0));
        assert!((b - 90.0).abs() < 0.1);
    }

    #[test]
    fn bearing_due_north() {
        let b = bearing_degrees(pt(0.0, 0.0), pt(1.0, 0.0));
        assert!(b < 0.1 || b > 359.9);
    }

    // ==================== Projection ====================

    #[test]
    fn projection_needs_two_vertices() {
        assert!(closest_point_on_polyline(pt(48.0, 16.0), &[pt(48.0, 16.0)]).is_none());
        assert!(closest_point_on_polyline(pt(48.0, 16.0), &[]).is_none());
    }

    #[test]
    fn projection_on_vertex_has_zero_distance() {
        let line = vec![pt(48.0, 16.0), pt(48.0, 17.0), pt(49.0, 17.0)];
        let result = closest_point_on_polyline(pt(48.0, 16.5), &line).unwrap();
        assert!(result.distance_m < 1.0);
        assert_eq!(result.segment_index, 0);
    }

    #[test]
    fn projection_lands_on_perpendicular_foot() {
        // Position directly north of the segment midpoint.
        let line = vec![pt(48.0, 16.0), pt(48.0, 17.0)];
        let result = closest_point_on_polyline(pt(48.1, 16.5), &line).unwrap();
        assert!((result.point.lat - 48.0).abs() < 0.01);
        assert!((result.point.lon - 16.5).abs() < 0.01);
        assert!(result.distance_m > 10_000.0);
    }

    #[test]
    fn projection_clamps_to_segment_start() {
        let line = vec![pt(48.0, 16.0), pt(48.0, 17.0)];
        let result = closest_point_on_polyline(pt(48.0, 15.5), &line).unwrap();
        assert!((result.point.lon - 16.0).abs() < 0.0001);
        assert_eq!(result.segment_index, 0);
    }

    #[test]
    fn projection_picks_nearest_of_multiple_segments() {
        // L-shaped polyline: east then north.
        let line = vec![pt(48.0, 16.0), pt(48.0, 17.0), pt(49.0, 17.0)];
        let result = closest_point_on_polyline(pt(48.5, 17.1), &line).unwrap();
        assert_eq!(result.segment_index, 1);
        assert!((result.point.lon - 17.0).abs() < 0.01);
    }

    #[test]
    fn projection_tie_prefers_earliest_segment() {
        // A shared vertex belongs to both adjacent segments with distance 0;
        // the strict comparison must keep the first.
        let line = vec![pt(48.0, 16.0), pt(48.0, 16.5), pt(48.0, 17.0)];
        let result = closest_point_on_polyline(pt(48.0, 16.5), &line).unwrap();
        assert_eq!(result.segment_index, 0);
        assert!(result.distance_m < 0.01);
    }

    #[test]
    fn projection_skips_degenerate_segment() {
        // Duplicate vertex creates a zero-length segment mid-polyline.
        let line = vec![pt(48.0, 16.0), pt(48.0, 16.5), pt(48.0, 16.5), pt(48.0, 17.0)];
        let result = closest_point_on_polyline(pt(48.05, 16.8), &line).unwrap();
        assert_eq!(result.segment_index, 2);
    }

    #[test]
    fn projection_index_stays_in_segment_range() {
        let line = vec![pt(48.0, 16.0), pt(48.0, 16.5), pt(48.0, 17.0)];
        // Far past the end, projection clamps to the last vertex.
        let result = closest_point_on_polyline(pt(48.0, 20.0), &line).unwrap();
        assert!(result.segment_index <= line.len() - 2);
    }

    #[test]
    fn projection_distance_along_increases_with_progress() {
        let line = vec![pt(48.0, 16.0), pt(48.0, 16.5), pt(48.0, 17.0)];
        let early = closest_point_on_polyline(pt(48.0, 16.2), &line).unwrap();
        let late = closest_point_on_polyline(pt(48.0, 16.8), &line).unwrap();
        assert!(late.distance_along_m > early.distance_along_m);
    }

    // ==================== Remaining distance ====================

    #[test]
    fn remaining_from_start_is_full_length() {
        let line = vec![pt(0.0, 0.0), pt(0.0, 0.5), pt(0.0, 1.0)];
        let total = polyline_length_m(&line);
        let remaining = remaining_distance_m(pt(0.0, 0.0), &line, 0);
        assert!((remaining - total).abs() < 1.0);
    }

    #[test]
    fn remaining_shrinks_with_progress() {
        let line = vec![pt(0.0, 0.0), pt(0.0, 0.5), pt(0.0, 1.0)];
        let r1 = remaining_distance_m(pt(0.0, 0.1), &line, 0);
        let r2 = remaining_distance_m(pt(0.0, 0.6), &line, 1);
        assert!(r2 < r1);
    }

    #[test]
    fn remaining_includes_offset_from_polyline() {
        // 1 km north of the final vertex: remaining is the offset itself.
        let line = vec![pt(0.0, 0.0), pt(0.0, 0.5)];
        let remaining = remaining_distance_m(pt(0.009, 0.5), &line, 0);
        assert!(
            remaining > 900.0 && remaining < 1_100.0,
            "expected ~1 km, got {remaining:.0} m"
        );
    }

    #[test]
    fn remaining_clamps_out_of_range_segment_index() {
        let line = vec![pt(0.0, 0.0), pt(0.0, 0.5), pt(0.0, 1.0)];
        let remaining = remaining_distance_m(pt(0.0, 1.0), &line, 99);
        assert!(remaining < 1.0);
    }

    #[test]
    fn remaining_empty_polyline_is_zero() {
        assert_eq!(remaining_distance_m(pt(0.0, 0.0), &[], 0), 0.0);
        assert_eq!(remaining_distance_m(pt(0.0, 0.0), &[pt(0.0, 0.0)], 0), 0.0);
    }
}
