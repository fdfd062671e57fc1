//! # Geographic Utilities
//!
//! Degree/meter conversions and display-level geometry for track analysis.
//!
//! The analysis stages work on a flat equirectangular approximation: one
//! degree of longitude is taken as [`METERS_PER_DEGREE_LON`] meters and one
//! degree of latitude as [`METERS_PER_DEGREE_LAT`] meters, regardless of
//! where on the globe the track was recorded. The same pair is used by the
//! kinematics stage and by the rest detector's departure test.
//!
//! Haversine distances (via the `geo` crate) are only used for summaries
//! shown to the user, never by the detection logic.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`lon_degrees_to_meters`] | Longitude delta to meters (flat) |
//! | [`lat_degrees_to_meters`] | Latitude delta to meters (flat) |
//! | [`planar_shift`] | Absolute east/north shift between two positions |
//! | [`haversine_distance`] | Great-circle distance between two positions |
//! | [`polyline_length`] | Total great-circle length of a track |
//! | [`compute_bounds`] | Bounding box of a track |
//! | [`compute_center`] | Centroid of a track |
//!
//! ## Example
//!
//! ```rust
//! use track_analyzer::{geo_utils, Position};
//!
//! let a = Position::new(25.0000, 121.0000, None).unwrap();
//! let b = Position::new(25.0001, 121.0001, None).unwrap();
//!
//! let (dx, dy) = geo_utils::planar_shift(&a, &b);
//! assert!((dx - 10.1751).abs() < 1e-6);
//! assert!((dy - 11.0757).abs() < 1e-6);
//! ```

use geo::{Distance, Haversine};

use crate::{Bounds, Point, Position};

/// Meters per degree of longitude (flat approximation).
pub const METERS_PER_DEGREE_LON: f64 = 101_751.0;

/// Meters per degree of latitude (flat approximation).
pub const METERS_PER_DEGREE_LAT: f64 = 110_757.0;

// =============================================================================
// Flat Conversions
// =============================================================================

/// Convert a longitude difference in degrees to meters.
#[inline]
pub fn lon_degrees_to_meters(delta_lon: f64) -> f64 {
    delta_lon * METERS_PER_DEGREE_LON
}

/// Convert a latitude difference in degrees to meters.
#[inline]
pub fn lat_degrees_to_meters(delta_lat: f64) -> f64 {
    delta_lat * METERS_PER_DEGREE_LAT
}

/// Absolute east and north shift in meters between two positions, as
/// `(x_shift, y_shift)`.
pub fn planar_shift(from: &Position, to: &Position) -> (f64, f64) {
    (
        lon_degrees_to_meters(to.longitude() - from.longitude()).abs(),
        lat_degrees_to_meters(to.latitude() - from.latitude()).abs(),
    )
}

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance in meters between two positions.
///
/// # Example
///
/// ```rust
/// use track_analyzer::{geo_utils, Position};
///
/// let london = Position::new(51.5074, -0.1278, None).unwrap();
/// let paris = Position::new(48.8566, 2.3522, None).unwrap();
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &Position, p2: &Position) -> f64 {
    let point1 = geo::Point::new(p1.longitude(), p1.latitude());
    let point2 = geo::Point::new(p2.longitude(), p2.latitude());
    Haversine::distance(point1, point2)
}

/// Total great-circle length of a track in meters.
///
/// Empty or single-point tracks return 0.0.
pub fn polyline_length<P: Point>(points: &[P]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(w[0].position(), w[1].position()))
        .sum()
}

// =============================================================================
// Bounding Box / Center
// =============================================================================

/// Compute the bounding box of a track. Returns `None` for empty input.
pub fn compute_bounds<P: Point>(points: &[P]) -> Option<Bounds> {
    if points.is_empty() {
        return None;
    }

    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude());
        max_lat = max_lat.max(p.latitude());
        min_lng = min_lng.min(p.longitude());
        max_lng = max_lng.max(p.longitude());
    }

    Some(Bounds { min_lat, max_lat, min_lng, max_lng })
}

/// Arithmetic-mean centroid of a track as (latitude, longitude).
///
/// Returns `None` for empty input. Not meaningful for tracks crossing the
/// antimeridian.
pub fn compute_center<P: Point>(points: &[P]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let sum_lat: f64 = points.iter().map(|p| p.latitude()).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude()).sum();

    Some((sum_lat / n, sum_lng / n))
}
