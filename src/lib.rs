//! # Track Analyzer
//!
//! GPS track analysis: smoothing, kinematics and rest-stop detection.
//!
//! This library provides:
//! - Moving-average smoothing of raw GPS track points
//! - Per-point displacement and velocity estimation
//! - Detection of rest stops (periods where the subject stayed in place)
//! - GPX parsing and a plain trip report
//!
//! ## Features
//!
//! - **`gpx`** - GPX parsing with quick-xml (enabled by default)
//! - **`serde`** - Serialize configs and results (JSON export for map renderers)
//! - **`parallel`** - Analyze many tracks in parallel with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use track_analyzer::{analyze_track, RawTrack, RawTrackPoint};
//!
//! let start = Utc.with_ymd_and_hms(2021, 8, 29, 6, 21, 16).unwrap();
//! let mut raw = RawTrack::new();
//! for i in 0..20 {
//!     let time = start + Duration::seconds(i * 10);
//!     let lat = 25.0330 + i as f64 * 0.0001;
//!     raw.push_point(RawTrackPoint::new(Some(time), lat, 121.5654, Some(10.0)).unwrap());
//! }
//!
//! let analyzed = analyze_track(&raw).unwrap();
//! // 20 raw points -> 16 smoothed -> 14 analyzed
//! assert_eq!(analyzed.main_track().len(), 14);
//! assert!(analyzed.rest_point_list().is_empty());
//! ```

use chrono::{DateTime, Duration, Utc};

pub mod error;
pub use error::{Result, TrackError};

pub mod geo_utils;

// Ordered point containers
pub mod track;
pub use track::{AnalyzedTrack, RawTrack, Track};

// Pipeline stages
pub mod smoothing;
pub use smoothing::{smooth, smooth_with_window, DEFAULT_SMOOTHING_WINDOW};

pub mod kinematics;
pub use kinematics::{analyze, analyze_with_window, DEFAULT_DERIVATIVE_WINDOW};

pub mod rest;
pub use rest::{find_rest_points, RestConfig};

pub mod analyzer;
pub use analyzer::{
    analyze_track, analyze_track_with_config, analyze_tracks, AnalysisConfig, TrackAnalyzer,
};

#[cfg(feature = "parallel")]
pub use analyzer::analyze_tracks_parallel;

// Trip report generation
pub mod report;
pub use report::{ReportConfig, ReportFormat, TripReport};

#[cfg(feature = "gpx")]
pub mod gpx;

#[cfg(feature = "gpx")]
pub use gpx::{parse_gpx, read_gpx_file};

// ============================================================================
// Core Types
// ============================================================================

/// A validated location: latitude and longitude in degrees plus an optional
/// elevation in meters.
///
/// Every point variant embeds one of these.
///
/// # Example
/// ```
/// use track_analyzer::Position;
/// let summit = Position::new(23.4700, 120.9572, Some(3952.0)).unwrap();
/// assert!(Position::new(91.0, 0.0, None).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "PositionRepr"))]
pub struct Position {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
}

/// Unvalidated wire form of [`Position`]; deserialization goes through
/// [`Position::new`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct PositionRepr {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<PositionRepr> for Position {
    type Error = TrackError;

    fn try_from(repr: PositionRepr) -> Result<Self> {
        Position::new(repr.latitude, repr.longitude, repr.elevation)
    }
}

impl Position {
    /// Create a position, failing with [`TrackError::InvalidCoordinate`] when
    /// latitude is outside [-90, 90] or longitude outside [-180, 180].
    pub fn new(latitude: f64, longitude: f64, elevation: Option<f64>) -> Result<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(TrackError::InvalidCoordinate { latitude, longitude });
        }

        Ok(Self { latitude, longitude, elevation })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn elevation(&self) -> Option<f64> {
        self.elevation
    }
}

/// Capabilities shared by every point variant.
pub trait Point {
    /// The point's location.
    fn position(&self) -> &Position;

    /// The point's timestamp, if known.
    fn time(&self) -> Option<DateTime<Utc>>;

    fn latitude(&self) -> f64 {
        self.position().latitude()
    }

    fn longitude(&self) -> f64 {
        self.position().longitude()
    }

    fn elevation(&self) -> Option<f64> {
        self.position().elevation()
    }
}

/// A track point exactly as recorded by the GPS device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawTrackPoint {
    time: Option<DateTime<Utc>>,
    position: Position,
}

impl RawTrackPoint {
    /// Create a raw point, validating the coordinate range.
    pub fn new(
        time: Option<DateTime<Utc>>,
        latitude: f64,
        longitude: f64,
        elevation: Option<f64>,
    ) -> Result<Self> {
        Ok(Self::from_position(time, Position::new(latitude, longitude, elevation)?))
    }

    /// Create a raw point from an already validated position.
    pub fn from_position(time: Option<DateTime<Utc>>, position: Position) -> Self {
        Self { time, position }
    }
}

impl Point for RawTrackPoint {
    fn position(&self) -> &Position {
        &self.position
    }

    fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }
}

/// A user-annotated point of interest, carried alongside the main track.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    point: RawTrackPoint,
    note: Option<String>,
}

impl Waypoint {
    pub fn new(
        time: Option<DateTime<Utc>>,
        latitude: f64,
        longitude: f64,
        elevation: Option<f64>,
        note: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            point: RawTrackPoint::new(time, latitude, longitude, elevation)?,
            note,
        })
    }

    /// Free-text note attached to the waypoint (the GPX `<name>`).
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

impl Point for Waypoint {
    fn position(&self) -> &Position {
        self.point.position()
    }

    fn time(&self) -> Option<DateTime<Utc>> {
        self.point.time()
    }
}

/// A smoothed track point enriched with kinematic deltas.
///
/// Deltas are in meters (x = east, y = north, z = up) and seconds, averaged
/// over the point's neighborhood. Only the kinematics stage creates these.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnalyzedTrackPoint {
    time: DateTime<Utc>,
    position: Position,
    delta_x: f64,
    delta_y: f64,
    delta_z: f64,
    delta_t: f64,
    integral_distance: f64,
}

impl AnalyzedTrackPoint {
    pub(crate) fn new(
        time: DateTime<Utc>,
        position: Position,
        delta_x: f64,
        delta_y: f64,
        delta_z: f64,
        delta_t: f64,
    ) -> Self {
        Self {
            time,
            position,
            delta_x,
            delta_y,
            delta_z,
            delta_t,
            integral_distance: 0.0,
        }
    }

    /// Timestamp of the point. Analyzed points always have one.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn delta_x(&self) -> f64 {
        self.delta_x
    }

    pub fn delta_y(&self) -> f64 {
        self.delta_y
    }

    pub fn delta_z(&self) -> f64 {
        self.delta_z
    }

    /// Averaged time step in seconds.
    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    /// Planar displacement `sqrt(dx² + dy²)` in meters.
    pub fn delta_xy(&self) -> f64 {
        self.delta_x.hypot(self.delta_y)
    }

    /// East velocity in m/s. Unbounded (signed infinity) when `delta_t <= 0`.
    pub fn speed_x(&self) -> f64 {
        rate(self.delta_x, self.delta_t)
    }

    /// North velocity in m/s. Unbounded (signed infinity) when `delta_t <= 0`.
    pub fn speed_y(&self) -> f64 {
        rate(self.delta_y, self.delta_t)
    }

    /// Vertical velocity in m/s. Unbounded (signed infinity) when `delta_t <= 0`.
    pub fn speed_z(&self) -> f64 {
        rate(self.delta_z, self.delta_t)
    }

    /// Planar speed in m/s.
    ///
    /// A point with no elapsed time is treated as moving infinitely fast, so
    /// it can never be classified as resting.
    pub fn speed_xy(&self) -> f64 {
        if self.delta_t > 0.0 {
            self.delta_xy() / self.delta_t
        } else {
            f64::INFINITY
        }
    }

    /// Planar velocity vector `[vx, vy]`.
    pub fn velocity_xy(&self) -> [f64; 2] {
        [self.speed_x(), self.speed_y()]
    }

    /// Velocity vector `[vx, vy, vz]`.
    pub fn velocity_xyz(&self) -> [f64; 3] {
        [self.speed_x(), self.speed_y(), self.speed_z()]
    }

    /// Cumulative planar distance from the track start, once aggregated.
    pub fn integral_distance(&self) -> f64 {
        self.integral_distance
    }

    pub fn set_integral_distance(&mut self, distance: f64) {
        self.integral_distance = distance;
    }
}

impl Point for AnalyzedTrackPoint {
    fn position(&self) -> &Position {
        &self.position
    }

    fn time(&self) -> Option<DateTime<Utc>> {
        Some(self.time)
    }
}

fn rate(delta: f64, delta_t: f64) -> f64 {
    if delta_t > 0.0 {
        delta / delta_t
    } else {
        f64::INFINITY.copysign(delta)
    }
}

/// A detected rest stop: the centroid of the stationary cluster and the
/// `[start_time, end_time)` interval spent there.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RestTrackPoint {
    position: Position,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl RestTrackPoint {
    pub(crate) fn new(position: Position, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self { position, start_time, end_time }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Time spent at this rest stop.
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Extend the stop to a later departure (merge with a close follow-up stop).
    pub(crate) fn extend_to(&mut self, end_time: DateTime<Utc>) {
        self.end_time = end_time;
    }
}

impl Point for RestTrackPoint {
    fn position(&self) -> &Position {
        &self.position
    }

    fn time(&self) -> Option<DateTime<Utc>> {
        Some(self.start_time)
    }
}

/// Any public point variant, for containers that accept points dynamically.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyPoint {
    Raw(RawTrackPoint),
    Way(Waypoint),
    Analyzed(AnalyzedTrackPoint),
    Rest(RestTrackPoint),
}

impl AnyPoint {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AnyPoint::Raw(_) => "raw",
            AnyPoint::Way(_) => "waypoint",
            AnyPoint::Analyzed(_) => "analyzed",
            AnyPoint::Rest(_) => "rest",
        }
    }
}

impl From<RawTrackPoint> for AnyPoint {
    fn from(p: RawTrackPoint) -> Self {
        AnyPoint::Raw(p)
    }
}

impl From<Waypoint> for AnyPoint {
    fn from(p: Waypoint) -> Self {
        AnyPoint::Way(p)
    }
}

impl From<AnalyzedTrackPoint> for AnyPoint {
    fn from(p: AnalyzedTrackPoint) -> Self {
        AnyPoint::Analyzed(p)
    }
}

impl From<RestTrackPoint> for AnyPoint {
    fn from(p: RestTrackPoint) -> Self {
        AnyPoint::Rest(p)
    }
}

/// Bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center of the bounds as (latitude, longitude).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
