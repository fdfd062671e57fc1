//! Ordered point containers.
//!
//! Insertion order is chronological order. [`RawTrack`] is what a GPX parser
//! produces; [`AnalyzedTrack`] is what the analyzer hands to map and report
//! consumers, and exclusively owns its waypoint and rest-point lists.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, TrackError};
use crate::geo_utils;
use crate::{AnalyzedTrackPoint, AnyPoint, Bounds, Point, RawTrackPoint, RestTrackPoint, Waypoint};

/// An ordered sequence of points of one variant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track<P> {
    points: Vec<P>,
}

impl<P> Default for Track<P> {
    fn default() -> Self {
        Self { points: Vec::new() }
    }
}

impl<P> From<Vec<P>> for Track<P> {
    fn from(points: Vec<P>) -> Self {
        Self { points }
    }
}

impl<P: Point> Track<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: P) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&P> {
        self.points.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, P> {
        self.points.iter()
    }

    pub fn points(&self) -> &[P] {
        &self.points
    }

    pub fn start_point(&self) -> Option<&P> {
        self.points.first()
    }

    pub fn end_point(&self) -> Option<&P> {
        self.points.last()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_point().and_then(|p| p.time())
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_point().and_then(|p| p.time())
    }

    /// Time between the first and last point, if both are timestamped.
    pub fn total_duration(&self) -> Option<Duration> {
        Some(self.end_time()? - self.start_time()?)
    }

    pub(crate) fn points_mut(&mut self) -> &mut [P] {
        &mut self.points
    }
}

impl<'a, P> IntoIterator for &'a Track<P> {
    type Item = &'a P;
    type IntoIter = std::slice::Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

// =============================================================================
// Raw Track
// =============================================================================

/// A recorded track: the main point sequence plus the user's waypoints.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawTrack {
    main_track: Track<RawTrackPoint>,
    waypoints: Vec<Waypoint>,
}

impl RawTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_point(&mut self, point: RawTrackPoint) {
        self.main_track.push(point);
    }

    pub fn push_waypoint(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    /// Add a point of any variant: raw points extend the main track,
    /// waypoints go to the waypoint list, anything else is rejected with
    /// [`TrackError::TypeMismatch`] and leaves the track unchanged.
    pub fn add_point(&mut self, point: impl Into<AnyPoint>) -> Result<()> {
        match point.into() {
            AnyPoint::Raw(p) => self.push_point(p),
            AnyPoint::Way(w) => self.push_waypoint(w),
            other => {
                return Err(TrackError::TypeMismatch {
                    expected: "raw or waypoint",
                    found: other.kind(),
                })
            }
        }
        Ok(())
    }

    pub fn main_track(&self) -> &Track<RawTrackPoint> {
        &self.main_track
    }

    pub fn waypoint_list(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.main_track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main_track.is_empty()
    }

    /// Load a track saved as JSON. Every coordinate is range-checked while
    /// reading; a bad one fails with [`TrackError::Json`].
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// =============================================================================
// Analyzed Track
// =============================================================================

/// The analysis result: smoothed, kinematics-enriched track points together
/// with the recorded waypoints and the detected rest stops.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnalyzedTrack {
    main_track: Track<AnalyzedTrackPoint>,
    waypoints: Vec<Waypoint>,
    rest_points: Vec<RestTrackPoint>,
}

impl AnalyzedTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_points(points: Vec<AnalyzedTrackPoint>) -> Self {
        Self {
            main_track: Track::from(points),
            ..Self::default()
        }
    }

    /// Add an analyzed point; any other variant fails with
    /// [`TrackError::TypeMismatch`].
    pub fn add_point(&mut self, point: impl Into<AnyPoint>) -> Result<()> {
        match point.into() {
            AnyPoint::Analyzed(p) => {
                self.main_track.push(p);
                Ok(())
            }
            other => Err(TrackError::TypeMismatch {
                expected: "analyzed",
                found: other.kind(),
            }),
        }
    }

    pub fn main_track(&self) -> &Track<AnalyzedTrackPoint> {
        &self.main_track
    }

    pub fn waypoint_list(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn rest_point_list(&self) -> &[RestTrackPoint] {
        &self.rest_points
    }

    pub fn set_waypoint_list(&mut self, waypoints: Vec<Waypoint>) {
        self.waypoints = waypoints;
    }

    pub fn set_rest_point_list(&mut self, rest_points: Vec<RestTrackPoint>) {
        self.rest_points = rest_points;
    }

    /// Sum of every point's planar displacement, in meters.
    pub fn total_integral_displacement(&self) -> f64 {
        self.main_track.iter().map(|p| p.delta_xy()).sum()
    }

    /// Store the running sum of planar displacement in each point's
    /// integral-distance field.
    pub fn accumulate_integral_distance(&mut self) {
        let mut total = 0.0;
        for point in self.main_track.points_mut() {
            total += point.delta_xy();
            point.set_integral_distance(total);
        }
    }

    /// Great-circle length of the analyzed track, in meters.
    pub fn polyline_length(&self) -> f64 {
        geo_utils::polyline_length(self.main_track.points())
    }

    pub fn bounds(&self) -> Option<Bounds> {
        geo_utils::compute_bounds(self.main_track.points())
    }

    /// Centroid of the analyzed track as (latitude, longitude).
    pub fn center(&self) -> Option<(f64, f64)> {
        geo_utils::compute_center(self.main_track.points())
    }

    /// Serialize the whole analysis (track, waypoints, rest stops) to JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 8, 29, 6, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn analyzed(secs: i64, dx: f64, dy: f64) -> AnalyzedTrackPoint {
        let pos = Position::new(25.0, 121.0, None).unwrap();
        AnalyzedTrackPoint::new(t(secs), pos, dx, dy, 0.0, 10.0)
    }

    #[test]
    fn test_empty_track_has_no_endpoints() {
        let track: Track<RawTrackPoint> = Track::new();
        assert!(track.is_empty());
        assert!(track.start_point().is_none());
        assert!(track.end_time().is_none());
        assert!(track.total_duration().is_none());
    }

    #[test]
    fn test_track_times() {
        let mut track = Track::new();
        track.push(RawTrackPoint::new(Some(t(0)), 25.0, 121.0, None).unwrap());
        track.push(RawTrackPoint::new(Some(t(30)), 25.0, 121.0, None).unwrap());
        assert_eq!(track.start_time(), Some(t(0)));
        assert_eq!(track.end_time(), Some(t(30)));
        assert_eq!(track.total_duration(), Some(Duration::seconds(30)));
    }

    #[test]
    fn test_raw_track_routes_points() {
        let mut raw = RawTrack::new();
        raw.add_point(RawTrackPoint::new(Some(t(0)), 25.0, 121.0, None).unwrap()).unwrap();
        raw.add_point(Waypoint::new(Some(t(5)), 25.0, 121.0, None, Some("Gate".into())).unwrap())
            .unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.waypoint_list().len(), 1);
    }

    #[test]
    fn test_type_mismatch_leaves_track_untouched() {
        let mut raw = RawTrack::new();
        let err = raw.add_point(analyzed(0, 1.0, 1.0)).unwrap_err();
        assert!(matches!(err, TrackError::TypeMismatch { found: "analyzed", .. }));
        assert!(raw.is_empty());
        assert!(raw.waypoint_list().is_empty());

        let mut track = AnalyzedTrack::new();
        let raw_point = RawTrackPoint::new(None, 25.0, 121.0, None).unwrap();
        assert!(track.add_point(raw_point).is_err());
        assert!(track.main_track().is_empty());
        track.add_point(analyzed(0, 1.0, 1.0)).unwrap();
        assert_eq!(track.main_track().len(), 1);
    }

    #[test]
    fn test_integral_distance_aggregation() {
        let mut track = AnalyzedTrack::from_points(vec![
            analyzed(0, 3.0, 4.0),
            analyzed(10, 0.0, 2.0),
            analyzed(20, 6.0, 8.0),
        ]);
        assert!((track.total_integral_displacement() - 17.0).abs() < 1e-12);

        track.accumulate_integral_distance();
        let sums: Vec<f64> = track.main_track().iter().map(|p| p.integral_distance()).collect();
        assert_eq!(sums, vec![5.0, 7.0, 17.0]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_raw_track_json_round_trip() {
        let mut raw = RawTrack::new();
        raw.push_point(RawTrackPoint::new(Some(t(0)), 25.0, 121.0, Some(850.0)).unwrap());
        raw.push_point(RawTrackPoint::new(None, 25.001, 121.002, None).unwrap());
        raw.push_waypoint(Waypoint::new(Some(t(5)), 25.0, 121.0, None, Some("Gate".into())).unwrap());

        let json = serde_json::to_string(&raw).unwrap();
        assert_eq!(RawTrack::from_json(&json).unwrap(), raw);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_out_of_range_json_rejected() {
        let json = r#"{
            "main_track": {"points": [
                {"time": null, "position": {"latitude": 91.0, "longitude": -181.0, "elevation": null}}
            ]},
            "waypoints": []
        }"#;
        match RawTrack::from_json(json) {
            Err(TrackError::Json(e)) => assert!(e.to_string().contains("Invalid coordinate")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(RawTrack::from_json("not json"), Err(TrackError::Json(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_analyzed_track_to_json() {
        let mut track = AnalyzedTrack::from_points(vec![
            analyzed(0, 3.0, 4.0),
            analyzed(10, 0.0, 2.0),
            analyzed(20, 6.0, 8.0),
        ]);
        track.accumulate_integral_distance();
        let rest_pos = Position::new(25.0, 121.0, Some(10.0)).unwrap();
        track.set_rest_point_list(vec![RestTrackPoint::new(rest_pos, t(0), t(20))]);

        let value: serde_json::Value = serde_json::from_str(&track.to_json().unwrap()).unwrap();
        let points = value["main_track"]["points"].as_array().unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2]["delta_x"], 6.0);
        assert_eq!(points[2]["integral_distance"], 17.0);
        assert_eq!(points[0]["position"]["latitude"], 25.0);
        assert_eq!(value["rest_points"][0]["position"]["elevation"], 10.0);
        assert_eq!(value["rest_points"][0]["start_time"], "2021-08-29T06:00:00Z");
        assert!(value["waypoints"].as_array().unwrap().is_empty());
    }
}
