//! Analyzer facade: runs the full pipeline on one recorded track.
//!
//! The order is fixed: smooth the raw points, compute kinematics, carry the
//! waypoints over unchanged, detect rest stops, then aggregate the running
//! distance into every analyzed point.

use log::info;

use crate::error::{Result, TrackError};
use crate::kinematics::{analyze_with_window, DEFAULT_DERIVATIVE_WINDOW};
use crate::rest::{find_rest_points, RestConfig};
use crate::smoothing::{smooth_with_window, DEFAULT_SMOOTHING_WINDOW};
use crate::track::{AnalyzedTrack, RawTrack, Track};
use crate::{AnalyzedTrackPoint, Point, RestTrackPoint, Waypoint};

/// Configuration for the whole analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisConfig {
    /// Raw points averaged into one smoothed point. Must be odd.
    /// Default: 5
    pub smoothing_window: usize,

    /// Neighborhood used to estimate per-point deltas. Must be odd and >= 3.
    /// Default: 3
    pub derivative_window: usize,

    /// Rest-stop detection thresholds.
    pub rest: RestConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            derivative_window: DEFAULT_DERIVATIVE_WINDOW,
            rest: RestConfig::default(),
        }
    }
}

/// One analysis bound to one input track.
///
/// # Example
/// ```
/// use track_analyzer::{RawTrack, TrackAnalyzer, TrackError};
///
/// let empty = RawTrack::new();
/// assert!(matches!(TrackAnalyzer::new(&empty), Err(TrackError::EmptyInput)));
/// ```
#[derive(Debug, Clone)]
pub struct TrackAnalyzer {
    analyzed: AnalyzedTrack,
}

impl TrackAnalyzer {
    /// Analyze a track with the default configuration.
    pub fn new(raw_track: &RawTrack) -> Result<Self> {
        Self::with_config(raw_track, &AnalysisConfig::default())
    }

    /// Analyze a track with a custom configuration.
    pub fn with_config(raw_track: &RawTrack, config: &AnalysisConfig) -> Result<Self> {
        if raw_track.is_empty() {
            return Err(TrackError::EmptyInput);
        }

        // Checked before smoothing so the index refers to the raw point
        if let Some(index) = raw_track.main_track().iter().position(|p| p.time().is_none()) {
            return Err(TrackError::MissingTimestamp { index });
        }

        let start = std::time::Instant::now();

        let smoothed = smooth_with_window(raw_track.main_track().points(), config.smoothing_window)?;
        let mut analyzed = analyze_with_window(&smoothed, config.derivative_window)?;
        analyzed.set_waypoint_list(raw_track.waypoint_list().to_vec());

        let rest_points = find_rest_points(analyzed.main_track().points(), &config.rest);
        analyzed.set_rest_point_list(rest_points);
        analyzed.accumulate_integral_distance();

        info!(
            "[Analyzer] {} raw points -> {} analyzed, {} waypoints, {} rest points in {:?}",
            raw_track.len(),
            analyzed.main_track().len(),
            analyzed.waypoint_list().len(),
            analyzed.rest_point_list().len(),
            start.elapsed()
        );

        Ok(Self { analyzed })
    }

    pub fn main_track(&self) -> &Track<AnalyzedTrackPoint> {
        self.analyzed.main_track()
    }

    pub fn waypoint_list(&self) -> &[Waypoint] {
        self.analyzed.waypoint_list()
    }

    pub fn rest_point_list(&self) -> &[RestTrackPoint] {
        self.analyzed.rest_point_list()
    }

    pub fn analyzed_track(&self) -> &AnalyzedTrack {
        &self.analyzed
    }

    pub fn into_analyzed_track(self) -> AnalyzedTrack {
        self.analyzed
    }
}

// ============================================================================
// Core Functions
// ============================================================================

/// Run the full pipeline with the default configuration.
///
/// Fails with [`TrackError::EmptyInput`] for a track without points and with
/// [`TrackError::InsufficientData`] when there are too few points to fill the
/// smoothing and derivative windows (7 with the defaults).
pub fn analyze_track(raw_track: &RawTrack) -> Result<AnalyzedTrack> {
    analyze_track_with_config(raw_track, &AnalysisConfig::default())
}

/// Run the full pipeline with a custom configuration.
pub fn analyze_track_with_config(raw_track: &RawTrack, config: &AnalysisConfig) -> Result<AnalyzedTrack> {
    TrackAnalyzer::with_config(raw_track, config).map(TrackAnalyzer::into_analyzed_track)
}

/// Analyze several independent tracks, one result per input in order.
pub fn analyze_tracks(raw_tracks: &[RawTrack], config: &AnalysisConfig) -> Vec<Result<AnalyzedTrack>> {
    raw_tracks
        .iter()
        .map(|track| analyze_track_with_config(track, config))
        .collect()
}

/// Parallel version of [`analyze_tracks`]. Tracks share no state, so each
/// runs independently on the rayon pool.
#[cfg(feature = "parallel")]
pub fn analyze_tracks_parallel(
    raw_tracks: &[RawTrack],
    config: &AnalysisConfig,
) -> Vec<Result<AnalyzedTrack>> {
    use rayon::prelude::*;

    let start = std::time::Instant::now();
    let results: Vec<Result<AnalyzedTrack>> = raw_tracks
        .par_iter()
        .map(|track| analyze_track_with_config(track, config))
        .collect();

    info!(
        "[Analyzer] Analyzed {} tracks in parallel in {:?}",
        raw_tracks.len(),
        start.elapsed()
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawTrackPoint;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    const LAT: f64 = 24.1500;
    const LON: f64 = 120.6500;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 8, 29, 6, 0, 0).unwrap() + Duration::seconds(secs)
    }

    /// Walk north at ~2 m/s, stop for five minutes, then walk on.
    fn walk_with_stop() -> RawTrack {
        let mut raw = RawTrack::new();
        let step = 20.0 / 110_757.0; // 20 m per 10 s sample
        let mut lat = LAT;
        let mut secs = 0;

        for _ in 0..10 {
            raw.push_point(RawTrackPoint::new(Some(t(secs)), lat, LON, Some(100.0)).unwrap());
            lat += step;
            secs += 10;
        }
        for _ in 0..30 {
            raw.push_point(RawTrackPoint::new(Some(t(secs)), lat, LON, Some(100.0)).unwrap());
            secs += 10;
        }
        for _ in 0..10 {
            lat += step;
            raw.push_point(RawTrackPoint::new(Some(t(secs)), lat, LON, Some(100.0)).unwrap());
            secs += 10;
        }

        raw.push_waypoint(
            Waypoint::new(Some(t(150)), lat, LON, None, Some("Lunch".to_string())).unwrap(),
        );
        raw
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(analyze_track(&RawTrack::new()), Err(TrackError::EmptyInput)));
    }

    #[test]
    fn test_insufficient_points() {
        let mut raw = RawTrack::new();
        for i in 0..6 {
            raw.push_point(RawTrackPoint::new(Some(t(i * 10)), LAT, LON, None).unwrap());
        }
        // 6 raw -> 2 smoothed, fewer than the derivative window
        assert!(matches!(
            analyze_track(&raw),
            Err(TrackError::InsufficientData { stage: "kinematics", .. })
        ));
    }

    #[test]
    fn test_missing_timestamp_reports_raw_index() {
        let mut points = walk_with_stop().main_track().points().to_vec();
        points[5] = RawTrackPoint::new(None, points[5].latitude(), LON, None).unwrap();
        let mut raw = RawTrack::new();
        for p in points {
            raw.push_point(p);
        }

        assert!(matches!(
            analyze_track(&raw),
            Err(TrackError::MissingTimestamp { index: 5 })
        ));
    }

    #[test]
    fn test_pipeline_detects_stop() {
        let raw = walk_with_stop();
        let analyzer = TrackAnalyzer::new(&raw).unwrap();

        assert_eq!(analyzer.main_track().len(), raw.len() - 4 - 2);
        assert_eq!(analyzer.waypoint_list(), raw.waypoint_list());

        let rests = analyzer.rest_point_list();
        assert_eq!(rests.len(), 1);
        let rest = &rests[0];
        assert!(rest.start_time() >= t(90) && rest.start_time() <= t(130));
        assert!(rest.end_time() >= t(390) && rest.end_time() <= t(430));
        assert!(rest.duration() >= Duration::seconds(260));
    }

    #[test]
    fn test_integral_distance_filled() {
        let track = analyze_track(&walk_with_stop()).unwrap();
        let last = track.main_track().end_point().unwrap();
        assert!((last.integral_distance() - track.total_integral_displacement()).abs() < 1e-9);
        assert!(last.integral_distance() > 290.0);
    }

    #[test]
    fn test_idempotent() {
        let raw = walk_with_stop();
        assert_eq!(analyze_track(&raw).unwrap(), analyze_track(&raw).unwrap());
    }

    #[test]
    fn test_batch_keeps_order_and_errors() {
        let tracks = vec![walk_with_stop(), RawTrack::new()];
        let results = analyze_tracks(&tracks, &AnalysisConfig::default());
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(TrackError::EmptyInput)));
    }

    #[test]
    fn test_custom_windows() {
        let config = AnalysisConfig {
            smoothing_window: 3,
            derivative_window: 5,
            ..AnalysisConfig::default()
        };
        let raw = walk_with_stop();
        let track = analyze_track_with_config(&raw, &config).unwrap();
        assert_eq!(track.main_track().len(), raw.len() - 2 - 4);
        assert!(track.main_track().iter().all(|p| p.time().is_some()));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let tracks = vec![walk_with_stop(), walk_with_stop()];
        let config = AnalysisConfig::default();
        let sequential = analyze_tracks(&tracks, &config);
        let parallel = analyze_tracks_parallel(&tracks, &config);
        for (a, b) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(a.as_ref().unwrap(), b.as_ref().unwrap());
        }
    }
}
