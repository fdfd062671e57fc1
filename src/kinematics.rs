//! Per-point kinematics over the smoothed track.
//!
//! A window slides over the input; for each window the average successive
//! delta of longitude, latitude, elevation and time is computed and attached
//! to the window's center point. Degree deltas become meters through the
//! flat constants in [`crate::geo_utils`].

use chrono::{DateTime, Utc};
use log::debug;

use crate::error::{Result, TrackError};
use crate::geo_utils::{lat_degrees_to_meters, lon_degrees_to_meters};
use crate::track::AnalyzedTrack;
use crate::{AnalyzedTrackPoint, Point, RawTrackPoint};

/// Default derivative neighborhood (center point plus one on each side).
pub const DEFAULT_DERIVATIVE_WINDOW: usize = 3;

/// Compute kinematics with the default three-point window.
pub fn analyze(points: &[RawTrackPoint]) -> Result<AnalyzedTrack> {
    analyze_with_window(points, DEFAULT_DERIVATIVE_WINDOW)
}

/// Compute kinematics with a custom odd window of at least three points.
///
/// Produces `n - (window - 1)` analyzed points. Every input point must carry
/// a timestamp, otherwise the stage fails with
/// [`TrackError::MissingTimestamp`] naming the first offending index.
///
/// # Example
///
/// ```rust
/// use chrono::{Duration, TimeZone, Utc};
/// use track_analyzer::{analyze, RawTrackPoint};
///
/// let start = Utc.with_ymd_and_hms(2021, 8, 29, 6, 0, 0).unwrap();
/// let points: Vec<RawTrackPoint> = (0..4)
///     .map(|i| {
///         let time = start + Duration::seconds(i * 10);
///         RawTrackPoint::new(Some(time), 25.0 + i as f64 * 0.0001, 121.0, None).unwrap()
///     })
///     .collect();
///
/// let track = analyze(&points).unwrap();
/// assert_eq!(track.main_track().len(), 2);
/// let p = &track.main_track().points()[0];
/// assert!(p.delta_y() > 0.0);
/// assert_eq!(p.delta_t(), 10.0);
/// ```
pub fn analyze_with_window(points: &[RawTrackPoint], window: usize) -> Result<AnalyzedTrack> {
    if window < 3 || window % 2 == 0 {
        return Err(TrackError::InvalidWindow { window });
    }
    if points.len() < window {
        return Err(TrackError::InsufficientData {
            stage: "kinematics",
            required: window,
            actual: points.len(),
        });
    }

    let times = points
        .iter()
        .enumerate()
        .map(|(index, p)| p.time().ok_or(TrackError::MissingTimestamp { index }))
        .collect::<Result<Vec<_>>>()?;

    let center = window / 2;
    let analyzed: Vec<AnalyzedTrackPoint> = points
        .windows(window)
        .zip(times.windows(window))
        .map(|(segment, segment_times)| analyze_segment(segment, segment_times, center))
        .collect();

    debug!(
        "[Kinematics] {} smoothed points -> {} analyzed (window {})",
        points.len(),
        analyzed.len(),
        window
    );

    Ok(AnalyzedTrack::from_points(analyzed))
}

fn analyze_segment(
    segment: &[RawTrackPoint],
    times: &[DateTime<Utc>],
    center: usize,
) -> AnalyzedTrackPoint {
    let delta_lon = average_successive_delta(segment.iter().map(|p| p.longitude()));
    let delta_lat = average_successive_delta(segment.iter().map(|p| p.latitude()));
    let delta_t = average_successive_delta(times.iter().map(|t| seconds_since_epoch(*t)));

    let anchor = &segment[center];
    AnalyzedTrackPoint::new(
        times[center],
        *anchor.position(),
        lon_degrees_to_meters(delta_lon),
        lat_degrees_to_meters(delta_lat),
        average_elevation_delta(segment),
        delta_t,
    )
}

/// Mean of `v[i + 1] - v[i]` over the sequence.
fn average_successive_delta(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    let pairs = values.len().saturating_sub(1);
    if pairs == 0 {
        return 0.0;
    }

    let total: f64 = values.windows(2).map(|w| w[1] - w[0]).sum();
    total / pairs as f64
}

/// Like [`average_successive_delta`], but only over pairs where both
/// elevations are known. Zero when no such pair exists.
fn average_elevation_delta(segment: &[RawTrackPoint]) -> f64 {
    let deltas: Vec<f64> = segment
        .windows(2)
        .filter_map(|w| Some(w[1].elevation()? - w[0].elevation()?))
        .collect();

    if deltas.is_empty() {
        0.0
    } else {
        deltas.iter().sum::<f64>() / deltas.len() as f64
    }
}

fn seconds_since_epoch(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 8, 29, 6, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn northbound(n: usize) -> Vec<RawTrackPoint> {
        (0..n)
            .map(|i| {
                RawTrackPoint::new(Some(t(i as i64 * 5)), 25.0 + i as f64 * 0.0001, 121.0, Some(300.0))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_northbound_delta_sign() {
        let track = analyze(&northbound(10)).unwrap();
        assert_eq!(track.main_track().len(), 8);
        for p in track.main_track() {
            assert!(p.delta_y() > 0.0);
            assert_eq!(p.delta_x(), 0.0);
            assert_eq!(p.delta_z(), 0.0);
            assert_eq!(p.delta_t(), 5.0);
            // 0.0001 deg of latitude is ~11.08 m every 5 s
            assert!((p.delta_y() - 11.0757).abs() < 1e-6);
            assert!((p.speed_xy() - 2.21514).abs() < 1e-6);
        }
    }

    #[test]
    fn test_center_point_attributes() {
        let points = northbound(3);
        let track = analyze(&points).unwrap();
        let p = &track.main_track().points()[0];
        assert_eq!(p.timestamp(), t(5));
        assert_eq!(p.latitude(), points[1].latitude());
        assert_eq!(p.elevation(), Some(300.0));
    }

    #[test]
    fn test_averages_uneven_steps() {
        let points = vec![
            RawTrackPoint::new(Some(t(0)), 25.0, 121.0, Some(10.0)).unwrap(),
            RawTrackPoint::new(Some(t(4)), 25.0, 121.001, Some(12.0)).unwrap(),
            RawTrackPoint::new(Some(t(10)), 25.0, 121.003, Some(11.0)).unwrap(),
        ];
        let track = analyze(&points).unwrap();
        let p = &track.main_track().points()[0];
        assert!((p.delta_x() - 0.0015 * 101_751.0).abs() < 1e-6);
        assert!((p.delta_z() - 0.5).abs() < 1e-12);
        assert_eq!(p.delta_t(), 5.0);
    }

    #[test]
    fn test_missing_elevation_pairs_skipped() {
        let points = vec![
            RawTrackPoint::new(Some(t(0)), 25.0, 121.0, None).unwrap(),
            RawTrackPoint::new(Some(t(1)), 25.0, 121.0, Some(10.0)).unwrap(),
            RawTrackPoint::new(Some(t(2)), 25.0, 121.0, Some(14.0)).unwrap(),
        ];
        let track = analyze(&points).unwrap();
        assert_eq!(track.main_track().points()[0].delta_z(), 4.0);
    }

    #[test]
    fn test_repeated_timestamp_gives_unbounded_speed() {
        let points = vec![
            RawTrackPoint::new(Some(t(0)), 25.0, 121.0, None).unwrap(),
            RawTrackPoint::new(Some(t(0)), 25.0, 121.0, None).unwrap(),
            RawTrackPoint::new(Some(t(0)), 25.0, 121.0, None).unwrap(),
        ];
        let track = analyze(&points).unwrap();
        let p = &track.main_track().points()[0];
        assert_eq!(p.delta_t(), 0.0);
        assert_eq!(p.speed_xy(), f64::INFINITY);
    }

    #[test]
    fn test_missing_timestamp_rejected() {
        let mut points = northbound(5);
        points[3] = RawTrackPoint::new(None, 25.0, 121.0, None).unwrap();
        assert!(matches!(
            analyze(&points),
            Err(TrackError::MissingTimestamp { index: 3 })
        ));
    }

    #[test]
    fn test_insufficient_data() {
        assert!(matches!(
            analyze(&northbound(2)),
            Err(TrackError::InsufficientData { stage: "kinematics", required: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_wider_window() {
        let track = analyze_with_window(&northbound(9), 5).unwrap();
        assert_eq!(track.main_track().len(), 5);
        assert_eq!(track.main_track().points()[0].timestamp(), t(10));
        assert!(analyze_with_window(&northbound(9), 4).is_err());
        assert!(analyze_with_window(&northbound(9), 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_output_length(n in 3usize..200) {
            let track = analyze(&northbound(n)).unwrap();
            prop_assert_eq!(track.main_track().len(), n - 2);
        }
    }
}
