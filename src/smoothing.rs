//! Moving-average smoothing of raw track points.
//!
//! Every run of `window` consecutive points is collapsed into one point at
//! the mean latitude, longitude and elevation, stamped with the time of the
//! window's middle point. The output is `n - window + 1` points long.

use log::debug;

use crate::error::{Result, TrackError};
use crate::{Point, Position, RawTrackPoint};

/// Default number of raw points averaged into one smoothed point.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Smooth with the default five-point window.
pub fn smooth(points: &[RawTrackPoint]) -> Result<Vec<RawTrackPoint>> {
    smooth_with_window(points, DEFAULT_SMOOTHING_WINDOW)
}

/// Smooth with a custom window.
///
/// The window must be odd so that it has a middle point to take the
/// timestamp from. Fails with [`TrackError::InsufficientData`] when there
/// are fewer points than one full window.
///
/// # Example
///
/// ```rust
/// use track_analyzer::{smooth_with_window, Point, RawTrackPoint};
///
/// let points: Vec<RawTrackPoint> = (0..4)
///     .map(|i| RawTrackPoint::new(None, i as f64, 0.0, None).unwrap())
///     .collect();
///
/// let smoothed = smooth_with_window(&points, 3).unwrap();
/// assert_eq!(smoothed.len(), 2);
/// assert_eq!(smoothed[0].latitude(), 1.0);
/// ```
pub fn smooth_with_window(points: &[RawTrackPoint], window: usize) -> Result<Vec<RawTrackPoint>> {
    if window == 0 || window % 2 == 0 {
        return Err(TrackError::InvalidWindow { window });
    }
    if points.len() < window {
        return Err(TrackError::InsufficientData {
            stage: "smoothing",
            required: window,
            actual: points.len(),
        });
    }

    let middle = window / 2;
    let smoothed = points
        .windows(window)
        .map(|segment| average_segment(segment, middle))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "[Smoothing] {} raw points -> {} smoothed (window {})",
        points.len(),
        smoothed.len(),
        window
    );

    Ok(smoothed)
}

fn average_segment(segment: &[RawTrackPoint], middle: usize) -> Result<RawTrackPoint> {
    let n = segment.len() as f64;
    let latitude = segment.iter().map(|p| p.latitude()).sum::<f64>() / n;
    let longitude = segment.iter().map(|p| p.longitude()).sum::<f64>() / n;

    let elevations: Vec<f64> = segment.iter().filter_map(|p| p.elevation()).collect();
    let elevation = if elevations.is_empty() {
        None
    } else {
        Some(elevations.iter().sum::<f64>() / elevations.len() as f64)
    };

    let position = Position::new(latitude, longitude, elevation)?;
    Ok(RawTrackPoint::from_position(segment[middle].time(), position))
}
