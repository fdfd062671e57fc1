//! # Rest-Stop Detection
//!
//! Finds periods where the subject stayed in place, in a single forward pass
//! over the analyzed track.
//!
//! ## Algorithm
//!
//! The scan is a three-state machine:
//!
//! 1. **Idle** - nothing is being tracked.
//! 2. **Accumulating** - a *candidate* cluster of slow points is growing. It
//!    keeps a running centroid and the total absolute east/north drift of its
//!    points. Too much drift discards it; outlasting the minimum duration
//!    promotes it to a seed.
//! 3. **Resting** - a *seed* (the candidate's centroid and start time) is
//!    active. Slow points are ignored. A fast point close to the seed is a
//!    tolerated GPS blip; a fast point far from the seed ends the rest and
//!    emits a [`RestTrackPoint`] running from the seed's start to that point.
//!
//! A rest that starts shortly after the previous one ended is merged into it
//! by moving the previous rest's end time forward, so short shuffles between
//! two nearby stops do not produce near-duplicate detections.
//!
//! By default a rest still open when the track ends is dropped; see
//! [`RestConfig::flush_open_rest_at_end`].

use chrono::{DateTime, Utc};
use log::debug;

use crate::geo_utils::planar_shift;
use crate::{AnalyzedTrackPoint, Point, Position, RestTrackPoint};

/// Tunables for rest-stop detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RestConfig {
    /// Planar speed below which a point counts as slow (m/s).
    /// Default: 0.1
    pub speed_threshold: f64,

    /// Per-axis drift allowed while resting (meters). Applies both to the
    /// accumulated drift of a candidate and to the distance of a fast point
    /// from an active seed.
    /// Default: 20.0
    pub drift_tolerance: f64,

    /// A candidate must stay slow for longer than this to become a rest (seconds).
    /// Default: 60.0
    pub min_rest_duration: f64,

    /// A rest starting less than this after the previous rest's end is
    /// merged into it (seconds).
    /// Default: 120.0
    pub merge_window: f64,

    /// Emit a rest that is still open when the track ends, ending at the
    /// last point's time.
    /// Default: false
    pub flush_open_rest_at_end: bool,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            speed_threshold: 0.1,
            drift_tolerance: 20.0,
            min_rest_duration: 60.0,
            merge_window: 120.0,
            flush_open_rest_at_end: false,
        }
    }
}

// =============================================================================
// Scan State
// =============================================================================

/// A growing cluster of slow points that may become a rest.
#[derive(Debug, Clone)]
pub(crate) struct RestCandidate {
    start_time: DateTime<Utc>,
    point_count: usize,
    sum_lat: f64,
    sum_lon: f64,
    sum_elev: f64,
    elev_count: usize,
    drift_x: f64,
    drift_y: f64,
    last_time: DateTime<Utc>,
}

impl RestCandidate {
    fn new(first: &AnalyzedTrackPoint) -> Self {
        let (sum_elev, elev_count) = match first.elevation() {
            Some(e) => (e, 1),
            None => (0.0, 0),
        };
        Self {
            start_time: first.timestamp(),
            point_count: 1,
            sum_lat: first.latitude(),
            sum_lon: first.longitude(),
            sum_elev,
            elev_count,
            drift_x: 0.0,
            drift_y: 0.0,
            last_time: first.timestamp(),
        }
    }

    fn add(&mut self, point: &AnalyzedTrackPoint) {
        self.point_count += 1;
        self.sum_lat += point.latitude();
        self.sum_lon += point.longitude();
        if let Some(e) = point.elevation() {
            self.sum_elev += e;
            self.elev_count += 1;
        }
        self.drift_x += point.delta_x().abs();
        self.drift_y += point.delta_y().abs();
        self.last_time = point.timestamp();
    }

    /// Seconds from the candidate's first point to `point`.
    fn elapsed_until(&self, point: &AnalyzedTrackPoint) -> f64 {
        seconds_between(self.start_time, point.timestamp())
    }

    fn drift_exceeds(&self, tolerance: f64) -> bool {
        self.drift_x > tolerance || self.drift_y > tolerance
    }

    fn into_seed(self) -> RestSeed {
        let n = self.point_count as f64;
        let elevation = (self.elev_count > 0).then(|| self.sum_elev / self.elev_count as f64);
        // Means of in-range coordinates are in range
        let centroid = Position {
            latitude: self.sum_lat / n,
            longitude: self.sum_lon / n,
            elevation,
        };

        RestSeed {
            centroid,
            start_time: self.start_time,
        }
    }
}

/// A promoted candidate waiting for the subject to leave.
#[derive(Debug, Clone)]
pub(crate) struct RestSeed {
    centroid: Position,
    start_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
enum DetectorState {
    Idle,
    Accumulating(RestCandidate),
    Resting(RestSeed),
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

// =============================================================================
// Detector
// =============================================================================

/// Scan an analyzed point sequence and return the rest stops in order.
///
/// # Example
///
/// ```rust
/// use track_analyzer::{find_rest_points, RestConfig};
///
/// let rests = find_rest_points(&[], &RestConfig::default());
/// assert!(rests.is_empty());
/// ```
pub fn find_rest_points(points: &[AnalyzedTrackPoint], config: &RestConfig) -> Vec<RestTrackPoint> {
    let mut rests: Vec<RestTrackPoint> = Vec::new();
    let mut state = DetectorState::Idle;

    for point in points {
        state = if point.speed_xy() < config.speed_threshold {
            on_slow_point(state, point, config)
        } else {
            on_moving_point(state, point, config, &mut rests)
        };
    }

    match state {
        DetectorState::Resting(seed) if config.flush_open_rest_at_end => {
            if let Some(last) = points.last() {
                debug!("[RestDetector] Flushing open rest at end of track");
                finalize_rest(&mut rests, seed, last.timestamp(), config);
            }
        }
        DetectorState::Resting(_) => {
            debug!("[RestDetector] Track ended while resting, open rest dropped");
        }
        DetectorState::Accumulating(_) | DetectorState::Idle => {}
    }

    debug!(
        "[RestDetector] Scanned {} points, found {} rest points",
        points.len(),
        rests.len()
    );

    rests
}

fn on_slow_point(state: DetectorState, point: &AnalyzedTrackPoint, config: &RestConfig) -> DetectorState {
    match state {
        DetectorState::Resting(seed) => DetectorState::Resting(seed),
        DetectorState::Idle => DetectorState::Accumulating(RestCandidate::new(point)),
        DetectorState::Accumulating(mut candidate) => {
            if candidate.drift_exceeds(config.drift_tolerance) {
                // Wandered too far to be resting; the next slow point starts over
                DetectorState::Idle
            } else if candidate.elapsed_until(point) > config.min_rest_duration {
                debug!(
                    "[RestDetector] Candidate from {} promoted: {} points over {:.0}s",
                    candidate.start_time,
                    candidate.point_count,
                    seconds_between(candidate.start_time, candidate.last_time)
                );
                DetectorState::Resting(candidate.into_seed())
            } else {
                candidate.add(point);
                DetectorState::Accumulating(candidate)
            }
        }
    }
}

fn on_moving_point(
    state: DetectorState,
    point: &AnalyzedTrackPoint,
    config: &RestConfig,
    rests: &mut Vec<RestTrackPoint>,
) -> DetectorState {
    match state {
        DetectorState::Resting(seed) => {
            let (x_shift, y_shift) = planar_shift(&seed.centroid, point.position());
            if x_shift < config.drift_tolerance && y_shift < config.drift_tolerance {
                // Fast blip that stayed near the seed
                DetectorState::Resting(seed)
            } else {
                finalize_rest(rests, seed, point.timestamp(), config);
                DetectorState::Idle
            }
        }
        DetectorState::Accumulating(mut candidate) => {
            if candidate.point_count < 2 || candidate.elapsed_until(point) < config.min_rest_duration {
                DetectorState::Idle
            } else {
                candidate.add(point);
                DetectorState::Accumulating(candidate)
            }
        }
        DetectorState::Idle => DetectorState::Idle,
    }
}

/// Close a seed at `end_time`, merging into the previous rest when it ended
/// less than `merge_window` before the seed started.
fn finalize_rest(
    rests: &mut Vec<RestTrackPoint>,
    seed: RestSeed,
    end_time: DateTime<Utc>,
    config: &RestConfig,
) {
    if let Some(last) = rests.last_mut() {
        if seconds_between(last.end_time(), seed.start_time) < config.merge_window {
            debug!(
                "[RestDetector] Merging rest starting {} into previous, new end {}",
                seed.start_time, end_time
            );
            last.extend_to(end_time);
            return;
        }
    }

    debug!(
        "[RestDetector] Rest at ({:.6}, {:.6}) from {} to {}",
        seed.centroid.latitude(),
        seed.centroid.longitude(),
        seed.start_time,
        end_time
    );
    rests.push(RestTrackPoint::new(seed.centroid, seed.start_time, end_time));
}
