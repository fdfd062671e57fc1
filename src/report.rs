//! Trip report generation.
//!
//! Lists the notes the user recorded as waypoints during the trip, in time
//! order, optionally followed by the detected rest stops and a short summary.
//! Each waypoint is snapped to the nearest analyzed track point (via an
//! R-tree) to report how far into the trip it was taken.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use log::info;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::error::Result;
use crate::track::AnalyzedTrack;
use crate::{AnalyzedTrackPoint, Point};

/// Output format of a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ReportFormat {
    /// One `"<time> <note>"` line per waypoint.
    #[default]
    Text,
    /// Headings and tables.
    Markdown,
}

impl ReportFormat {
    /// File extension written for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Markdown => "md",
        }
    }

    /// Pick a format from a file extension (`txt` or `md`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(ReportFormat::Text),
            "md" | "markdown" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

/// Configuration for report rendering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReportConfig {
    /// Output format.
    /// Default: Text
    pub format: ReportFormat,

    /// Offset from UTC applied to every printed time (seconds east).
    /// Default: 0
    pub utc_offset_seconds: i32,

    /// Append the rest-stop list and trip summary after the waypoint notes.
    /// Default: true
    pub include_rest_points: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Text,
            utc_offset_seconds: 0,
            include_rest_points: true,
        }
    }
}

/// A waypoint note as it appears in the report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaypointEntry {
    pub time: Option<DateTime<Utc>>,
    pub note: String,
    /// Distance travelled (meters) at the track point nearest the waypoint.
    pub distance_from_start: Option<f64>,
}

/// A rest stop as it appears in the report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RestEntry {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
}

impl RestEntry {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// A rendered-on-demand trip report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TripReport {
    pub waypoints: Vec<WaypointEntry>,
    pub rest_stops: Vec<RestEntry>,
    /// Seconds between the first and last analyzed point.
    pub total_duration_secs: Option<i64>,
    /// Great-circle length of the analyzed track in meters.
    pub track_length: f64,
    pub config: ReportConfig,
}

// =============================================================================
// R-tree Indexed Point for Waypoint Snapping
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlng = self.lng - point[1];
        dlat * dlat + dlng * dlng
    }
}

fn build_rtree(points: &[AnalyzedTrackPoint]) -> RTree<IndexedPoint> {
    let indexed: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .map(|(i, p)| IndexedPoint {
            idx: i,
            lat: p.latitude(),
            lng: p.longitude(),
        })
        .collect();
    RTree::bulk_load(indexed)
}

// =============================================================================
// Report Building / Rendering
// =============================================================================

impl TripReport {
    /// Collect the report contents from an analyzed track.
    pub fn from_track(track: &AnalyzedTrack, config: &ReportConfig) -> Self {
        let points = track.main_track().points();
        let tree = build_rtree(points);

        let mut waypoints: Vec<WaypointEntry> = track
            .waypoint_list()
            .iter()
            .map(|wp| {
                let nearest = tree.nearest_neighbor(&[wp.latitude(), wp.longitude()]);
                WaypointEntry {
                    time: wp.time(),
                    note: wp.note().unwrap_or_default().to_string(),
                    distance_from_start: nearest.map(|n| points[n.idx].integral_distance()),
                }
            })
            .collect();
        // Untimed notes sort first, the rest chronologically
        waypoints.sort_by_key(|w| w.time);

        let rest_stops = track
            .rest_point_list()
            .iter()
            .map(|r| RestEntry {
                start_time: r.start_time(),
                end_time: r.end_time(),
                latitude: r.latitude(),
                longitude: r.longitude(),
                elevation: r.elevation(),
            })
            .collect();

        Self {
            waypoints,
            rest_stops,
            total_duration_secs: track.main_track().total_duration().map(|d| d.num_seconds()),
            track_length: track.polyline_length(),
            config: config.clone(),
        }
    }

    /// Render the report in the configured format.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write the rendered report, appending the format's extension when the
    /// path does not already end with it. Returns the path written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let ext = self.config.format.extension();

        let target = match path.extension().and_then(|e| e.to_str()) {
            Some(e) if e.eq_ignore_ascii_case(ext) => path.to_path_buf(),
            _ => PathBuf::from(format!("{}.{}", path.display(), ext)),
        };

        std::fs::write(&target, self.render())?;
        info!(
            "[Report] Wrote {} waypoint notes and {} rest stops to {}",
            self.waypoints.len(),
            self.rest_stops.len(),
            target.display()
        );

        Ok(target)
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.config.utc_offset_seconds).unwrap_or(Utc.fix())
    }

    fn format_time(&self, time: Option<DateTime<Utc>>) -> String {
        match time {
            Some(t) => t.with_timezone(&self.offset()).format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "--".to_string(),
        }
    }

    fn write_text(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for wp in &self.waypoints {
            writeln!(f, "{} {}", self.format_time(wp.time), wp.note)?;
        }

        if !self.config.include_rest_points {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "Rest stops: {}", self.rest_stops.len())?;
        for rest in &self.rest_stops {
            writeln!(
                f,
                "{} - {} ({} min) at {:.5}, {:.5}",
                self.format_time(Some(rest.start_time)),
                self.format_time(Some(rest.end_time)),
                rest.duration().num_minutes(),
                rest.latitude,
                rest.longitude
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Distance: {:.2} km", self.track_length / 1000.0)?;
        if let Some(secs) = self.total_duration_secs {
            writeln!(f, "Duration: {}", format_hms(secs))?;
        }

        Ok(())
    }

    fn write_markdown(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("# Trip Report\n\n## Notes\n\n")?;

        if self.waypoints.is_empty() {
            f.write_str("_No notes recorded._\n")?;
        } else {
            f.write_str("| Time | Note | Distance |\n|---|---|---|\n")?;
            for wp in &self.waypoints {
                let distance = wp
                    .distance_from_start
                    .map(|d| format!("{:.2} km", d / 1000.0))
                    .unwrap_or_default();
                writeln!(
                    f,
                    "| {} | {} | {} |",
                    self.format_time(wp.time),
                    wp.note.replace('|', "\\|"),
                    distance
                )?;
            }
        }

        if !self.config.include_rest_points {
            return Ok(());
        }

        f.write_str("\n## Rest Stops\n\n")?;
        if self.rest_stops.is_empty() {
            f.write_str("_No rest stops detected._\n")?;
        } else {
            f.write_str("| Start | End | Minutes | Location | Elevation |\n|---|---|---|---|---|\n")?;
            for rest in &self.rest_stops {
                let elevation = rest.elevation.map(|e| format!("{e:.0} m")).unwrap_or_default();
                writeln!(
                    f,
                    "| {} | {} | {} | {:.5}, {:.5} | {} |",
                    self.format_time(Some(rest.start_time)),
                    self.format_time(Some(rest.end_time)),
                    rest.duration().num_minutes(),
                    rest.latitude,
                    rest.longitude,
                    elevation
                )?;
            }
        }

        f.write_str("\n## Summary\n\n")?;
        writeln!(f, "- Distance: {:.2} km", self.track_length / 1000.0)?;
        if let Some(secs) = self.total_duration_secs {
            writeln!(f, "- Duration: {}", format_hms(secs))?;
        }

        Ok(())
    }
}

impl fmt::Display for TripReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.config.format {
            ReportFormat::Text => self.write_text(f),
            ReportFormat::Markdown => self.write_markdown(f),
        }
    }
}

fn format_hms(total_secs: i64) -> String {
    let sign = if total_secs < 0 { "-" } else { "" };
    let secs = total_secs.abs();
    format!("{}{}:{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Position, RestTrackPoint, Waypoint};
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 8, 29, 6, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn sample_track() -> AnalyzedTrack {
        let points: Vec<AnalyzedTrackPoint> = (0..5)
            .map(|i| {
                let pos = Position::new(25.0 + i as f64 * 0.001, 121.0, Some(100.0)).unwrap();
                AnalyzedTrackPoint::new(t(i * 60), pos, 0.0, 110.757, 0.0, 60.0)
            })
            .collect();

        let mut track = AnalyzedTrack::from_points(points);
        track.accumulate_integral_distance();
        track.set_waypoint_list(vec![
            Waypoint::new(Some(t(200)), 25.003, 121.0, None, Some("Viewpoint".into())).unwrap(),
            Waypoint::new(Some(t(10)), 25.0, 121.0, None, Some("Trailhead".into())).unwrap(),
        ]);
        let rest_pos = Position::new(25.002, 121.0, Some(120.0)).unwrap();
        track.set_rest_point_list(vec![RestTrackPoint::new(rest_pos, t(100), t(220))]);
        track
    }

    #[test]
    fn test_waypoints_sorted_and_snapped() {
        let report = TripReport::from_track(&sample_track(), &ReportConfig::default());
        assert_eq!(report.waypoints.len(), 2);
        assert_eq!(report.waypoints[0].note, "Trailhead");
        assert_eq!(report.waypoints[1].note, "Viewpoint");

        // Nearest track point to the viewpoint is the fourth one
        let d = report.waypoints[1].distance_from_start.unwrap();
        assert!((d - 4.0 * 110.757).abs() < 1e-6);
        assert_eq!(report.total_duration_secs, Some(240));
    }

    #[test]
    fn test_text_report_lines() {
        let report = TripReport::from_track(
            &sample_track(),
            &ReportConfig {
                include_rest_points: false,
                ..ReportConfig::default()
            },
        );
        assert_eq!(
            report.render(),
            "2021-08-29 06:00:10 Trailhead\n2021-08-29 06:03:20 Viewpoint\n"
        );
    }

    #[test]
    fn test_text_report_with_offset_and_rests() {
        let config = ReportConfig {
            utc_offset_seconds: 8 * 3600,
            ..ReportConfig::default()
        };
        let text = TripReport::from_track(&sample_track(), &config).render();
        assert!(text.starts_with("2021-08-29 14:00:10 Trailhead\n"));
        assert!(text.contains("Rest stops: 1"));
        assert!(text.contains("2021-08-29 14:01:40 - 2021-08-29 14:03:40 (2 min)"));
        assert!(text.contains("Duration: 0:04:00"));
    }

    #[test]
    fn test_markdown_report() {
        let config = ReportConfig {
            format: ReportFormat::Markdown,
            ..ReportConfig::default()
        };
        let md = TripReport::from_track(&sample_track(), &config).render();
        assert!(md.starts_with("# Trip Report"));
        assert!(md.contains("| 2021-08-29 06:00:10 | Trailhead | 0.11 km |"));
        assert!(md.contains("## Rest Stops"));
        assert!(md.contains("120 m"));
    }

    #[test]
    fn test_write_appends_extension() {
        let report = TripReport::from_track(&sample_track(), &ReportConfig::default());
        let base = std::env::temp_dir().join(format!("trip_report_{}", std::process::id()));

        let written = report.write_to(&base).unwrap();
        assert_eq!(written.extension().and_then(|e| e.to_str()), Some("txt"));
        let content = std::fs::read_to_string(&written).unwrap();
        assert!(content.contains("Trailhead"));
        std::fs::remove_file(&written).unwrap();
    }

    #[test]
    fn test_display_matches_render() {
        let report = TripReport::from_track(&AnalyzedTrack::new(), &ReportConfig::default());
        assert_eq!(format!("{report}"), report.render());
        assert!(report.render().starts_with("\nRest stops: 0\n"));

        let config = ReportConfig {
            format: ReportFormat::Markdown,
            ..ReportConfig::default()
        };
        let md = TripReport::from_track(&AnalyzedTrack::new(), &config).to_string();
        assert!(md.contains("_No notes recorded._"));
        assert!(md.contains("_No rest stops detected._"));
        assert!(!md.contains("Duration"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ReportFormat::from_extension("TXT"), Some(ReportFormat::Text));
        assert_eq!(ReportFormat::from_extension("md"), Some(ReportFormat::Markdown));
        assert_eq!(ReportFormat::from_extension("pdf"), None);
        assert_eq!(format_hms(3725), "1:02:05");
    }
}
