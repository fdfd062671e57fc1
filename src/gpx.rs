//! GPX input.
//!
//! Reads `<trkpt>` elements (across every `<trk>`/`<trkseg>`, in document
//! order) into the main track and `<wpt>` elements into the waypoint list,
//! using each waypoint's `<name>` as its note. Routes and extensions are
//! skipped.

use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, TrackError};
use crate::track::RawTrack;
use crate::{RawTrackPoint, Waypoint};

/// Fields collected from one point element.
#[derive(Debug, Default)]
struct PointFields {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
    time: Option<DateTime<Utc>>,
    name: Option<String>,
}

/// Parse a GPX document into a raw track.
///
/// # Example
///
/// ```rust
/// use track_analyzer::parse_gpx;
///
/// let xml = r#"<gpx version="1.1">
///   <wpt lat="25.0" lon="121.0"><name>Camp</name></wpt>
///   <trk><trkseg>
///     <trkpt lat="25.0" lon="121.0"><time>2021-08-29T06:00:00Z</time></trkpt>
///     <trkpt lat="25.001" lon="121.0"><time>2021-08-29T06:00:10Z</time></trkpt>
///   </trkseg></trk>
/// </gpx>"#;
///
/// let track = parse_gpx(xml).unwrap();
/// assert_eq!(track.len(), 2);
/// assert_eq!(track.waypoint_list()[0].note(), Some("Camp"));
/// ```
pub fn parse_gpx(xml: &str) -> Result<RawTrack> {
    let mut reader = Reader::from_str(xml);
    let mut track = RawTrack::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkpt" => {
                    let fields = parse_point(&e, "trkpt", &mut reader)?;
                    track.push_point(into_raw_point(fields)?);
                }
                b"wpt" => {
                    let fields = parse_point(&e, "wpt", &mut reader)?;
                    track.push_waypoint(into_waypoint(fields)?);
                }
                // Descend into gpx/trk/trkseg; everything else is skipped whole
                b"gpx" | b"trk" | b"trkseg" => {}
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"trkpt" => {
                    let (latitude, longitude) = parse_lat_lon(&e, "trkpt")?;
                    track.push_point(RawTrackPoint::new(None, latitude, longitude, None)?);
                }
                b"wpt" => {
                    let (latitude, longitude) = parse_lat_lon(&e, "wpt")?;
                    track.push_waypoint(Waypoint::new(None, latitude, longitude, None, None)?);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    info!(
        "[Gpx] Parsed {} track points and {} waypoints",
        track.len(),
        track.waypoint_list().len()
    );

    Ok(track)
}

/// Read and parse a GPX file.
pub fn read_gpx_file(path: impl AsRef<Path>) -> Result<RawTrack> {
    let path = path.as_ref();
    info!("[Gpx] Reading {}", path.display());
    let xml = std::fs::read_to_string(path)?;
    parse_gpx(&xml)
}

fn into_raw_point(fields: PointFields) -> Result<RawTrackPoint> {
    RawTrackPoint::new(fields.time, fields.latitude, fields.longitude, fields.elevation)
}

fn into_waypoint(fields: PointFields) -> Result<Waypoint> {
    Waypoint::new(
        fields.time,
        fields.latitude,
        fields.longitude,
        fields.elevation,
        fields.name,
    )
}

fn parse_lat_lon(e: &BytesStart<'_>, element: &'static str) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| TrackError::Xml(err.into()))?;
        let attribute = match attr.key.local_name().as_ref() {
            b"lat" => "lat",
            b"lon" => "lon",
            _ => continue,
        };

        let raw = String::from_utf8_lossy(&attr.value);
        let value = raw.trim().parse::<f64>().map_err(|_| TrackError::InvalidAttribute {
            element,
            attribute,
            value: raw.to_string(),
        })?;

        if attribute == "lat" {
            lat = Some(value);
        } else {
            lon = Some(value);
        }
    }

    let lat = lat.ok_or(TrackError::MissingAttribute {
        element,
        attribute: "lat",
    })?;
    let lon = lon.ok_or(TrackError::MissingAttribute {
        element,
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

/// Called right after the point's start tag; consumes through its end tag.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    element: &'static str,
    reader: &mut Reader<&'a [u8]>,
) -> Result<PointFields> {
    let (latitude, longitude) = parse_lat_lon(start, element)?;
    let mut fields = PointFields {
        latitude,
        longitude,
        ..PointFields::default()
    };
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"ele" => {
                    // Blank or garbled elevations are treated as absent
                    fields.elevation = read_text_owned(reader, &e)?.trim().parse::<f64>().ok();
                }
                b"time" => {
                    fields.time = Some(parse_time(&read_text_owned(reader, &e)?)?);
                }
                b"name" => {
                    fields.name = Some(read_text_owned(reader, &e)?.trim().to_string());
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Event::End(e) if e.name().0 == end_name.as_slice() => break,
            Event::Eof => {
                return Err(TrackError::UnexpectedEof {
                    element: element.to_string(),
                })
            }
            _ => {}
        }
    }

    Ok(fields)
}

fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| TrackError::InvalidTimestamp {
            value: text.to_string(),
        })
}

/// Text content of an element, including CDATA and entity references.
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Text(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    match std::str::from_utf8(e.as_ref()).unwrap_or_default() {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Event::End(e) if e.name().0 == end_name.as_slice() => break,
            Event::Eof => {
                return Err(TrackError::UnexpectedEof {
                    element: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                })
            }
            _ => {}
        }
    }

    Ok(text)
}
