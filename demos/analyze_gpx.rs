//! Analyze a GPX recording and print its rest stops and trip report.
//!
//! Run with: cargo run --example analyze_gpx -- <track.gpx> [report.txt|report.md]

use track_analyzer::{
    analyze_track, read_gpx_file, Point, ReportConfig, ReportFormat, TripReport,
};

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        eprintln!("usage: analyze_gpx <track.gpx> [report.txt|report.md]");
        std::process::exit(2);
    };
    let output = args.next();

    let raw = match read_gpx_file(&input) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Failed to read {input}: {e}");
            std::process::exit(1);
        }
    };

    let track = match analyze_track(&raw) {
        Ok(track) => track,
        Err(e) => {
            eprintln!("Analysis failed: {e}");
            std::process::exit(1);
        }
    };

    println!("Track Analysis\n");
    println!("  raw points:      {}", raw.len());
    println!("  analyzed points: {}", track.main_track().len());
    println!("  waypoints:       {}", track.waypoint_list().len());
    println!("  length:          {:.2} km", track.polyline_length() / 1000.0);
    println!(
        "  moved:           {:.2} km\n",
        track.total_integral_displacement() / 1000.0
    );

    println!("Rest stops:");
    for (i, rest) in track.rest_point_list().iter().enumerate() {
        println!(
            "  {}. {} - {} ({} min) at {:.5}, {:.5}",
            i + 1,
            rest.start_time().format("%H:%M:%S"),
            rest.end_time().format("%H:%M:%S"),
            rest.duration().num_minutes(),
            rest.latitude(),
            rest.longitude()
        );
    }
    if track.rest_point_list().is_empty() {
        println!("  (none)");
    }

    let format = output
        .as_deref()
        .and_then(|p| std::path::Path::new(p).extension())
        .and_then(|e| e.to_str())
        .and_then(ReportFormat::from_extension)
        .unwrap_or_default();
    let config = ReportConfig {
        format,
        ..ReportConfig::default()
    };
    let report = TripReport::from_track(&track, &config);

    match output {
        Some(path) => match report.write_to(&path) {
            Ok(written) => println!("\nReport written to {}", written.display()),
            Err(e) => {
                eprintln!("Failed to write report: {e}");
                std::process::exit(1);
            }
        },
        None => println!("\n{}", report.render()),
    }
}
