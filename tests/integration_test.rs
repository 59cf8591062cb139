use tour_viewer_wasm::error::ParseError;
use tour_viewer_wasm::options::ViewerOptions;
use tour_viewer_wasm::parser::parse_gpx_bytes;
use tour_viewer_wasm::session::{TourReport, TourSession, UploadState, ViewStatus};
use tour_viewer_wasm::stats::{MovementSummary, moving_data};
use tour_viewer_wasm::track::Track;

fn load_fixture(path: &str) -> Vec<u8> {
    std::fs::read(format!("tests/fixtures/{path}")).unwrap()
}

fn analyze(path: &str) -> TourReport {
    TourReport::analyze(path, &load_fixture(path), &ViewerOptions::default()).unwrap()
}

#[test]
fn test_dispatch_tour() {
    let report = analyze("DL12345.gpx");

    assert_eq!(report.track.len(), 11);
    assert_eq!(report.title.as_deref(), Some("Tour 12345"));
    assert_eq!(
        report.tour_info.as_deref(),
        Some("Tour Nr. 12345 | Datum: 01.06.2024")
    );

    let s = &report.summary;
    assert!((s.distance_km - 11.1195).abs() < 1e-3);
    assert_eq!(s.moving_time_seconds, 1800.0);
    assert_eq!(s.average_speed_kmh, s.distance_km / (s.moving_time_seconds / 3600.0));
    assert_eq!(s.start_time.as_deref(), Some("12:00 Uhr"));
    assert_eq!(s.end_time.as_deref(), Some("12:30 Uhr"));
    assert_eq!(s.date.as_deref(), Some("01.06.2024"));
}

#[test]
fn test_points_keep_recording_order() {
    let report = analyze("DL12345.gpx");
    let lats: Vec<f64> = report.track.waypoints().iter().map(|wp| wp.latitude).collect();
    assert!(lats.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(report.track.center().map(|wp| wp.latitude), Some(50.05));
}

#[test]
fn test_stops_and_segment_gaps() {
    let data = parse_gpx_bytes(&load_fixture("stops.gpx")).unwrap();
    let moving = moving_data(&data.segments(), 1.0);
    assert_eq!(moving.moving_time_s, 180.0);
    assert_eq!(moving.stopped_time_s, 1800.0);
    assert!((moving.moving_distance_m - 3333.6).abs() < 1.0);

    let s = MovementSummary::from_document(&data, &ViewerOptions::default());
    assert_eq!(s.start_time.as_deref(), Some("08:00 Uhr"));
    assert_eq!(s.end_time.as_deref(), Some("09:03 Uhr"));
    assert!((s.average_speed_kmh - 66.67).abs() < 0.05);
}

#[test]
fn test_custom_offset_and_suffix() {
    let opts = ViewerOptions {
        utc_offset_hours: 1,
        clock_suffix: "h".to_string(),
        ..Default::default()
    };
    let report = TourReport::analyze("DL9.gpx", &load_fixture("DL12345.gpx"), &opts).unwrap();
    assert_eq!(report.summary.start_time.as_deref(), Some("11:00 h"));
    assert_eq!(report.summary.end_time.as_deref(), Some("11:30 h"));
}

#[test]
fn test_route_only_file() {
    let report = analyze("route_only.gpx");
    assert_eq!(report.track.len(), 3);
    assert_eq!(report.tour_info, None);

    let s = &report.summary;
    assert!((s.distance_km - 22.239).abs() < 0.01);
    assert_eq!(s.moving_time_seconds, 0.0);
    assert_eq!(s.average_speed_kmh, 0.0);
    assert!(s.start_time.is_none());
    assert!(s.date.is_none());
}

#[test]
fn test_no_points_file() {
    let report = analyze("no_points.gpx");
    assert!(report.track.is_empty());
    assert_eq!(report.summary, MovementSummary::default());
}

#[test]
fn test_truncated_file() {
    let err = parse_gpx_bytes(&load_fixture("truncated.gpx")).unwrap_err();
    assert!(matches!(
        err,
        ParseError::XmlParse(_) | ParseError::UnexpectedEof(_)
    ));
}

#[test]
fn test_session_over_fixtures() {
    let mut session = TourSession::new(ViewerOptions::default()).unwrap();

    session.upload("DL12345.gpx", &load_fixture("DL12345.gpx"));
    assert!(matches!(session.state(), UploadState::Rendered(_)));
    let export = session.map_export().unwrap();
    assert!(export.content.contains("<title>Tour 12345</title>"));
    assert!(export.content.contains("center: [50.05,8.0]"));

    session.upload("truncated.gpx", &load_fixture("truncated.gpx"));
    let view = session.view().unwrap();
    assert_eq!(view.status, ViewStatus::Error);
    assert!(view.message.is_some());

    session.upload("no_points.gpx", &load_fixture("no_points.gpx"));
    assert_eq!(session.view().unwrap().status, ViewStatus::Empty);
    assert!(session.map_export().is_err());
}

#[test]
fn test_track_from_route_fallback_matches_report() {
    let data = parse_gpx_bytes(&load_fixture("route_only.gpx")).unwrap();
    let track = Track::from_document(&data);
    assert_eq!(track.coordinates()[2], (50.2, 8.0));
}
