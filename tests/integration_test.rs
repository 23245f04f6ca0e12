// End to end runs: calibration file, recorded detections, attempt log, session
// report and career aggregation.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{atomic::AtomicBool, mpsc},
    thread,
};

use puttrack::{
    Outcome, Sample, SessionLogEntry, StoredSession, TrajectoryClassifier, ZoneRoles, ZoneSet,
    ZoneWarning, aggregate_career, load_calibration, load_session_log, report_session,
    run_session,
    tracking::JsonlSampleSource,
    writer::write_session_log,
};
use tempfile::TempDir;

const ZONES: &str = r#"{"zones": [
    {"id": "PUTTING_MAT", "points": [[0, 0], [100, 0], [100, 100], [0, 100]]},
    {"id": "RAMP", "points": [[100, 0], [200, 0], [200, 100], [100, 100]]},
    {"id": "RAMP_LEFT", "parent": "RAMP", "points": [[100, 0], [200, 0], [200, 33], [100, 33]]},
    {"id": "RAMP_CENTER", "parent": "RAMP", "points": [[100, 33], [200, 33], [200, 66], [100, 66]]},
    {"id": "RAMP_RIGHT", "parent": "RAMP", "points": [[100, 66], [200, 66], [200, 100], [100, 100]]},
    {"id": "HOLE", "points": [[200, 25], [250, 25], [250, 75], [200, 75]]},
    {"id": "HOLE_TOP", "parent": "HOLE", "points": [[225, 25], [250, 25], [250, 70], [225, 70]]},
    {"id": "HOLE_LEFT", "parent": "HOLE", "points": [[200, 25], [225, 25], [225, 50], [200, 50]]},
    {"id": "HOLE_RIGHT", "parent": "HOLE", "points": [[200, 50], [225, 50], [225, 75], [200, 75]]},
    {"id": "HOLE_LOW", "parent": "HOLE", "points": [[240, 70], [250, 70], [250, 75], [240, 75]]},
    {"id": "CATCH", "points": [[250, 0], [300, 0], [300, 100], [250, 100]]},
    {"id": "RETURN_TRACK", "points": [[0, 100], [300, 100], [300, 130], [0, 130]]},
    {"id": "IGNORE_AREA", "points": [[0, 0], [10, 0], [10, 10], [0, 10]]}
]}"#;

const LEGACY_ZONES: &str = r#"{
    "camera_index": 0,
    "PUTTING_MAT_ROI": [[0, 0], [100, 0], [100, 100], [0, 100]],
    "RAMP_ROI": [[100, 0], [200, 0], [200, 100], [100, 100]],
    "HOLE_ROI": [[200, 25], [250, 25], [250, 75], [200, 75]],
    "HOLE_TOP_ROI": [[225, 25], [250, 25], [250, 70], [225, 70]],
    "CATCH_ROI": [[250, 0], [300, 0], [300, 100], [250, 100]],
    "RETURN_TRACK_ROI": [[0, 100], [300, 100], [300, 130], [0, 130]]
}"#;

const RAMP_CENTER: (f64, f64) = (150., 50.);
const RAMP_RIGHT: (f64, f64) = (150., 90.);
const HOLE_TOP: (f64, f64) = (240., 40.);
const HOLE_RIGHT: (f64, f64) = (210., 60.);
const RETURN: (f64, f64) = (150., 120.);

fn at(t: f64, pos: (f64, f64)) -> Sample {
    Sample::seen(t, pos.0, pos.1)
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn write_samples(dir: &TempDir, samples: &[Sample]) -> PathBuf {
    let path = dir.path().join("samples.jsonl");
    serde_jsonlines::write_json_lines(&path, samples).unwrap();
    path
}

fn classifier(zones: &Path) -> TrajectoryClassifier {
    let (zone_set, warnings) =
        ZoneSet::new(load_calibration(zones).unwrap(), ZoneRoles::default());
    assert!(warnings.is_empty(), "{:?}", warnings);
    TrajectoryClassifier::new(zone_set, 3.)
}

/// MAKE top, MAKE top, MISS return, MAKE right over two minutes
fn mixed_session() -> Vec<Sample> {
    vec![
        at(0., RAMP_CENTER),
        at(1., HOLE_TOP),
        at(10., RAMP_CENTER),
        at(11., HOLE_TOP),
        at(20., RAMP_CENTER),
        at(20.5, RAMP_RIGHT),
        at(21., RETURN),
        at(30., RAMP_CENTER),
        at(31., HOLE_RIGHT),
        Sample::missing(120.),
    ]
}

#[test]
fn test_recorded_session_end_to_end() {
    let dir = TempDir::new().unwrap();
    let zones = write_file(&dir, "zones.json", ZONES);
    let samples = write_samples(&dir, &mixed_session());
    let log_path = dir.path().join("attempts.jsonl");

    let (log_tx, log_rx) = mpsc::channel::<SessionLogEntry>();
    let writer_path = log_path.clone();
    let writer = thread::spawn(move || write_session_log(&writer_path, log_rx));

    let mut classifier = classifier(&zones);
    let cancel = AtomicBool::new(false);
    let session_log = run_session(
        JsonlSampleSource::from_file(&samples).unwrap(),
        &mut classifier,
        None,
        &cancel,
        Some(log_tx),
    )
    .unwrap();
    writer.join().unwrap().unwrap();

    let summary = report_session(&session_log).unwrap();
    assert_eq!(summary.total_makes, 3);
    assert_eq!(summary.total_misses, 1);
    assert_eq!(summary.best_streak, 2);
    assert_eq!(summary.session_duration_s, 120.);
    assert_eq!(summary.makes_per_minute, 1.5);
    assert_eq!(summary.makes_by_category["TOP"], 2);
    assert_eq!(summary.makes_by_category["RIGHT"], 1);
    assert_eq!(
        summary.misses_by_category["RETURN: Entry RAMP_CENTER - Exit RAMP_RIGHT"],
        1
    );
    assert_eq!(summary.putt_list[2].outcome, Outcome::Miss);

    // the written log rebuilds the same report
    let reloaded = load_session_log(&log_path).unwrap();
    assert_eq!(reloaded.attempts.len(), 4);
    assert_eq!(report_session(&reloaded).unwrap(), summary);
}

#[test]
fn test_sessions_roll_up_into_career() {
    let dir = TempDir::new().unwrap();
    let zones = write_file(&dir, "zones.json", ZONES);
    let cancel = AtomicBool::new(false);

    let mut stored = Vec::new();
    for (id, samples) in [(1, mixed_session()), (2, mixed_session())] {
        let mut classifier = classifier(&zones);
        let log = run_session(
            JsonlSampleSource::from_samples(samples),
            &mut classifier,
            None,
            &cancel,
            None,
        )
        .unwrap();
        let summary = report_session(&log).unwrap();
        stored.push(StoredSession::from_summary(id, &summary).unwrap());
    }

    let career = aggregate_career(42, &stored);
    assert_eq!(career.player_id, 42);
    assert_eq!(career.total_makes, 6);
    assert_eq!(career.high_makes, 3);
    assert_eq!(career.total_duration_s, 240.);
    assert_eq!(career.avg_makes_per_minute, 1.5);
    assert_eq!(career.makes_by_category["TOP"].sum, 4);
    assert_eq!(career.makes_by_category["TOP"].high, 2);
    assert!(career.degraded_fields.is_empty());
    assert!(career.excluded_sessions.is_empty());

    let json = serde_json::to_value(&career).unwrap();
    assert!(json["fastest_21_makes_s"].is_null());
}

#[test]
fn test_time_limit_ends_session() {
    let dir = TempDir::new().unwrap();
    let zones = write_file(&dir, "zones.json", ZONES);
    let mut classifier = classifier(&zones);
    let cancel = AtomicBool::new(false);
    let log = run_session(
        JsonlSampleSource::from_samples(mixed_session()),
        &mut classifier,
        Some(25.),
        &cancel,
        None,
    )
    .unwrap();
    let summary = report_session(&log).unwrap();
    assert_eq!(summary.total_putts, 3);
    assert_eq!(summary.session_duration_s, 25.);
}

#[test]
fn test_legacy_calibration_recovers_quadrants() {
    let dir = TempDir::new().unwrap();
    let zones = write_file(&dir, "legacy.json", LEGACY_ZONES);
    let calibration = load_calibration(&zones).unwrap();
    assert!(calibration.legacy_format);

    let (zone_set, warnings) = ZoneSet::new(calibration, ZoneRoles::default());
    assert!(warnings.contains(&ZoneWarning::QuadrantsReinferred {
        target: "HOLE".to_string()
    }));
    let mut classifier = TrajectoryClassifier::new(zone_set, 3.);
    assert!(classifier.process(&at(0., RAMP_CENTER)).is_none());
    // just right of the hole centre
    let attempt = classifier.process(&at(1., (240., 50.))).unwrap();
    assert_eq!(attempt.detailed_subtype, "MAKE - TOP");
}

#[test]
fn test_degenerate_zone_does_not_stop_tracking() {
    let dir = TempDir::new().unwrap();
    let broken = ZONES.replace(
        r#"{"id": "CATCH", "points": [[250, 0], [300, 0], [300, 100], [250, 100]]}"#,
        r#"{"id": "CATCH", "points": [[250, 0], [300, 0]]}"#,
    );
    let zones = write_file(&dir, "zones.json", &broken);
    let (zone_set, warnings) =
        ZoneSet::new(load_calibration(&zones).unwrap(), ZoneRoles::default());
    assert_eq!(warnings.len(), 2);

    let mut classifier = TrajectoryClassifier::new(zone_set, 3.);
    let attempts: Vec<_> = [
        at(0., RAMP_CENTER),
        at(1., (270., 50.)),
        Sample::missing(5.),
    ]
    .iter()
    .filter_map(|s| classifier.process(s))
    .collect();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].detailed_subtype, "MISS - TIMEOUT");
}
