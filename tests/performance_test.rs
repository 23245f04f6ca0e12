use std::time::Instant;

use puttrack::{
    Sample, TrajectoryClassifier, ZoneRoles, ZoneSet,
    zones::{Calibration, Point, ZoneDefinition},
};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
    vec![
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
    ]
}

fn zone_set() -> ZoneSet {
    let zones = vec![
        ZoneDefinition::new("PUTTING_MAT", rect(0., 0., 100., 100.)),
        ZoneDefinition::new("RAMP", rect(100., 0., 200., 100.)),
        ZoneDefinition::new("RAMP_LEFT", rect(100., 0., 200., 33.)).with_parent("RAMP"),
        ZoneDefinition::new("RAMP_CENTER", rect(100., 33., 200., 66.)).with_parent("RAMP"),
        ZoneDefinition::new("RAMP_RIGHT", rect(100., 66., 200., 100.)).with_parent("RAMP"),
        // no quadrants, they are inferred from the hole outline
        ZoneDefinition::new("HOLE", rect(200., 25., 250., 75.)),
        ZoneDefinition::new("CATCH", rect(250., 0., 300., 100.)),
        ZoneDefinition::new("RETURN_TRACK", rect(0., 100., 300., 130.)),
        ZoneDefinition::new("IGNORE_AREA", rect(0., 0., 10., 10.)),
    ];
    let calibration = Calibration {
        zones,
        legacy_format: false,
    };
    ZoneSet::new(calibration, ZoneRoles::default()).0
}

/// A ball rolling up the ramp into the hole, then back, over and over at 60Hz.
fn rolling_ball(frames: usize) -> Vec<Sample> {
    (0..frames)
        .map(|i| {
            let t = i as f64 / 60.;
            let phase = (i % 120) as f64 / 120.;
            if i % 17 == 0 {
                Sample::missing(t)
            } else {
                Sample::seen(t, 120. + phase * 170., 50. + (phase * 12.).sin() * 20.)
            }
        })
        .collect()
}

/// The classifier has to keep up with a 60Hz camera
#[test]
fn test_classifier_keeps_up_with_live_frames() {
    let samples = rolling_ball(60 * 60 * 5);
    let mut classifier = TrajectoryClassifier::new(zone_set(), 3.);
    let target_time_per_frame_us = 16670.0;

    let start = Instant::now();
    let attempts = samples
        .iter()
        .filter_map(|s| classifier.process(s))
        .count();
    let elapsed = start.elapsed();

    let avg_time_per_frame_us = elapsed.as_micros() as f64 / samples.len() as f64;
    println!(
        "Processed {} frames ({} attempts) in {:?}, {:.2}μs per frame",
        samples.len(),
        attempts,
        elapsed,
        avg_time_per_frame_us
    );
    assert!(attempts > 0);
    assert!(attempts <= classifier.frames_processed());
    assert!(
        avg_time_per_frame_us < target_time_per_frame_us,
        "Processing too slow: {:.2}μs per frame (target: {:.2}μs)",
        avg_time_per_frame_us,
        target_time_per_frame_us
    );
}
