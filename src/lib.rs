// Library interface for puttrack
// This allows integration tests and benchmarks to access internal modules

pub mod career;
pub mod config;
pub mod errors;
pub mod session;
pub mod tracking;
pub mod writer;
pub mod zones;

// Re-export commonly used types
pub use career::{
    CareerAccumulator, CareerSummary, LifetimeCounters, StoredSession, aggregate_career,
    aggregate_career_with,
};
pub use config::TrackerConfig;
pub use errors::PuttrackError;
pub use session::{SessionLog, SessionSummary, load_session_log, report_session};
pub use tracking::{
    Attempt, AttemptRecord, Outcome, Sample, SessionLogEntry, TrajectoryClassifier, run_session,
};
pub use zones::{Calibration, Point, ZoneRoles, ZoneSet, ZoneWarning, load_calibration};
