// Error types for puttrack

use crate::tracking::SessionLogEntry;
use snafu::Snafu;
use std::{io, sync::mpsc::SendError};

#[derive(Debug, Snafu)]
pub enum PuttrackError {
    // Calibration errors
    #[snafu(display("Unable to read zone calibration file"))]
    ZoneConfigIOError { source: io::Error },
    #[snafu(display("Unable to parse zone calibration file"))]
    ZoneConfigParseError { source: serde_json::Error },

    // Errors while reading detections
    #[snafu(display("Sample source error: {reason}"))]
    SampleSourceError { reason: String },
    #[snafu(display("Error broadcasting session log entry"))]
    SessionLogBroadcastError {
        source: Box<SendError<SessionLogEntry>>,
    },

    // Errors for the attempt log writer and loader
    #[snafu(display("Error writing attempt log"))]
    WriterError { source: io::Error },
    #[snafu(display("Error loading attempt log"))]
    SessionLogLoaderError { source: io::Error },
    #[snafu(display("Invalid attempt log: {reason}"))]
    InvalidSessionLog { reason: String },
    #[snafu(display("Error loading stored sessions"))]
    StoredSessionLoaderError { source: io::Error },
    #[snafu(display("Invalid stored session: {reason}"))]
    InvalidStoredSession { reason: String },
    #[snafu(display("Error serializing session record"))]
    SessionSerializeError { source: serde_json::Error },

    // Data quality errors
    #[snafu(display(
        "Non-monotonic timestamps at attempt {index}: {current} follows {previous}"
    ))]
    NonMonotonicTimestamps {
        index: usize,
        previous: f64,
        current: f64,
    },

    // Config management errors
    #[snafu(display("Could not find application config directory"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },
}

impl From<SendError<SessionLogEntry>> for PuttrackError {
    fn from(value: SendError<SessionLogEntry>) -> Self {
        PuttrackError::SessionLogBroadcastError {
            source: Box::new(value),
        }
    }
}
