pub mod classifier;
pub mod collector;
pub mod producer;

pub use classifier::{ClassifierState, TrajectoryClassifier};
pub use collector::run_session;
pub use producer::{FrameSender, JsonlSampleSource, LatestSampleSource, SampleSource};

use serde::{Deserialize, Serialize};

use crate::zones::Point;

pub const MAKE_PREFIX: &str = "MAKE - ";
pub const MISS_PREFIX: &str = "MISS - ";
pub const UNKNOWN_QUADRANT: &str = "UNKNOWN";

/// One frame of detector output.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Seconds on a clock that is monotonic within the session
    pub timestamp: f64,
    /// Ball centre, `None` when nothing was detected this frame
    #[serde(default)]
    pub position: Option<Point>,
}

impl Sample {
    pub fn seen(timestamp: f64, x: f64, y: f64) -> Self {
        Self {
            timestamp,
            position: Some(Point::new(x, y)),
        }
    }

    pub fn missing(timestamp: f64) -> Self {
        Self {
            timestamp,
            position: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Make,
    Miss,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Make => write!(f, "MAKE"),
            Outcome::Miss => write!(f, "MISS"),
        }
    }
}

/// Why an attempt was scored as a miss, in evaluation priority order.
#[derive(Clone, Debug, PartialEq)]
pub enum MissReason {
    Return { entry: String, exit: String },
    Catch,
    Timeout,
    QuickPutt,
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissReason::Return { entry, exit } => {
                write!(f, "RETURN: Entry {} - Exit {}", entry, exit)
            }
            MissReason::Catch => write!(f, "CATCH"),
            MissReason::Timeout => write!(f, "TIMEOUT"),
            MissReason::QuickPutt => write!(f, "QUICK PUTT"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransitionEntry {
    pub zone: String,
    pub timestamp: f64,
}

/// Zone entries since the last resolved attempt, oldest first.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TransitionRecord {
    entries: Vec<TransitionEntry>,
}

impl TransitionRecord {
    /// Appends an entry unless `zone` is already at the head of the trace.
    /// Returns whether the trace changed.
    pub fn enter(&mut self, zone: &str, timestamp: f64) -> bool {
        if self.last().is_some_and(|e| e.zone == zone) {
            return false;
        }
        self.entries.push(TransitionEntry {
            zone: zone.to_string(),
            timestamp,
        });
        true
    }

    pub fn first(&self) -> Option<&TransitionEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&TransitionEntry> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[TransitionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A classified putt. Immutable once emitted by the classifier.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Attempt {
    pub timestamp: f64,
    pub outcome: Outcome,
    /// e.g. `MAKE - TOP` or `MISS - RETURN: Entry RAMP_LEFT - Exit RAMP_CENTER`
    pub detailed_subtype: String,
    pub position: Option<Point>,
    #[serde(default)]
    pub transitions: TransitionRecord,
    /// More than one resolution condition held on the resolving frame
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub flagged_for_review: bool,
}

impl Attempt {
    pub fn is_make(&self) -> bool {
        self.outcome == Outcome::Make
    }

    /// The detailed subtype without its outcome prefix, used as the tally key.
    pub fn category(&self) -> &str {
        let prefix = match self.outcome {
            Outcome::Make => MAKE_PREFIX,
            Outcome::Miss => MISS_PREFIX,
        };
        self.detailed_subtype
            .strip_prefix(prefix)
            .unwrap_or(&self.detailed_subtype)
    }

    pub fn record(&self) -> AttemptRecord {
        AttemptRecord {
            timestamp: self.timestamp,
            outcome: self.outcome,
            detailed_subtype: self.detailed_subtype.clone(),
            position: self.position,
        }
    }
}

/// The attempt as handed to the persistence layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AttemptRecord {
    pub timestamp: f64,
    pub outcome: Outcome,
    pub detailed_subtype: String,
    pub position: Option<Point>,
}

/// One line of an attempt log file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum SessionLogEntry {
    SessionStart {
        started_at: f64,
    },
    Attempt(Box<Attempt>),
    SessionEnd {
        ended_at: f64,
        frames_processed: usize,
        frames_dropped: usize,
    },
}
