use log::{debug, info, warn};

use crate::{
    config::TrackerConfig,
    zones::{Location, Point, ZoneRole, ZoneSet},
};

use super::{
    Attempt, MAKE_PREFIX, MISS_PREFIX, MissReason, Outcome, Sample, TransitionRecord,
    UNKNOWN_QUADRANT,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierState {
    /// The ball has not been seen in the launch zone yet
    PreSession,
    /// Scoring is active, no attempt in progress
    Idle,
    /// A putt left the launch zone and its trace is being recorded
    Tracking,
}

/// Turns a stream of ball positions into scored attempts, one frame at a time
/// and without lookahead. Emits at most one attempt per frame.
pub struct TrajectoryClassifier {
    zones: ZoneSet,
    detection_timeout_s: f64,
    state: ClassifierState,
    session_start: Option<f64>,
    last_timestamp: Option<f64>,
    last_detection: Option<f64>,
    current: Option<Location>,
    trace: TransitionRecord,
    frames_processed: usize,
}

impl TrajectoryClassifier {
    pub fn new(zones: ZoneSet, detection_timeout_s: f64) -> Self {
        Self {
            zones,
            detection_timeout_s,
            state: ClassifierState::PreSession,
            session_start: None,
            last_timestamp: None,
            last_detection: None,
            current: None,
            trace: TransitionRecord::default(),
            frames_processed: 0,
        }
    }

    pub fn from_config(zones: ZoneSet, config: &TrackerConfig) -> Self {
        Self::new(zones, config.detection_timeout_s)
    }

    pub fn state(&self) -> ClassifierState {
        self.state
    }

    /// Timestamp of the first launch zone observation, which starts the session clock.
    pub fn session_start(&self) -> Option<f64> {
        self.session_start
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    pub fn trace(&self) -> &TransitionRecord {
        &self.trace
    }

    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    /// Feed one frame. Frames with a timestamp earlier than the previous one
    /// are dropped without touching any state.
    pub fn process(&mut self, sample: &Sample) -> Option<Attempt> {
        let timestamp = sample.timestamp;
        if !timestamp.is_finite() || self.last_timestamp.is_some_and(|last| timestamp < last) {
            warn!(
                "Dropping sample with timestamp {} (previous {:?})",
                timestamp, self.last_timestamp
            );
            return None;
        }
        self.last_timestamp = Some(timestamp);
        self.frames_processed += 1;

        let observed = match sample.position {
            Some(point) if point.is_finite() => match self.zones.locate(point) {
                Some(location) if location.role == ZoneRole::Exclusion => None,
                location => Some((point, location)),
            },
            _ => None,
        };

        match observed {
            None => self.on_missing(timestamp),
            Some((point, location)) => self.on_detection(timestamp, point, location),
        }
    }

    /// Abandons the attempt in progress, e.g. when the session time limit is
    /// reached. The partial trace is returned but never scored.
    pub fn discard_in_progress(&mut self) -> Option<TransitionRecord> {
        if self.state != ClassifierState::Tracking {
            return None;
        }
        self.state = ClassifierState::Idle;
        let trace = std::mem::take(&mut self.trace);
        info!("Discarding unresolved attempt with {} transitions", trace.len());
        Some(trace)
    }

    fn timed_out(&self, timestamp: f64) -> bool {
        self.state == ClassifierState::Tracking
            && self
                .last_detection
                .is_some_and(|seen| timestamp - seen > self.detection_timeout_s)
    }

    // A frame without a usable detection never changes zone membership.
    fn on_missing(&mut self, timestamp: f64) -> Option<Attempt> {
        if self.timed_out(timestamp) {
            return Some(self.resolve(
                timestamp,
                Outcome::Miss,
                MissReason::Timeout.to_string(),
                None,
                false,
            ));
        }
        None
    }

    fn on_detection(
        &mut self,
        timestamp: f64,
        point: Point,
        location: Option<Location>,
    ) -> Option<Attempt> {
        let gap_exceeded = self.timed_out(timestamp);
        let was_in_launch = self.current.as_ref().is_some_and(|l| l.in_launch);
        let in_launch = location.as_ref().is_some_and(|l| l.in_launch);
        let launch_entry = in_launch && !was_in_launch;
        self.last_detection = Some(timestamp);
        self.current = location.clone();

        match self.state {
            ClassifierState::PreSession => {
                if let Some(location) = location.filter(|l| l.in_launch) {
                    info!("Scoring activated at {:.2}s", timestamp);
                    self.session_start = Some(timestamp);
                    self.begin_attempt(timestamp, &location);
                }
                None
            }
            ClassifierState::Idle => {
                if let Some(location) = location.filter(|_| launch_entry) {
                    self.begin_attempt(timestamp, &location);
                }
                None
            }
            ClassifierState::Tracking => {
                self.track(timestamp, point, location, gap_exceeded, launch_entry)
            }
        }
    }

    fn track(
        &mut self,
        timestamp: f64,
        point: Point,
        location: Option<Location>,
        gap_exceeded: bool,
        launch_entry: bool,
    ) -> Option<Attempt> {
        // exit zone of a return is whatever the trace ended on before this frame
        let exit = self.trace.last().map(|e| e.zone.clone());
        let entered = location
            .as_ref()
            .is_some_and(|l| self.trace.enter(&l.label, timestamp));
        if entered {
            debug!(
                "Ball entered {} at {:.2}s",
                self.trace.last().map_or("", |e| e.zone.as_str()),
                timestamp
            );
        }
        let role = location.as_ref().map(|l| l.role);

        if role == Some(ZoneRole::Target) {
            let quadrant = location
                .as_ref()
                .and_then(|l| l.quadrant)
                .map_or(UNKNOWN_QUADRANT, |q| q.as_str());
            return Some(self.resolve(
                timestamp,
                Outcome::Make,
                quadrant.to_string(),
                Some(point),
                gap_exceeded,
            ));
        }

        let in_return = location
            .as_ref()
            .is_some_and(|l| l.in_return && !l.in_launch);
        let in_catch = location.as_ref().is_some_and(|l| l.in_catch);

        if in_return {
            let entry = self.trace.first().map(|e| e.zone.clone()).unwrap_or_default();
            let reason = MissReason::Return {
                entry,
                exit: exit.unwrap_or_default(),
            };
            return Some(self.resolve(
                timestamp,
                Outcome::Miss,
                reason.to_string(),
                Some(point),
                gap_exceeded || in_catch,
            ));
        }

        if in_catch {
            return Some(self.resolve(
                timestamp,
                Outcome::Miss,
                MissReason::Catch.to_string(),
                Some(point),
                gap_exceeded,
            ));
        }

        // a launch entry belongs to the next putt, not the one being closed
        if launch_entry && entered {
            self.trace.entries.pop();
        }

        if gap_exceeded {
            let attempt = self.resolve(
                timestamp,
                Outcome::Miss,
                MissReason::Timeout.to_string(),
                None,
                launch_entry,
            );
            if let Some(location) = location.filter(|_| launch_entry) {
                self.begin_attempt(timestamp, &location);
            }
            return Some(attempt);
        }

        if launch_entry {
            let attempt = self.resolve(
                timestamp,
                Outcome::Miss,
                MissReason::QuickPutt.to_string(),
                Some(point),
                false,
            );
            if let Some(location) = location {
                self.begin_attempt(timestamp, &location);
            }
            return Some(attempt);
        }

        None
    }

    fn begin_attempt(&mut self, timestamp: f64, location: &Location) {
        self.state = ClassifierState::Tracking;
        self.trace.clear();
        self.trace.enter(&location.label, timestamp);
        debug!("Putt started from {} at {:.2}s", location.label, timestamp);
    }

    fn resolve(
        &mut self,
        timestamp: f64,
        outcome: Outcome,
        subtype: String,
        position: Option<Point>,
        flagged_for_review: bool,
    ) -> Attempt {
        let prefix = match outcome {
            Outcome::Make => MAKE_PREFIX,
            Outcome::Miss => MISS_PREFIX,
        };
        let attempt = Attempt {
            timestamp,
            outcome,
            detailed_subtype: format!("{}{}", prefix, subtype),
            position,
            transitions: std::mem::take(&mut self.trace),
            flagged_for_review,
        };
        self.state = ClassifierState::Idle;
        if flagged_for_review {
            warn!(
                "Attempt at {:.2}s resolved as {} while another condition also held, flagged for review",
                timestamp, attempt.detailed_subtype
            );
        } else {
            info!("Attempt at {:.2}s: {}", timestamp, attempt.detailed_subtype);
        }
        attempt
    }
}
