pub mod loader;

pub use loader::{load_session_log, session_log_from_entries};

use std::collections::{BTreeMap, VecDeque};

use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    PuttrackError,
    tracking::{Attempt, AttemptRecord},
};

/// Consecutive-make thresholds tracked for streak binning.
pub const STREAK_THRESHOLDS: [u32; 7] = [3, 7, 10, 15, 21, 50, 100];
pub const FASTEST_MAKES_TARGET: usize = 21;
pub const ROLLING_WINDOW_S: f64 = 60.;

/// Everything the runner knows about a finished session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionLog {
    /// First launch zone observation
    pub started_at: f64,
    pub ended_at: f64,
    pub frames_processed: usize,
    pub frames_dropped: usize,
    pub attempts: Vec<Attempt>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub total_putts: u32,
    pub total_makes: u32,
    pub total_misses: u32,
    pub best_streak: u32,
    /// Seconds from session start to the 21st make
    pub fastest_21_makes_s: Option<f64>,
    pub putts_per_minute: f64,
    pub makes_per_minute: f64,
    pub most_makes_in_60s: u32,
    pub session_duration_s: f64,
    /// Keyed by quadrant, e.g. `TOP` or `UNKNOWN`
    pub makes_by_category: BTreeMap<String, u32>,
    /// Keyed by miss subtype without the `MISS - ` prefix
    pub misses_by_category: BTreeMap<String, u32>,
    /// Threshold to number of times it was reached, see [`streak_bins`]
    pub consecutive_streaks: BTreeMap<u32, u32>,
    pub flagged_for_review: u32,
    pub putt_list: Vec<AttemptRecord>,
}

impl SessionSummary {
    /// Makes over attempts, `None` for a session without attempts.
    pub fn accuracy(&self) -> Option<f64> {
        (self.total_putts > 0).then(|| self.total_makes as f64 / self.total_putts as f64)
    }
}

/// Adds one maximal run of `length` makes to the threshold counts. A run counts
/// `length / T` times towards every threshold `T` it reaches.
pub fn bin_streak(bins: &mut BTreeMap<u32, u32>, length: u32) {
    for threshold in STREAK_THRESHOLDS.into_iter().filter(|t| *t <= length) {
        *bins.entry(threshold).or_default() += length / threshold;
    }
}

/// Threshold counts for the given outcome sequence, every threshold present.
pub fn streak_bins(makes: impl IntoIterator<Item = bool>) -> BTreeMap<u32, u32> {
    let mut bins: BTreeMap<u32, u32> = STREAK_THRESHOLDS.into_iter().map(|t| (t, 0)).collect();
    let mut run = 0;
    for make in makes {
        if make {
            run += 1;
        } else {
            bin_streak(&mut bins, run);
            run = 0;
        }
    }
    bin_streak(&mut bins, run);
    bins
}

/// Largest number of makes within any window of `window_s` seconds that starts
/// at a make. The window is half open: a make exactly `window_s` earlier is no
/// longer in it. `times` must be non-decreasing.
pub fn most_in_window(times: impl IntoIterator<Item = f64>, window_s: f64) -> u32 {
    let mut window = VecDeque::new();
    let mut best = 0;
    for t in times {
        while window.front().is_some_and(|old| t - old >= window_s) {
            window.pop_front();
        }
        window.push_back(t);
        best = best.max(window.len() as u32);
    }
    best
}

fn check_monotonic(attempts: &[Attempt]) -> Result<(), PuttrackError> {
    for (index, (previous, current)) in attempts
        .iter()
        .map(|a| a.timestamp)
        .tuple_windows()
        .enumerate()
    {
        if !(current >= previous) {
            return Err(PuttrackError::NonMonotonicTimestamps {
                index: index + 1,
                previous,
                current,
            });
        }
    }
    if let Some(bad) = attempts.iter().position(|a| !a.timestamp.is_finite()) {
        return Err(PuttrackError::NonMonotonicTimestamps {
            index: bad,
            previous: f64::NAN,
            current: attempts[bad].timestamp,
        });
    }
    Ok(())
}

fn per_minute(count: u32, duration_s: f64) -> f64 {
    if duration_s > 0. {
        count as f64 / (duration_s / 60.)
    } else {
        0.
    }
}

/// Computes the summary of a finished session. Pure: the same log always
/// yields the same summary.
pub fn report_session(log: &SessionLog) -> Result<SessionSummary, PuttrackError> {
    check_monotonic(&log.attempts)?;

    let duration = if log.ended_at.is_finite() && log.started_at.is_finite() {
        (log.ended_at - log.started_at).max(0.)
    } else {
        warn!(
            "Session bounds {} - {} are not usable, duration set to 0",
            log.started_at, log.ended_at
        );
        0.
    };

    let mut summary = SessionSummary {
        session_duration_s: duration,
        ..Default::default()
    };
    let mut run = 0;
    for attempt in &log.attempts {
        summary.total_putts += 1;
        if attempt.flagged_for_review {
            summary.flagged_for_review += 1;
        }
        let category = attempt.category().to_string();
        if attempt.is_make() {
            summary.total_makes += 1;
            run += 1;
            summary.best_streak = summary.best_streak.max(run);
            if summary.total_makes as usize == FASTEST_MAKES_TARGET {
                summary.fastest_21_makes_s = Some((attempt.timestamp - log.started_at).max(0.));
            }
            *summary.makes_by_category.entry(category).or_default() += 1;
        } else {
            summary.total_misses += 1;
            run = 0;
            *summary.misses_by_category.entry(category).or_default() += 1;
        }
        summary.putt_list.push(attempt.record());
    }

    summary.putts_per_minute = per_minute(summary.total_putts, duration);
    summary.makes_per_minute = per_minute(summary.total_makes, duration);
    summary.most_makes_in_60s = most_in_window(
        log.attempts
            .iter()
            .filter(|a| a.is_make())
            .map(|a| a.timestamp),
        ROLLING_WINDOW_S,
    );
    summary.consecutive_streaks = streak_bins(log.attempts.iter().map(Attempt::is_make));
    Ok(summary)
}
