// Lifetime statistics, recomputed from every stored session on each run

pub mod stored;

pub use stored::{StoredSession, load_stored_sessions};

use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    session::{STREAK_THRESHOLDS, streak_bins},
    tracking::Outcome,
};

use stored::ColumnIssue;

/// Totals kept outside the session rows, e.g. from sessions whose details were
/// purged.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifetimeCounters {
    pub total_putts: u64,
    pub total_makes: u64,
    pub total_misses: u64,
    pub total_duration_s: f64,
}

/// Per miss subtype. `low` is the smallest non-zero per-session count, `None`
/// while no session had one.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryStats {
    pub low: Option<u32>,
    pub high: u32,
    pub sum: u64,
}

impl CategoryStats {
    fn add(&mut self, count: u32) {
        if count > 0 {
            self.low = Some(self.low.map_or(count, |low| low.min(count)));
        }
        self.high = self.high.max(count);
        self.sum += count as u64;
    }
}

/// Per quadrant. A quadrant missing from a session is a real zero, so there is
/// no low water mark.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct QuadrantStats {
    pub high: u32,
    pub sum: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DegradedField {
    pub session_id: u64,
    pub field: String,
    pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExcludedSession {
    pub session_id: u64,
    pub reason: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CareerSummary {
    pub player_id: u64,
    pub sessions_counted: u32,
    pub total_putts: u64,
    pub total_makes: u64,
    pub total_misses: u64,
    pub high_makes: u32,
    pub best_streak: u32,
    pub fastest_21_makes_s: Option<f64>,
    pub high_putts_per_minute: f64,
    pub avg_putts_per_minute: f64,
    pub high_makes_per_minute: f64,
    pub avg_makes_per_minute: f64,
    pub high_accuracy: Option<f64>,
    pub avg_accuracy: Option<f64>,
    pub high_most_makes_in_60s: u32,
    pub high_session_duration_s: f64,
    pub total_duration_s: f64,
    pub consecutive_streaks: BTreeMap<u32, u64>,
    pub makes_by_category: BTreeMap<String, QuadrantStats>,
    pub misses_by_category: BTreeMap<String, CategoryStats>,
    pub degraded_fields: Vec<DegradedField>,
    pub excluded_sessions: Vec<ExcludedSession>,
}

/// Running state of one aggregation pass. Owned by the caller so separate
/// passes never share totals.
#[derive(Clone, Debug)]
pub struct CareerAccumulator {
    summary: CareerSummary,
}

impl Default for CareerAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl CareerAccumulator {
    pub fn new() -> Self {
        Self {
            summary: CareerSummary {
                consecutive_streaks: STREAK_THRESHOLDS.into_iter().map(|t| (t, 0)).collect(),
                ..Default::default()
            },
        }
    }

    pub fn with_lifetime(counters: LifetimeCounters) -> Self {
        let mut accumulator = Self::new();
        let summary = &mut accumulator.summary;
        summary.total_putts = counters.total_putts;
        summary.total_makes = counters.total_makes;
        summary.total_misses = counters.total_misses;
        if counters.total_duration_s.is_finite() && counters.total_duration_s >= 0. {
            summary.total_duration_s = counters.total_duration_s;
        } else {
            warn!(
                "Ignoring lifetime duration {}, not a usable number",
                counters.total_duration_s
            );
        }
        accumulator
    }

    fn degrade(&mut self, session_id: u64, field: &str, issue: ColumnIssue) {
        warn!("Session {}: skipping {} ({})", session_id, field, issue);
        self.summary.degraded_fields.push(DegradedField {
            session_id,
            field: field.to_string(),
            reason: issue.to_string(),
        });
    }

    /// Unwraps a column, recording it as degraded when unusable.
    fn column<T>(
        &mut self,
        session: &StoredSession,
        field: &str,
        value: Result<T, ColumnIssue>,
    ) -> Option<T> {
        value
            .map_err(|issue| {
                let issue = explain(session, field, issue);
                self.degrade(session.session_id, field, issue)
            })
            .ok()
    }

    /// Folds one stored session in. A session whose putt list is out of order
    /// is excluded as a whole.
    pub fn add_session(&mut self, session: &StoredSession) {
        let id = session.session_id;

        let putts = match stored::putt_list(session.putt_list.as_deref()) {
            Ok(putts) => {
                let out_of_order = putts
                    .iter()
                    .tuple_windows()
                    .position(|(previous, current)| !(current.timestamp >= previous.timestamp));
                if let Some(index) = out_of_order {
                    let reason = format!(
                        "putt {} at {} follows {}",
                        index + 1,
                        putts[index + 1].timestamp,
                        putts[index].timestamp
                    );
                    warn!("Session {} excluded: non-monotonic timestamps, {}", id, reason);
                    self.summary.excluded_sessions.push(ExcludedSession {
                        session_id: id,
                        reason,
                    });
                    return;
                }
                Some(putts)
            }
            Err(issue) => {
                self.degrade(id, "putt_list", explain(session, "putt_list", issue));
                None
            }
        };

        self.summary.sessions_counted += 1;

        let makes = self.column(session, "total_makes", stored::count(session.total_makes));
        let misses = self.column(session, "total_misses", stored::count(session.total_misses));
        let putts_total = match (session.total_putts, makes, misses) {
            (Some(total), _, _) => Ok(total),
            // older rows only carry makes and misses
            (None, Some(m), Some(x)) => m
                .checked_add(x)
                .ok_or(ColumnIssue::OutOfRange(m as f64 + x as f64)),
            _ => Err(ColumnIssue::Missing),
        };
        let putts_total = self.column(session, "total_putts", putts_total);

        let summary = &mut self.summary;
        if let Some(total) = putts_total {
            summary.total_putts = summary.total_putts.saturating_add(total as u64);
        }
        if let Some(makes) = makes {
            summary.total_makes = summary.total_makes.saturating_add(makes as u64);
            summary.high_makes = summary.high_makes.max(makes);
        }
        if let Some(misses) = misses {
            summary.total_misses = summary.total_misses.saturating_add(misses as u64);
        }
        if let (Some(makes), Some(misses)) = (makes, misses) {
            let attempts = makes as u64 + misses as u64;
            if attempts > 0 {
                let accuracy = makes as f64 / attempts as f64;
                summary.high_accuracy =
                    Some(summary.high_accuracy.map_or(accuracy, |a| a.max(accuracy)));
            }
        }

        if let Some(streak) =
            self.column(session, "best_streak", stored::count(session.best_streak))
        {
            self.summary.best_streak = self.summary.best_streak.max(streak);
        }
        if let Some(Some(fastest)) = self.column(
            session,
            "fastest_21_makes_s",
            stored::optional_measure(session.fastest_21_makes_s),
        ) {
            self.summary.fastest_21_makes_s = Some(
                self.summary
                    .fastest_21_makes_s
                    .map_or(fastest, |f| f.min(fastest)),
            );
        }
        if let Some(ppm) = self.column(
            session,
            "putts_per_minute",
            stored::measure(session.putts_per_minute),
        ) {
            self.summary.high_putts_per_minute = self.summary.high_putts_per_minute.max(ppm);
        }
        if let Some(mpm) = self.column(
            session,
            "makes_per_minute",
            stored::measure(session.makes_per_minute),
        ) {
            self.summary.high_makes_per_minute = self.summary.high_makes_per_minute.max(mpm);
        }
        if let Some(most) = self.column(
            session,
            "most_makes_in_60s",
            stored::count(session.most_makes_in_60s),
        ) {
            self.summary.high_most_makes_in_60s = self.summary.high_most_makes_in_60s.max(most);
        }
        if let Some(duration) = self.column(
            session,
            "session_duration_s",
            stored::measure(session.session_duration_s),
        ) {
            self.summary.total_duration_s += duration;
            self.summary.high_session_duration_s =
                self.summary.high_session_duration_s.max(duration);
        }

        if let Some(quadrants) = self.column(
            session,
            "makes_by_category",
            stored::category_counts(session.makes_by_category.as_deref()),
        ) {
            for (quadrant, count) in quadrants {
                let stats = self.summary.makes_by_category.entry(quadrant).or_default();
                stats.high = stats.high.max(count);
                stats.sum += count as u64;
            }
        }
        if let Some(categories) = self.column(
            session,
            "misses_by_category",
            stored::category_counts(session.misses_by_category.as_deref()),
        ) {
            for (category, count) in categories {
                self.summary
                    .misses_by_category
                    .entry(category)
                    .or_default()
                    .add(count);
            }
        }

        let streaks = match stored::streak_counts(session.consecutive_streaks.as_deref()) {
            Ok(streaks) => Some(streaks),
            Err(issue) => match &putts {
                Some(putts) => {
                    debug!("Session {}: streaks {}, rebuilt from putt list", id, issue);
                    Some(streak_bins(putts.iter().map(|p| p.outcome == Outcome::Make)))
                }
                None => {
                    let issue = explain(session, "consecutive_streaks", issue);
                    self.degrade(id, "consecutive_streaks", issue);
                    None
                }
            },
        };
        for (threshold, count) in streaks.into_iter().flatten() {
            *self.summary.consecutive_streaks.entry(threshold).or_default() += count as u64;
        }
    }

    /// Finalizes the averages. Every number in the result is finite.
    pub fn finish(self, player_id: u64) -> CareerSummary {
        let mut summary = self.summary;
        summary.player_id = player_id;
        let minutes = summary.total_duration_s / 60.;
        if minutes > 0. {
            summary.avg_putts_per_minute = summary.total_putts as f64 / minutes;
            summary.avg_makes_per_minute = summary.total_makes as f64 / minutes;
        }
        let attempts = summary.total_makes.saturating_add(summary.total_misses);
        summary.avg_accuracy =
            (attempts > 0).then(|| summary.total_makes as f64 / attempts as f64);
        info!(
            "Career for player {}: {} sessions, {} degraded fields, {} excluded",
            player_id,
            summary.sessions_counted,
            summary.degraded_fields.len(),
            summary.excluded_sessions.len()
        );
        summary
    }
}

/// Recomputes a player's lifetime statistics from all of their sessions.
pub fn aggregate_career(player_id: u64, sessions: &[StoredSession]) -> CareerSummary {
    aggregate_career_with(player_id, None, sessions)
}

/// Like [`aggregate_career`], on top of counters persisted outside the session
/// rows.
pub fn aggregate_career_with(
    player_id: u64,
    lifetime: Option<LifetimeCounters>,
    sessions: &[StoredSession],
) -> CareerSummary {
    let mut accumulator =
        lifetime.map_or_else(CareerAccumulator::new, CareerAccumulator::with_lifetime);
    for session in sessions {
        accumulator.add_session(session);
    }
    accumulator.finish(player_id)
}

/// A column the loader found mistyped reads as null, report the parse error
/// instead.
fn explain(session: &StoredSession, field: &str, issue: ColumnIssue) -> ColumnIssue {
    match (issue, session.unreadable.get(field)) {
        (ColumnIssue::Missing, Some(reason)) => ColumnIssue::Unparsable(reason.clone()),
        (issue, _) => issue,
    }
}
