// Session rows as the persistence layer hands them back

use std::{collections::BTreeMap, io, path::Path};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{PuttrackError, session::SessionSummary, tracking::AttemptRecord};

/// A persisted session. Every column is nullable and the category maps and
/// putt list are stored as JSON text, so any of them may be missing or broken.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoredSession {
    pub session_id: u64,
    pub total_putts: Option<u32>,
    pub total_makes: Option<u32>,
    pub total_misses: Option<u32>,
    pub best_streak: Option<u32>,
    pub fastest_21_makes_s: Option<f64>,
    pub putts_per_minute: Option<f64>,
    pub makes_per_minute: Option<f64>,
    pub most_makes_in_60s: Option<u32>,
    pub session_duration_s: Option<f64>,
    pub makes_by_category: Option<String>,
    pub misses_by_category: Option<String>,
    pub consecutive_streaks: Option<String>,
    pub putt_list: Option<String>,
    /// Columns present in the row but of the wrong type, with the parse error.
    /// They load as null.
    #[serde(skip)]
    pub unreadable: BTreeMap<String, String>,
}

impl StoredSession {
    pub fn from_summary(session_id: u64, summary: &SessionSummary) -> Result<Self, PuttrackError> {
        Ok(Self {
            session_id,
            total_putts: Some(summary.total_putts),
            total_makes: Some(summary.total_makes),
            total_misses: Some(summary.total_misses),
            best_streak: Some(summary.best_streak),
            fastest_21_makes_s: summary.fastest_21_makes_s,
            putts_per_minute: Some(summary.putts_per_minute),
            makes_per_minute: Some(summary.makes_per_minute),
            most_makes_in_60s: Some(summary.most_makes_in_60s),
            session_duration_s: Some(summary.session_duration_s),
            makes_by_category: Some(to_json(&summary.makes_by_category)?),
            misses_by_category: Some(to_json(&summary.misses_by_category)?),
            consecutive_streaks: Some(to_json(&summary.consecutive_streaks)?),
            putt_list: Some(to_json(&summary.putt_list)?),
            unreadable: BTreeMap::new(),
        })
    }

    /// Builds a session from one raw row, checking each column on its own.
    /// A mistyped column is nulled and noted in `unreadable`. Only a row that
    /// is not an object, or whose `session_id` is unusable, is rejected.
    pub fn from_row(row: Value) -> Result<Self, PuttrackError> {
        let Value::Object(columns) = row else {
            return Err(PuttrackError::InvalidStoredSession {
                reason: "row is not a JSON object".to_string(),
            });
        };
        let mut readable = Map::new();
        let mut unreadable = BTreeMap::new();
        for (name, value) in columns {
            let single = Map::from_iter([(name.clone(), value.clone())]);
            match serde_json::from_value::<StoredSession>(Value::Object(single)) {
                Ok(_) => {
                    readable.insert(name, value);
                }
                Err(e) => {
                    unreadable.insert(name, e.to_string());
                }
            }
        }
        if let Some(reason) = unreadable.get("session_id") {
            return Err(PuttrackError::InvalidStoredSession {
                reason: format!("session_id {}", reason),
            });
        }
        let mut session: StoredSession = serde_json::from_value(Value::Object(readable))
            .map_err(|e| PuttrackError::InvalidStoredSession {
                reason: e.to_string(),
            })?;
        session.unreadable = unreadable;
        Ok(session)
    }
}

/// Reads stored sessions exported as JSON lines, one row per line. Rows that
/// cannot be read at all are logged and skipped.
pub fn load_stored_sessions(source_file: &Path) -> Result<Vec<StoredSession>, PuttrackError> {
    let rows = serde_jsonlines::json_lines(source_file)
        .map_err(|e| PuttrackError::StoredSessionLoaderError { source: e })?
        .map(|row: io::Result<Value>| row);
    let mut sessions = Vec::new();
    for (index, row) in rows.enumerate() {
        let session = row
            .map_err(|e| PuttrackError::StoredSessionLoaderError { source: e })
            .and_then(StoredSession::from_row);
        match session {
            Ok(session) => {
                for (column, reason) in &session.unreadable {
                    warn!(
                        "Session {}: column {} unreadable ({})",
                        session.session_id, column, reason
                    );
                }
                sessions.push(session);
            }
            Err(e) => warn!("Skipping stored session on line {}: {}", index + 1, e),
        }
    }
    info!("Loaded {} stored sessions from {:?}", sessions.len(), source_file);
    Ok(sessions)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, PuttrackError> {
    serde_json::to_string(value).map_err(|e| PuttrackError::SessionSerializeError { source: e })
}

/// Why a single column of a stored session could not be used.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ColumnIssue {
    Missing,
    Unparsable(String),
    OutOfRange(f64),
}

impl std::fmt::Display for ColumnIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnIssue::Missing => write!(f, "missing"),
            ColumnIssue::Unparsable(e) => write!(f, "unparsable: {}", e),
            ColumnIssue::OutOfRange(v) => write!(f, "out of range: {}", v),
        }
    }
}

pub(crate) fn count(column: Option<u32>) -> Result<u32, ColumnIssue> {
    column.ok_or(ColumnIssue::Missing)
}

/// A non-negative finite measurement.
pub(crate) fn measure(column: Option<f64>) -> Result<f64, ColumnIssue> {
    match column {
        None => Err(ColumnIssue::Missing),
        Some(v) if v.is_finite() && v >= 0. => Ok(v),
        Some(v) => Err(ColumnIssue::OutOfRange(v)),
    }
}

/// Like [`measure`] but a null column is a legitimate "never happened".
pub(crate) fn optional_measure(column: Option<f64>) -> Result<Option<f64>, ColumnIssue> {
    column.map(|v| measure(Some(v))).transpose()
}

pub(crate) fn category_counts(column: Option<&str>) -> Result<BTreeMap<String, u32>, ColumnIssue> {
    parse(column)
}

pub(crate) fn streak_counts(column: Option<&str>) -> Result<BTreeMap<u32, u32>, ColumnIssue> {
    parse(column)
}

pub(crate) fn putt_list(column: Option<&str>) -> Result<Vec<AttemptRecord>, ColumnIssue> {
    parse(column)
}

fn parse<T: serde::de::DeserializeOwned>(column: Option<&str>) -> Result<T, ColumnIssue> {
    let text = column.ok_or(ColumnIssue::Missing)?;
    serde_json::from_str(text).map_err(|e| ColumnIssue::Unparsable(e.to_string()))
}
