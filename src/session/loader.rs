use std::path::Path;

use log::{info, warn};

use super::SessionLog;
use crate::{PuttrackError, tracking::SessionLogEntry};

/// Rebuilds a [`SessionLog`] from an attempt log written during tracking.
pub fn load_session_log(source_file: &Path) -> Result<SessionLog, PuttrackError> {
    let entries = serde_jsonlines::json_lines(source_file)
        .map_err(|e| PuttrackError::SessionLogLoaderError { source: e })?
        .collect::<Result<Vec<SessionLogEntry>, std::io::Error>>()
        .map_err(|e| PuttrackError::SessionLogLoaderError { source: e })?;
    session_log_from_entries(entries)
}

pub fn session_log_from_entries(
    entries: impl IntoIterator<Item = SessionLogEntry>,
) -> Result<SessionLog, PuttrackError> {
    let mut log = SessionLog::default();
    let mut started = false;
    let mut ended = false;
    for entry in entries {
        match entry {
            SessionLogEntry::SessionStart { started_at } => {
                if started {
                    return Err(PuttrackError::InvalidSessionLog {
                        reason: "more than one session start".to_string(),
                    });
                }
                started = true;
                log.started_at = started_at;
            }
            SessionLogEntry::Attempt(attempt) => {
                if !started || ended {
                    return Err(PuttrackError::InvalidSessionLog {
                        reason: format!("attempt at {} outside of a session", attempt.timestamp),
                    });
                }
                log.attempts.push(*attempt);
            }
            SessionLogEntry::SessionEnd {
                ended_at,
                frames_processed,
                frames_dropped,
            } => {
                ended = true;
                log.ended_at = ended_at;
                log.frames_processed = frames_processed;
                log.frames_dropped = frames_dropped;
            }
        }
    }
    if !started {
        return Err(PuttrackError::InvalidSessionLog {
            reason: "no session start".to_string(),
        });
    }
    if !ended {
        // interrupted before finalization, the last attempt is the best end we know
        log.ended_at = log
            .attempts
            .last()
            .map_or(log.started_at, |a| a.timestamp);
        warn!("Attempt log has no session end, using {}s", log.ended_at);
    }
    info!("Loaded session with {} attempts", log.attempts.len());
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{Attempt, Outcome, TransitionRecord};

    fn make(timestamp: f64) -> SessionLogEntry {
        SessionLogEntry::Attempt(Box::new(Attempt {
            timestamp,
            outcome: Outcome::Make,
            detailed_subtype: "MAKE - LEFT".to_string(),
            position: None,
            transitions: TransitionRecord::default(),
            flagged_for_review: false,
        }))
    }

    #[test]
    fn test_complete_log() {
        let log = session_log_from_entries([
            SessionLogEntry::SessionStart { started_at: 1. },
            make(2.),
            make(3.),
            SessionLogEntry::SessionEnd {
                ended_at: 10.,
                frames_processed: 100,
                frames_dropped: 2,
            },
        ])
        .unwrap();
        assert_eq!(log.started_at, 1.);
        assert_eq!(log.ended_at, 10.);
        assert_eq!(log.attempts.len(), 2);
        assert_eq!(log.frames_dropped, 2);
    }

    #[test]
    fn test_unterminated_log_ends_at_last_attempt() {
        let log = session_log_from_entries([
            SessionLogEntry::SessionStart { started_at: 1. },
            make(4.),
        ])
        .unwrap();
        assert_eq!(log.ended_at, 4.);
    }

    #[test]
    fn test_invalid_logs() {
        assert!(matches!(
            session_log_from_entries([make(1.)]),
            Err(PuttrackError::InvalidSessionLog { .. })
        ));
        assert!(matches!(
            session_log_from_entries([
                SessionLogEntry::SessionStart { started_at: 1. },
                SessionLogEntry::SessionStart { started_at: 2. },
            ]),
            Err(PuttrackError::InvalidSessionLog { .. })
        ));
        assert!(matches!(
            load_session_log(Path::new("/not/a/file.jsonl")),
            Err(PuttrackError::SessionLogLoaderError { .. })
        ));
    }
}
