use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::Sender,
};

use log::{error, info, warn};

use crate::{PuttrackError, session::SessionLog};

use super::{SampleSource, SessionLogEntry, TrajectoryClassifier};

fn broadcast(
    sender: &Option<Sender<SessionLogEntry>>,
    entry: SessionLogEntry,
) -> Result<(), PuttrackError> {
    if let Some(sender) = sender {
        sender.send(entry).map_err(|e| {
            warn!("Could not send session log entry: {}", e);
            PuttrackError::from(e)
        })?;
    }
    Ok(())
}

/// Drives one classifier until the source runs dry or fails, `cancel` is set
/// or the session time limit is reached. An attempt still in flight at that
/// point is discarded. Attempts already scored are always kept.
pub fn run_session(
    mut source: impl SampleSource,
    classifier: &mut TrajectoryClassifier,
    time_limit_s: Option<f64>,
    cancel: &AtomicBool,
    log_sender: Option<Sender<SessionLogEntry>>,
) -> Result<SessionLog, PuttrackError> {
    let mut attempts = Vec::new();
    let mut announced = false;
    let mut limit_reached_at = None;

    while !cancel.load(Ordering::SeqCst) {
        let sample = match source.next_sample() {
            Ok(Some(sample)) => sample,
            Ok(None) => break,
            Err(e) => {
                error!("Sample source failed, ending session early: {}", e);
                break;
            }
        };
        if let (Some(start), Some(limit)) = (classifier.session_start(), time_limit_s) {
            if sample.timestamp - start >= limit {
                info!("Session time limit of {}s reached", limit);
                limit_reached_at = Some(start + limit);
                break;
            }
        }

        let attempt = classifier.process(&sample);
        if !announced {
            if let Some(started_at) = classifier.session_start() {
                broadcast(&log_sender, SessionLogEntry::SessionStart { started_at })?;
                announced = true;
            }
        }
        if let Some(attempt) = attempt {
            broadcast(&log_sender, SessionLogEntry::Attempt(Box::new(attempt.clone())))?;
            attempts.push(attempt);
        }
    }
    if cancel.load(Ordering::SeqCst) {
        info!("Session stopped by user");
    }
    classifier.discard_in_progress();

    let started_at = match classifier.session_start() {
        Some(start) => start,
        None => {
            warn!("Ball never entered the launch zone, session is empty");
            classifier.last_timestamp().unwrap_or_default()
        }
    };
    let ended_at = limit_reached_at
        .or(classifier.last_timestamp())
        .unwrap_or(started_at)
        .max(started_at);
    if !announced {
        broadcast(&log_sender, SessionLogEntry::SessionStart { started_at })?;
    }
    let log = SessionLog {
        started_at,
        ended_at,
        frames_processed: classifier.frames_processed(),
        frames_dropped: source.frames_dropped(),
        attempts,
    };
    broadcast(
        &log_sender,
        SessionLogEntry::SessionEnd {
            ended_at,
            frames_processed: log.frames_processed,
            frames_dropped: log.frames_dropped,
        },
    )?;
    info!(
        "Session finished: {} attempts over {:.1}s",
        log.attempts.len(),
        ended_at - started_at
    );
    Ok(log)
}
