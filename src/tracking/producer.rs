use std::{
    io,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError},
    },
    time::Duration,
};

use log::{debug, warn};

use crate::PuttrackError;

use super::Sample;

const POLL_INTERVAL_MS: u64 = 100;

/// Where the session runner gets detector frames from.
pub trait SampleSource {
    /// Next frame to classify, `None` once the source is exhausted.
    fn next_sample(&mut self) -> Result<Option<Sample>, PuttrackError>;

    /// Frames the source skipped, either unreadable or because the consumer
    /// fell behind.
    fn frames_dropped(&self) -> usize {
        0
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_sample(&mut self) -> Result<Option<Sample>, PuttrackError> {
        (**self).next_sample()
    }

    fn frames_dropped(&self) -> usize {
        (**self).frames_dropped()
    }
}

/// Replays recorded detector output, one JSON `Sample` per line. Unreadable
/// lines are logged and skipped.
pub struct JsonlSampleSource {
    samples: Box<dyn Iterator<Item = io::Result<Sample>>>,
    line: usize,
    skipped: usize,
}

impl JsonlSampleSource {
    pub fn from_file(path: &Path) -> Result<Self, PuttrackError> {
        let samples = serde_jsonlines::json_lines(path)
            .map_err(|e| PuttrackError::SampleSourceError {
                reason: format!("could not open {:?}: {}", path, e),
            })?
            .map(|line: io::Result<Sample>| line);
        Ok(Self {
            samples: Box::new(samples),
            line: 0,
            skipped: 0,
        })
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self {
            samples: Box::new(samples.into_iter().map(Ok)),
            line: 0,
            skipped: 0,
        }
    }
}

impl SampleSource for JsonlSampleSource {
    fn next_sample(&mut self) -> Result<Option<Sample>, PuttrackError> {
        for next in self.samples.by_ref() {
            self.line += 1;
            match next {
                Ok(sample) => return Ok(Some(sample)),
                Err(e) => {
                    warn!("Skipping unreadable sample on line {}: {}", self.line, e);
                    self.skipped += 1;
                }
            }
        }
        Ok(None)
    }

    fn frames_dropped(&self) -> usize {
        self.skipped
    }
}

/// Detector side of a bounded live channel. Frames pushed while the queue is
/// full are dropped and counted.
#[derive(Clone)]
pub struct FrameSender {
    sender: SyncSender<Sample>,
    overflowed: Arc<AtomicUsize>,
}

impl FrameSender {
    /// Returns `false` once the receiving source is gone.
    pub fn push(&self, sample: Sample) -> bool {
        match self.sender.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.overflowed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Live frames pushed by a detector thread. Every read skips ahead to the
/// newest queued frame so the classifier never works through a backlog.
pub struct LatestSampleSource {
    receiver: Receiver<Sample>,
    cancel: Option<Arc<AtomicBool>>,
    dropped: usize,
    overflowed: Arc<AtomicUsize>,
}

impl LatestSampleSource {
    pub fn new(receiver: Receiver<Sample>) -> Self {
        Self {
            receiver,
            cancel: None,
            dropped: 0,
            overflowed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source fed through a queue of at most `capacity` frames.
    pub fn bounded(capacity: usize) -> (FrameSender, Self) {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        let source = Self::new(receiver);
        let frames = FrameSender {
            sender,
            overflowed: source.overflowed.clone(),
        };
        (frames, source)
    }

    /// Stop waiting for frames once `cancel` is set.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::SeqCst))
    }

    fn wait(&self) -> Option<Sample> {
        loop {
            if self.cancelled() {
                return None;
            }
            match self
                .receiver
                .recv_timeout(Duration::from_millis(POLL_INTERVAL_MS))
            {
                Ok(sample) => return Some(sample),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl SampleSource for LatestSampleSource {
    fn next_sample(&mut self) -> Result<Option<Sample>, PuttrackError> {
        let Some(mut sample) = self.wait() else {
            return Ok(None);
        };
        let mut skipped = 0;
        for newer in self.receiver.try_iter() {
            sample = newer;
            skipped += 1;
        }
        if skipped > 0 {
            debug!("Skipped {} stale frames", skipped);
            self.dropped += skipped;
        }
        Ok(Some(sample))
    }

    fn frames_dropped(&self) -> usize {
        self.dropped + self.overflowed.load(Ordering::Relaxed)
    }
}
