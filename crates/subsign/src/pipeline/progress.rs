use crate::broadcast::{SigningPhase, SigningProgressBroadcaster, SigningProgressTracker};

use super::error::ErrorKind;

/// Events emitted by the pipeline while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Phase {
        phase: SigningPhase,
        message: String,
    },
    Completed {
        signable_document_id: String,
        request_ids: Vec<String>,
    },
    Failed {
        kind: ErrorKind,
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for callers that do not stream progress.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges pipeline events to a broadcast channel.
pub struct BroadcastProgress {
    tracker: SigningProgressTracker,
}

impl BroadcastProgress {
    pub fn new(broadcaster: &SigningProgressBroadcaster, run_id: &str, document_id: &str) -> Self {
        Self {
            tracker: broadcaster.start_run(run_id, document_id),
        }
    }

    pub fn run_id(&self) -> &str {
        self.tracker.run_id()
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, message } => {
                self.tracker.update_phase(phase, &message);
            }
            ProgressEvent::Completed {
                signable_document_id,
                request_ids,
            } => {
                self.tracker.completed(&signable_document_id, &request_ids);
            }
            ProgressEvent::Failed { kind, error } => {
                self.tracker.failed(kind.as_str(), &error);
            }
        }
    }
}
