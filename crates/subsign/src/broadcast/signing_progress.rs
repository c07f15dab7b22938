//! Signing-run progress broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Phase of a signature pipeline run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SigningPhase {
    Started,
    Loading,
    Classifying,
    ResolvingSignatories,
    ResolvingCountersigner,
    Converting,
    Claiming,
    CreatingRequests,
    UpdatingState,
    Notifying,
    Completed,
    Failed,
}

impl std::fmt::Display for SigningPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningPhase::Started => write!(f, "Started"),
            SigningPhase::Loading => write!(f, "Loading records"),
            SigningPhase::Classifying => write!(f, "Classifying document"),
            SigningPhase::ResolvingSignatories => write!(f, "Resolving signatories"),
            SigningPhase::ResolvingCountersigner => write!(f, "Resolving countersigner"),
            SigningPhase::Converting => write!(f, "Converting to PDF"),
            SigningPhase::Claiming => write!(f, "Claiming document"),
            SigningPhase::CreatingRequests => write!(f, "Creating signature requests"),
            SigningPhase::UpdatingState => write!(f, "Updating state"),
            SigningPhase::Notifying => write!(f, "Notifying"),
            SigningPhase::Completed => write!(f, "Completed"),
            SigningPhase::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SigningStatus {
    Running,
    Completed,
    Failed,
}

/// Progress event for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningProgressEvent {
    pub run_id: String,
    /// Document the run was invoked for.
    pub document_id: String,
    pub phase: SigningPhase,
    pub status: SigningStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Signable document actually used (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signable_document_id: Option<String>,
    /// Created request ids (set on completion).
    #[serde(default)]
    pub request_ids: Vec<String>,
    /// Machine-readable error kind (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SigningProgressEvent {
    pub fn new(run_id: &str, document_id: &str, phase: SigningPhase, message: &str) -> Self {
        let status = match phase {
            SigningPhase::Completed => SigningStatus::Completed,
            SigningPhase::Failed => SigningStatus::Failed,
            _ => SigningStatus::Running,
        };

        Self {
            run_id: run_id.to_string(),
            document_id: document_id.to_string(),
            phase,
            status,
            message: message.to_string(),
            timestamp: Utc::now(),
            signable_document_id: None,
            request_ids: vec![],
            error_kind: None,
            error: None,
        }
    }

    pub fn completed(
        run_id: &str,
        document_id: &str,
        signable_document_id: &str,
        request_ids: &[String],
    ) -> Self {
        let mut event = Self::new(
            run_id,
            document_id,
            SigningPhase::Completed,
            "Signature requests sent",
        );
        event.signable_document_id = Some(signable_document_id.to_string());
        event.request_ids = request_ids.to_vec();
        event
    }

    pub fn failed(run_id: &str, document_id: &str, error_kind: &str, error: &str) -> Self {
        let mut event = Self::new(run_id, document_id, SigningPhase::Failed, "Signing failed");
        event.error_kind = Some(error_kind.to_string());
        event.error = Some(error.to_string());
        event
    }
}

/// Broadcasts signing progress events to any number of subscribers.
#[derive(Clone)]
pub struct SigningProgressBroadcaster {
    sender: Arc<broadcast::Sender<SigningProgressEvent>>,
}

impl SigningProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SigningProgressEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker for one run and announces it.
    pub fn start_run(&self, run_id: &str, document_id: &str) -> SigningProgressTracker {
        let tracker = SigningProgressTracker {
            run_id: run_id.to_string(),
            document_id: document_id.to_string(),
            sender: Arc::clone(&self.sender),
        };
        tracker.update_phase(SigningPhase::Started, "Signature pipeline started");
        tracker
    }
}

impl Default for SigningProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Tracks progress for a single run.
pub struct SigningProgressTracker {
    run_id: String,
    document_id: String,
    sender: Arc<broadcast::Sender<SigningProgressEvent>>,
}

impl SigningProgressTracker {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    // Send errors only mean nobody is listening.
    pub fn update_phase(&self, phase: SigningPhase, message: &str) {
        let event = SigningProgressEvent::new(&self.run_id, &self.document_id, phase, message);
        let _ = self.sender.send(event);
    }

    pub fn completed(&self, signable_document_id: &str, request_ids: &[String]) {
        let event = SigningProgressEvent::completed(
            &self.run_id,
            &self.document_id,
            signable_document_id,
            request_ids,
        );
        let _ = self.sender.send(event);
    }

    pub fn failed(&self, error_kind: &str, error: &str) {
        let event = SigningProgressEvent::failed(&self.run_id, &self.document_id, error_kind, error);
        let _ = self.sender.send(event);
    }
}
