//! In-process stand-ins for the external services the pipeline calls.
//!
//! Each fake records what it was asked to do and can be told to fail, so
//! tests can assert both on call order and on partial-failure behaviour.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;

use subsign::conversion::{ConversionClientError, Converter};
use subsign::esign::{
    CreatedSignatureRequest, SignatureRequestSpec, SignatureService, SignatureServiceError,
};
use subsign::notify::{Notification, Notifier, NotifyError};
use subsign::pipeline::{ProgressEvent, ProgressReporter};

/// Minimal bytes that pass the converter's PDF check.
pub const FAKE_PDF: &[u8] = b"%PDF-1.7\n% fake converted document\n%%EOF\n";

/// Converter returning `FAKE_PDF`, or an error when told to fail.
#[derive(Default)]
pub struct FakeConverter {
    calls: Mutex<Vec<String>>,
    fail_with: Mutex<Option<String>>,
}

impl FakeConverter {
    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn succeed(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    /// Filenames passed to `convert`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Converter for FakeConverter {
    fn convert(&self, _bytes: &[u8], filename: &str) -> Result<Vec<u8>, ConversionClientError> {
        self.calls.lock().unwrap().push(filename.to_string());
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(ConversionClientError::Rejected(message));
        }
        Ok(FAKE_PDF.to_vec())
    }
}

/// Longest a gated conversion waits for the test before giving up.
const GATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Converter whose first call parks until the test opens the gate. Every
/// call returns a PDF naming its call index (`%PDF-1.7 render #N`).
pub struct GatedConverter {
    calls: AtomicUsize,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

/// Test side of a [`GatedConverter`].
pub struct ConversionGate {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl GatedConverter {
    pub fn new() -> (Self, ConversionGate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let converter = Self {
            calls: AtomicUsize::new(0),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let gate = ConversionGate {
            entered: entered_rx,
            release: release_tx,
        };
        (converter, gate)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn render(index: usize) -> Vec<u8> {
        format!("%PDF-1.7 render #{}", index).into_bytes()
    }
}

impl ConversionGate {
    /// Blocks until the first conversion has started.
    pub fn wait_for_conversion(&self) {
        self.entered
            .recv_timeout(GATE_TIMEOUT)
            .expect("conversion never started");
    }

    /// Lets the parked conversion finish.
    pub fn open(&self) {
        let _ = self.release.send(());
    }
}

impl Converter for GatedConverter {
    fn convert(&self, _bytes: &[u8], _filename: &str) -> Result<Vec<u8>, ConversionClientError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if index == 0 {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv_timeout(GATE_TIMEOUT);
        }
        Ok(Self::render(index))
    }
}

/// E-signature service that hands out sequential ids and can reject the
/// n-th call (1-based).
#[derive(Default)]
pub struct FakeSignatureService {
    requests: Mutex<Vec<SignatureRequestSpec>>,
    counter: AtomicUsize,
    fail_on_call: Mutex<Option<usize>>,
}

impl FakeSignatureService {
    pub fn fail_on_call(&self, n: usize) {
        *self.fail_on_call.lock().unwrap() = Some(n);
    }

    /// Every request the service was called with, including rejected ones.
    pub fn requests(&self) -> Vec<SignatureRequestSpec> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl SignatureService for FakeSignatureService {
    fn create_request(
        &self,
        spec: &SignatureRequestSpec,
    ) -> Result<CreatedSignatureRequest, SignatureServiceError> {
        self.requests.lock().unwrap().push(spec.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail_on_call.lock().unwrap() == Some(n) {
            return Err(SignatureServiceError::Rejected(format!(
                "recipient {} rejected",
                spec.signer_email
            )));
        }
        Ok(CreatedSignatureRequest {
            request_id: format!("ext-{}", n),
            token: format!("tok-{}", n),
        })
    }
}

/// Notifier that keeps notifications in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn enqueue(&self, notification: &Notification) -> Result<(), NotifyError> {
        if *self.fail.lock().unwrap() {
            return Err(NotifyError::Rejected("channel unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Progress reporter that keeps every event.
#[derive(Default)]
pub struct CollectingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for CollectingProgress {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
