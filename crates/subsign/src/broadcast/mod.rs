//! Broadcasting of real-time pipeline events.

pub mod signing_progress;

pub use signing_progress::{
    SigningPhase, SigningProgressBroadcaster, SigningProgressEvent, SigningProgressTracker,
    SigningStatus,
};
