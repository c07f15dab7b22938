//! The signature pipeline: takes a subscription document from "generated"
//! to "sent for signature" for every party that must sign it.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod guard;
pub mod progress;
pub mod runner;
pub mod state;

pub use config::PipelineConfig;
pub use context::{IssuedRequest, PipelineContext, SigningOutcome, SigningRequest};
pub use error::{ErrorBody, ErrorKind, PipelineError, PipelineWarning};
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;
