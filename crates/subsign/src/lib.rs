//! Signature orchestration for subscription packs.
//!
//! Takes a generated subscription document, converts it to PDF when needed,
//! works out every investor-side signatory and the platform countersigner,
//! issues one e-signature request per party and records the outcome.

pub mod broadcast;
pub mod config;
pub mod conversion;
pub mod db;
pub mod error;
pub mod esign;
pub mod logging;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod sanitize;
pub mod secrets;
pub mod signing;
pub mod storage;

pub use broadcast::{SigningProgressBroadcaster, SigningProgressEvent};
pub use config::{load_config, load_config_from_str, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, Result, StorageError, SubsignError};
pub use pipeline::{
    ErrorBody, ErrorKind, Pipeline, PipelineConfig, PipelineError, PipelineWarning,
    SigningOutcome, SigningRequest,
};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError, UrlSigner};
