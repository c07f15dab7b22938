use std::path::PathBuf;
use thiserror::Error;

use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum SubsignError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Failed to resolve secret '{field}': {source}")]
    Secret {
        field: &'static str,
        #[source]
        source: SecretError,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Failed to read object '{key}': {source}")]
    ReadObject {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write object '{key}': {source}")]
    WriteObject {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to sign URL for '{key}': {reason}")]
    Signing { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SubsignError>;
