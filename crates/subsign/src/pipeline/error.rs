use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::conversion::ConversionError;
use crate::db::DatabaseError;
use crate::error::StorageError;
use crate::esign::SignatureServiceError;
use crate::model::{PositionSlot, SignerRole};

/// Machine-readable failure class reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    UnsupportedFormat,
    ConversionFailed,
    Configuration,
    Upstream,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::ConversionFailed => "conversion_failed",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Internal => "internal",
        }
    }

    /// HTTP-style status for the enclosing request handler.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::UnsupportedFormat => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::ConversionFailed
            | ErrorKind::Configuration
            | ErrorKind::Upstream
            | ErrorKind::Internal => 500,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("Document '{document_id}' has unsupported format (media type: {})",
        mime_type.as_deref().unwrap_or("none"))]
    UnsupportedFormat {
        document_id: String,
        mime_type: Option<String>,
    },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error(
        "Signature requests already exist for document '{document_id}' \
         ({} pending, {} signed{})",
        pending_ids.len(),
        signed_ids.len(),
        if *in_flight { ", issuance in progress" } else { "" }
    )]
    Conflict {
        document_id: String,
        pending_ids: Vec<String>,
        signed_ids: Vec<String>,
        /// A claim is held but no request has been recorded yet.
        in_flight: bool,
    },

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to create signature request for {party} ({role}, {slot}): {source}")]
    Upstream {
        party: String,
        role: SignerRole,
        slot: PositionSlot,
        /// Requests created before the failure. They are not rolled back.
        created_request_ids: Vec<String>,
        #[source]
        source: SignatureServiceError,
    },

    #[error("Failed to produce a document link for '{key}': {source}")]
    DocumentLink {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Serialisable error payload for callers.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        PipelineError::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        PipelineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation { .. } => ErrorKind::Validation,
            PipelineError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            PipelineError::NotFound { .. } => ErrorKind::NotFound,
            PipelineError::Conflict { .. } => ErrorKind::Conflict,
            PipelineError::Conversion(_) => ErrorKind::ConversionFailed,
            PipelineError::Configuration { .. } => ErrorKind::Configuration,
            PipelineError::Upstream { .. } | PipelineError::DocumentLink { .. } => {
                ErrorKind::Upstream
            }
            PipelineError::Database(_) => ErrorKind::Internal,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }

    fn details(&self) -> serde_json::Value {
        match self {
            PipelineError::UnsupportedFormat {
                document_id,
                mime_type,
            } => json!({ "document_id": document_id, "mime_type": mime_type }),
            PipelineError::NotFound { entity, id } => json!({ "entity": entity, "id": id }),
            PipelineError::Conflict {
                document_id,
                pending_ids,
                signed_ids,
                in_flight,
            } => json!({
                "document_id": document_id,
                "pending": pending_ids.len(),
                "signed": signed_ids.len(),
                "pending_ids": pending_ids,
                "signed_ids": signed_ids,
                "in_flight": in_flight,
            }),
            PipelineError::Upstream {
                party,
                role,
                slot,
                created_request_ids,
                ..
            } => json!({
                "party": party,
                "role": role,
                "slot": slot,
                "created_request_ids": created_request_ids,
            }),
            _ => serde_json::Value::Null,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let kind = self.kind();
        ErrorBody {
            kind,
            status: kind.http_status(),
            message: self.to_string(),
            details: self.details(),
        }
    }
}

/// Non-fatal conditions recorded while the pipeline still succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// An entity investor had no active authorized signatory; the investor's
    /// own contact signs instead.
    EntityWithoutSignatories { investor_id: String },
    /// No canonical approver is configured; the invoking operator countersigns.
    OperatorFallbackCountersigner { profile_id: String },
    TimestampUpdateFailed { field: String, error: String },
    NotificationFailed { user_id: String, error: String },
    NotificationLookupFailed { error: String },
}
