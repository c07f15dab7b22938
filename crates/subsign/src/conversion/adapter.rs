//! Converts a word-processing document into a new PDF document version.

use crate::db::document_repo::{self, DocumentRow};
use crate::db::{Database, DatabaseError};
use crate::error::StorageError;
use crate::model::DocumentStatus;
use crate::sanitize::redact_key;
use crate::storage::ObjectStore;

use super::client::{ConversionClientError, Converter};
use super::format::PDF_MIME;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Failed to download '{key}': {source}")]
    Download {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Conversion service failed for '{filename}': {source}")]
    Service {
        filename: String,
        #[source]
        source: ConversionClientError,
    },

    #[error("Failed to upload converted document to '{key}': {source}")]
    Upload {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to record converted document: {0}")]
    Record(#[source] DatabaseError),

    #[error("Document '{0}' was converted by another invocation")]
    AlreadyConverted(String),
}

/// Key for the PDF produced from `key`: the same directory with a
/// `converted/` segment and a `.pdf` extension.
///
/// `subs/1/pack.docx` → `subs/1/converted/pack.pdf`
pub fn converted_key(key: &str) -> String {
    let (dir, file_name) = match key.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, key),
    };
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    match dir {
        Some(dir) => format!("{}/converted/{}.pdf", dir, stem),
        None => format!("converted/{}.pdf", stem),
    }
}

fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

pub struct ConversionAdapter<'a> {
    store: &'a dyn ObjectStore,
    converter: &'a dyn Converter,
}

impl<'a> ConversionAdapter<'a> {
    pub fn new(store: &'a dyn ObjectStore, converter: &'a dyn Converter) -> Self {
        Self { store, converter }
    }

    /// Downloads `source`, converts it, uploads the PDF and records it as the
    /// next version of `source`. Returns the new document.
    ///
    /// The source is reserved before anything is uploaded, so a concurrent
    /// invocation gets [`ConversionError::AlreadyConverted`] instead of
    /// overwriting the derived PDF. The reservation is dropped again if the
    /// conversion fails. Nothing is written to `documents` unless the upload
    /// succeeded.
    pub fn convert(
        &self,
        db: &Database,
        source: &DocumentRow,
        created_by: Option<&str>,
    ) -> Result<DocumentRow, ConversionError> {
        let now = crate::db::now();
        let claimed = document_repo::claim_conversion(db, &source.id, created_by, now)
            .map_err(ConversionError::Record)?;
        if !claimed {
            return Err(ConversionError::AlreadyConverted(source.id.clone()));
        }

        let result = self.convert_claimed(db, source, created_by);
        if result.is_err() {
            if let Err(e) = document_repo::release_conversion(db, &source.id) {
                tracing::warn!(
                    source_id = %source.id,
                    error = %e,
                    "Failed to release conversion claim"
                );
            }
        }
        result
    }

    fn convert_claimed(
        &self,
        db: &Database,
        source: &DocumentRow,
        created_by: Option<&str>,
    ) -> Result<DocumentRow, ConversionError> {
        let filename = file_name(&source.file_key).to_string();

        let bytes = self
            .store
            .download(&source.file_key)
            .map_err(|e| ConversionError::Download {
                key: source.file_key.clone(),
                source: e,
            })?;

        let pdf = self
            .converter
            .convert(&bytes, &filename)
            .map_err(|e| ConversionError::Service {
                filename: filename.clone(),
                source: e,
            })?;

        let target_key = converted_key(&source.file_key);
        self.store
            .upload(&target_key, &pdf, PDF_MIME)
            .map_err(|e| ConversionError::Upload {
                key: target_key.clone(),
                source: e,
            })?;

        let now = crate::db::now();
        let derived = DocumentRow {
            id: uuid::Uuid::new_v4().to_string(),
            subscription_id: source.subscription_id.clone(),
            deal_id: source.deal_id.clone(),
            vehicle_id: source.vehicle_id.clone(),
            folder_id: source.folder_id.clone(),
            name: file_name(&target_key).to_string(),
            file_key: target_key,
            mime_type: Some(PDF_MIME.to_string()),
            status: DocumentStatus::Converted,
            ready_for_signature: false,
            previous_version_id: Some(source.id.clone()),
            superseded_by_id: None,
            converted_at: None,
            created_by: created_by.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        document_repo::supersede(db, &source.id, &derived, now).map_err(|e| match e {
            DatabaseError::Conflict(_) => ConversionError::AlreadyConverted(source.id.clone()),
            other => ConversionError::Record(other),
        })?;

        tracing::info!(
            source_id = %source.id,
            derived_id = %derived.id,
            key = %redact_key(&derived.file_key),
            "Converted document to PDF"
        );

        Ok(derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converted_key() {
        assert_eq!(
            converted_key("subs/sub-1/pack.docx"),
            "subs/sub-1/converted/pack.pdf"
        );
        assert_eq!(converted_key("pack.doc"), "converted/pack.pdf");
        assert_eq!(converted_key("a/b/v1.final.docx"), "a/b/converted/v1.final.pdf");
        assert_eq!(converted_key("a/README"), "a/converted/README.pdf");
    }
}
