use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};

use crate::config::ConversionConfig;
use crate::sanitize::truncate_body;

/// Magic bytes every PDF starts with.
const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, thiserror::Error)]
pub enum ConversionClientError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Conversion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Conversion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Conversion service returned {len} bytes that are not a PDF")]
    NotPdf { len: usize },

    #[error("Conversion rejected: {0}")]
    Rejected(String),
}

/// Turns a word-processing document into PDF bytes.
pub trait Converter: Send + Sync {
    /// `filename` keeps the original extension so the service can pick a
    /// matching import filter.
    fn convert(&self, bytes: &[u8], filename: &str) -> Result<Vec<u8>, ConversionClientError>;
}

/// Client for a Gotenberg-style conversion service
/// (`POST <base_url>/forms/libreoffice/convert`, multipart `files` field).
pub struct HttpConverter {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpConverter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConversionClientError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConversionClientError::Client)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &ConversionConfig) -> Result<Self, ConversionClientError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }
}

impl Converter for HttpConverter {
    fn convert(&self, bytes: &[u8], filename: &str) -> Result<Vec<u8>, ConversionClientError> {
        let url = format!("{}/forms/libreoffice/convert", self.base_url);
        let mime = mime_guess::from_path(filename).first_or_octet_stream();

        let part = Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime.essence_str())?;
        let form = Form::new().part("files", part);

        tracing::debug!(bytes = bytes.len(), mime = %mime, "Sending document to conversion service");

        let response = self.client.post(&url).multipart(form).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ConversionClientError::Status {
                status: status.as_u16(),
                body: truncate_body(&body, 200),
            });
        }

        let pdf = response.bytes()?.to_vec();
        if !pdf.starts_with(PDF_MAGIC) {
            return Err(ConversionClientError::NotPdf { len: pdf.len() });
        }

        Ok(pdf)
    }
}
