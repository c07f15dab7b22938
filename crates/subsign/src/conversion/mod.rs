//! Document format routing and conversion to PDF.

pub mod adapter;
pub mod client;
pub mod format;

pub use adapter::{converted_key, ConversionAdapter, ConversionError};
pub use client::{ConversionClientError, Converter, HttpConverter};
pub use format::{classify, DocumentFormat};
