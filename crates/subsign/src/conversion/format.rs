//! Decides whether a document can be signed as-is, must be converted first,
//! or cannot be handled at all.

pub const PDF_MIME: &str = "application/pdf";

const WORD_MIMES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Already a PDF.
    Signable,
    /// A word-processing document that converts to PDF.
    Convertible,
    Unsupported,
}

/// Strips parameters (`; charset=...`) and normalizes case.
fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

fn format_of(mime: &str) -> Option<DocumentFormat> {
    if mime == PDF_MIME {
        Some(DocumentFormat::Signable)
    } else if WORD_MIMES.contains(&mime) {
        Some(DocumentFormat::Convertible)
    } else {
        None
    }
}

/// Classifies by declared media type first, then by the media types
/// `mime_guess` associates with the key's extension.
pub fn classify(mime_type: Option<&str>, key: &str) -> DocumentFormat {
    if let Some(format) = mime_type.map(essence).and_then(|m| format_of(&m)) {
        return format;
    }

    mime_guess::from_path(key)
        .iter()
        .find_map(|guess| format_of(guess.essence_str()))
        .unwrap_or(DocumentFormat::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_by_mime_or_name() {
        assert_eq!(
            classify(Some("application/pdf"), "a/pack"),
            DocumentFormat::Signable
        );
        assert_eq!(
            classify(Some("Application/PDF; qs=1"), "a/pack.bin"),
            DocumentFormat::Signable
        );
        assert_eq!(classify(None, "a/pack.PDF"), DocumentFormat::Signable);
    }

    #[test]
    fn test_word_by_mime_or_name() {
        assert_eq!(
            classify(
                Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
                "a/pack"
            ),
            DocumentFormat::Convertible
        );
        assert_eq!(
            classify(Some("application/msword"), "a/pack"),
            DocumentFormat::Convertible
        );
        assert_eq!(classify(None, "a/pack.docx"), DocumentFormat::Convertible);
        assert_eq!(
            classify(Some("application/octet-stream"), "a/pack.doc"),
            DocumentFormat::Convertible
        );
    }

    #[test]
    fn test_declared_pdf_mime_wins_over_name() {
        assert_eq!(
            classify(Some("application/pdf"), "a/pack.docx"),
            DocumentFormat::Signable
        );
    }

    #[test]
    fn test_unrecognised_declared_type_falls_back_to_extension() {
        assert_eq!(
            classify(Some("text/plain"), "a/Pack.Docx"),
            DocumentFormat::Convertible
        );
        assert_eq!(classify(Some(""), "a/v2.final.pdf"), DocumentFormat::Signable);
        assert_eq!(classify(None, "a/pack.txt"), DocumentFormat::Unsupported);
    }

    #[test]
    fn test_everything_else_is_unsupported() {
        assert_eq!(classify(Some("image/png"), "a/scan.png"), DocumentFormat::Unsupported);
        assert_eq!(classify(None, "a/pack"), DocumentFormat::Unsupported);
        assert_eq!(classify(None, "a/.pdf"), DocumentFormat::Unsupported);
        assert_eq!(classify(None, "a.pdf/pack"), DocumentFormat::Unsupported);
        assert_eq!(
            classify(Some("application/vnd.ms-excel"), "a/sheet.xls"),
            DocumentFormat::Unsupported
        );
    }
}
