use std::fmt;

#[derive(Debug, Clone)]
pub enum PdfError {
    InvalidPdf(String),
    PasswordRequired,
    BindingFailed(String),
    TextExtractionFailed(String),
    RenderingFailed(String),
    IOError(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::InvalidPdf(msg) => write!(f, "Invalid PDF: {}", msg),
            PdfError::PasswordRequired => write!(f, "PDF is password-protected"),
            PdfError::BindingFailed(msg) => write!(f, "Pdfium unavailable: {}", msg),
            PdfError::TextExtractionFailed(msg) => write!(f, "Text extraction failed: {}", msg),
            PdfError::RenderingFailed(msg) => write!(f, "Page rendering failed: {}", msg),
            PdfError::IOError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for PdfError {}

/// Classify a document load failure.
pub(crate) fn load_error(err: impl fmt::Display) -> PdfError {
    let msg = err.to_string();
    if msg.to_ascii_lowercase().contains("password") {
        PdfError::PasswordRequired
    } else {
        PdfError::InvalidPdf(msg)
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pdf_error() {
        let err = PdfError::InvalidPdf("corrupted header".to_string());
        assert_eq!(err.to_string(), "Invalid PDF: corrupted header");
    }

    #[test]
    fn test_rendering_failed_error() {
        let err = PdfError::RenderingFailed("out of memory".to_string());
        assert_eq!(err.to_string(), "Page rendering failed: out of memory");
    }

    #[test]
    fn test_load_error_detects_password() {
        assert!(matches!(load_error("PdfiumLibraryInternalError(PasswordError)"), PdfError::PasswordRequired));
        assert!(matches!(load_error("FormatError"), PdfError::InvalidPdf(_)));
    }

    #[test]
    fn test_converts_to_collaborator_error() {
        let err: crate::DocshiftError = PdfError::InvalidPdf("bad xref".to_string()).into();
        assert!(matches!(err, crate::DocshiftError::Collaborator { .. }));
        assert_eq!(err.to_string(), "Invalid PDF: bad xref");
    }
}
