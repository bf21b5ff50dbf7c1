//! Error types for docshift.
//!
//! Every fallible operation in the library returns [`DocshiftError`]. The
//! variants line up with the failure classes a request can hit:
//!
//! - `Validation` - malformed or missing input, detected before any artifact exists
//! - `Conversion` - the collaborator ran but the input is semantically unconvertible
//!   ("No tables found in PDF.", "No pages found in PDF.")
//! - `Collaborator` - unexpected failure inside an external engine (yt-dlp, LibreOffice, pdfium)
//! - `UploadWrite` - the upload could not be persisted to disk
//! - `Scheduling` / `Overloaded` - a background deletion or worker slot could not be obtained
//!
//! Cleanup failures are absent. They use
//! [`CleanupError`](crate::storage::CleanupError), which has no conversion into
//! this type, so a failed removal can never become the result of a request.
//!
//! # Example
//!
//! ```rust
//! use docshift::{DocshiftError, Result};
//!
//! fn require_pdf(name: &str) -> Result<()> {
//!     if !name.to_ascii_lowercase().ends_with(".pdf") {
//!         return Err(DocshiftError::validation("Please upload a PDF file."));
//!     }
//!     Ok(())
//! }
//! # assert!(require_pdf("a.pdf").is_ok());
//! ```
use thiserror::Error;

/// Result type alias using `DocshiftError`.
pub type Result<T> = std::result::Result<T, DocshiftError>;

/// Main error type for all docshift operations.
#[derive(Debug, Error)]
pub enum DocshiftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{message}")]
    Conversion {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{message}")]
    Collaborator {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Upload write error: {message}")]
    UploadWrite {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Scheduling error: {0}")]
    Scheduling(String),

    #[error("Server busy: {0}")]
    Overloaded(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("{0}")]
    Other(String),
}

impl From<zip::result::ZipError> for DocshiftError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io_err) => DocshiftError::Io(io_err),
            other => DocshiftError::Other(format!("Archive error: {}", other)),
        }
    }
}

impl From<toml::de::Error> for DocshiftError {
    fn from(err: toml::de::Error) -> Self {
        DocshiftError::Validation {
            message: format!("Invalid TOML: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "pdf")]
impl From<crate::pdf::error::PdfError> for DocshiftError {
    fn from(err: crate::pdf::error::PdfError) -> Self {
        match err {
            crate::pdf::error::PdfError::BindingFailed(_) => DocshiftError::MissingDependency(err.to_string()),
            other => DocshiftError::Collaborator {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl DocshiftError {
    error_constructor!(validation, Validation);
    error_constructor!(conversion, Conversion);
    error_constructor!(collaborator, Collaborator);
    error_constructor!(upload_write, UploadWrite);

    /// Whether the failure is user-correctable (bad input or unconvertible document).
    pub fn is_user_facing(&self) -> bool {
        matches!(self, DocshiftError::Validation { .. } | DocshiftError::Conversion { .. })
    }
}
