//! Mapping library errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::DocshiftError;

use super::types::ErrorResponse;

/// Message returned when an upload is not a PDF.
pub const NOT_A_PDF_MESSAGE: &str = "Please upload a PDF file.";

/// Prefix for unexpected PDF engine failures.
pub const PDF_FAILURE_CONTEXT: &str = "Failed to convert PDF";

/// Marks a response produced from an [`ApiError`], so legacy mode can find it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ErrorMarker;

/// An error ready to be sent to the client as `{"error": message}`.
///
/// Only the short message is exposed; error sources are logged, never serialized.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 with the error's message.
    pub fn validation(err: DocshiftError) -> Self {
        let message = match err {
            DocshiftError::Validation { message, .. } => message,
            other => other.to_string(),
        };
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_a_pdf() -> Self {
        Self::new(StatusCode::BAD_REQUEST, NOT_A_PDF_MESSAGE)
    }

    pub fn internal(err: DocshiftError) -> Self {
        tracing::error!("Internal error: {}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }

    /// Map a failed conversion, prefixing engine failures with `context`.
    ///
    /// Domain errors ("No tables found in PDF.") are passed through verbatim.
    pub fn conversion_failed(context: &str, err: DocshiftError) -> Self {
        match err {
            DocshiftError::Validation { message, .. } => Self::new(StatusCode::BAD_REQUEST, message),
            DocshiftError::Conversion { message, .. } => Self::new(StatusCode::UNPROCESSABLE_ENTITY, message),
            DocshiftError::Overloaded(message) => {
                tracing::warn!("Rejecting conversion: {}", message);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Server is busy, please retry later.",
                )
            }
            DocshiftError::Collaborator { message, source } => {
                if let Some(source) = source {
                    tracing::warn!("{}: {} ({})", context, message, source);
                } else {
                    tracing::warn!("{}: {}", context, message);
                }
                Self::new(StatusCode::BAD_GATEWAY, format!("{}: {}", context, message))
            }
            DocshiftError::MissingDependency(message) => {
                tracing::error!("{}: {}", context, message);
                Self::new(StatusCode::BAD_GATEWAY, format!("{}: {}", context, message))
            }
            other => {
                tracing::error!("{}: {}", context, other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {}", context, other))
            }
        }
    }
}

impl From<DocshiftError> for ApiError {
    fn from(err: DocshiftError) -> Self {
        match err {
            DocshiftError::Validation { .. } => Self::validation(err),
            DocshiftError::UploadWrite { .. } | DocshiftError::Io(_) => Self::internal(err),
            other => Self::conversion_failed("Request failed", other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(ErrorResponse { error: self.message })).into_response();
        response.extensions_mut().insert(ErrorMarker);
        response
    }
}

/// Legacy clients only look for an `error` field and expect HTTP 200.
pub(crate) async fn legacy_error_status(mut response: Response) -> Response {
    if response.extensions().get::<ErrorMarker>().is_some() {
        *response.status_mut() = StatusCode::OK;
    }
    response
}
