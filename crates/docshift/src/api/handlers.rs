//! API request handlers.

use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartRejection},
    response::Response,
};

use crate::convert::{VideoSource, convert_tables_to_xlsx, render_pages_to_zip};
use crate::storage::Category;

use super::{
    error::ApiError,
    pipeline::{ConversionPlan, accept_pdf, convert_upload, fetch_video},
    types::{ApiState, DownloadQuery, HealthResponse, InfoResponse},
};

/// Conversion endpoints, as listed by `GET /info`.
pub const ENDPOINTS: &[&str] = &[
    "GET /youtube/download",
    "GET /tiktok/download",
    "POST /pdf/to-excel",
    "POST /pdf/to-word",
    "POST /pdf/to-image",
];

/// YouTube download handler.
///
/// GET /youtube/download?url=...
///
/// Streams the merged MP4. The download directory is kept for the video
/// retention period, then removed.
pub async fn youtube_handler(
    State(state): State<ApiState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    fetch_video(&state, VideoSource::YouTube, query).await
}

/// TikTok download handler.
///
/// GET /tiktok/download?url=...
pub async fn tiktok_handler(
    State(state): State<ApiState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    fetch_video(&state, VideoSource::TikTok, query).await
}

/// PDF to spreadsheet handler.
///
/// POST /pdf/to-excel
///
/// Accepts multipart form data with a `file` field. Each table found becomes
/// one sheet, its first row used as the header. A PDF without tables is
/// rejected with "No tables found in PDF.".
pub async fn pdf_to_excel_handler(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let upload = accept_pdf(&state, multipart).await?;
    let plan = ConversionPlan {
        category: Category::Spreadsheet,
        extension: "xlsx",
        needs_working_dir: false,
    };

    convert_upload(&state, upload, plan, |job| {
        let sheets = convert_tables_to_xlsx(job.collaborators.tables.as_ref(), &job.input, &job.output)?;
        tracing::debug!("Wrote {} sheet(s) to {}", sheets, job.output.display());
        Ok(())
    })
    .await
}

/// PDF to Word handler.
///
/// POST /pdf/to-word
pub async fn pdf_to_word_handler(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let upload = accept_pdf(&state, multipart).await?;
    let plan = ConversionPlan {
        category: Category::Document,
        extension: "docx",
        needs_working_dir: false,
    };

    convert_upload(&state, upload, plan, |job| {
        job.collaborators.documents.convert_to_docx(&job.input, &job.output)
    })
    .await
}

/// PDF to page images handler.
///
/// POST /pdf/to-image
///
/// Renders every page to `<name>_page_<n>.png` in a scratch directory and
/// returns them as a single ZIP. The scratch directory is removed before the
/// response is sent.
pub async fn pdf_to_image_handler(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let upload = accept_pdf(&state, multipart).await?;
    let plan = ConversionPlan {
        category: Category::ImageArchive,
        extension: "zip",
        needs_working_dir: true,
    };

    convert_upload(&state, upload, plan, |job| {
        let session = job
            .working_dir
            .as_deref()
            .ok_or_else(|| crate::DocshiftError::Other("Page rendering requires a working directory".to_string()))?;
        let pages = render_pages_to_zip(
            job.collaborators.pages.as_ref(),
            &job.input,
            session,
            &job.output,
            &job.stem,
        )?;
        tracing::debug!("Archived {} page(s) into {}", pages, job.output.display());
        Ok(())
    })
    .await
}

/// Health check endpoint handler.
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Server info endpoint handler.
///
/// GET /info
pub async fn info_handler() -> Json<InfoResponse> {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}
