//! The request lifecycle shared by every conversion endpoint.
//!
//! validate -> persist upload -> convert on a worker -> schedule cleanup -> stream.
//!
//! Once the input is on disk, the rest of the lifecycle runs in a detached
//! task. A client that disconnects mid-conversion drops only the handler; the
//! task still removes partial outputs and schedules deletion of everything it
//! created.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Multipart, multipart::MultipartRejection},
    http::header,
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::convert::{Collaborators, VideoSource, download_video};
use crate::storage::{Artifact, BestEffort, Category, remove_path, remove_path_async, safe_stem, sanitize, with_appended_extension};
use crate::{DocshiftError, Result};

use super::error::{ApiError, PDF_FAILURE_CONTEXT};
use super::types::{ApiState, DownloadQuery};

/// Multipart field carrying the uploaded document.
pub const UPLOAD_FIELD: &str = "file";

/// A persisted upload and the stem its derived artifacts are named after.
#[derive(Debug)]
pub(crate) struct Upload {
    pub artifact: Artifact,
    pub stem: String,
}

/// Removes a path on drop unless disarmed.
struct RemoveOnDrop {
    path: Option<PathBuf>,
}

impl RemoveOnDrop {
    fn new(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            remove_path(&path).best_effort();
        }
    }
}

/// Validate the multipart body and stream its PDF into the upload root.
///
/// Nothing is written unless the file name ends in `.pdf`.
pub(crate) async fn accept_pdf(
    state: &ApiState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Upload, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected multipart body: {}", e);
        ApiError::not_a_pdf()
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(DocshiftError::validation(e.body_text())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !filename.to_ascii_lowercase().ends_with(".pdf") {
            return Err(ApiError::not_a_pdf());
        }

        let artifact = state.uploads.allocate_upload(&filename);
        let mut guard = RemoveOnDrop::new(artifact.path());

        let mut reader = StreamReader::new(Box::pin(field.map_err(|e| io::Error::other(e.body_text()))));
        let written = state
            .uploads
            .persist_into(&mut reader, &artifact)
            .await
            .map_err(ApiError::internal)?;

        guard.disarm();
        tracing::info!("Received upload '{}' ({} bytes)", filename, written);
        return Ok(Upload {
            artifact,
            stem: safe_stem(&filename),
        });
    }

    Err(ApiError::not_a_pdf())
}

/// Paths handed to a conversion job.
#[derive(Debug, Clone)]
pub(crate) struct ConversionJob {
    pub collaborators: Collaborators,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Scratch directory, removed as soon as the job finishes.
    pub working_dir: Option<PathBuf>,
    pub stem: String,
}

/// Where a conversion's output goes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConversionPlan {
    pub category: Category,
    pub extension: &'static str,
    pub needs_working_dir: bool,
}

/// Run `job` on the worker pool and stream its output.
pub(crate) async fn convert_upload<F>(
    state: &ApiState,
    upload: Upload,
    plan: ConversionPlan,
    job: F,
) -> std::result::Result<Response, ApiError>
where
    F: FnOnce(&ConversionJob) -> Result<()> + Send + 'static,
{
    let state = state.clone();
    detach(async move { run_conversion(state, upload, plan, job).await }).await
}

async fn run_conversion<F>(
    state: ApiState,
    upload: Upload,
    plan: ConversionPlan,
    job: F,
) -> std::result::Result<Prepared, ApiError>
where
    F: FnOnce(&ConversionJob) -> Result<()> + Send + 'static,
{
    let Upload { artifact: input, stem } = upload;

    let (output, working_dir) = if plan.needs_working_dir {
        match state.layout.allocate_dir(plan.category, Some(&stem)) {
            Ok(dir) => (with_appended_extension(&dir, plan.extension), Some(dir)),
            Err(e) => {
                retire(&state, input, state.config.cleanup.input_retention());
                return Err(ApiError::internal(e));
            }
        }
    } else {
        (state.layout.allocate_derived(plan.category, &stem, plan.extension), None)
    };

    let context = ConversionJob {
        collaborators: state.collaborators.clone(),
        input: input.path().to_path_buf(),
        output: output.clone(),
        working_dir: working_dir.clone(),
        stem,
    };
    let outcome = state.workers.run(move || job(&context)).await;

    if let Some(dir) = working_dir {
        remove_path_async(&dir).await.best_effort();
    }
    retire(&state, input, state.config.cleanup.input_retention());

    match outcome {
        Ok(()) => prepare(
            &state,
            &output,
            Artifact::new(&output, plan.category),
            state.config.cleanup.output_retention(),
        )
        .await
        .map_err(ApiError::internal),
        Err(err) => {
            remove_path_async(&output).await.best_effort();
            Err(ApiError::conversion_failed(PDF_FAILURE_CONTEXT, err))
        }
    }
}

/// Download a video into a fresh directory and stream it.
pub(crate) async fn fetch_video(
    state: &ApiState,
    source: VideoSource,
    query: DownloadQuery,
) -> std::result::Result<Response, ApiError> {
    let url = query
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::validation(DocshiftError::validation("Missing 'url' query parameter.")))?;

    if !is_http_url(&url) {
        return Err(ApiError::validation(DocshiftError::validation(
            "Invalid URL: only http and https links are supported.",
        )));
    }

    let state = state.clone();
    detach(async move {
        let dir = state
            .layout
            .allocate_dir(Category::Video, None)
            .map_err(ApiError::internal)?;
        let owner = Artifact::new(&dir, Category::Video);

        let request = source.request(url, dir);
        let fetcher = state.collaborators.video.clone();
        match state.workers.run(move || download_video(fetcher.as_ref(), &request)).await {
            Ok(file) => prepare(&state, &file, owner, state.config.cleanup.video_retention())
                .await
                .map_err(ApiError::internal),
            Err(err) => {
                owner.discard().await.best_effort();
                Err(ApiError::conversion_failed(source.failure_context(), err))
            }
        }
    })
    .await
}

fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")) && url.len() > "https://".len()
}

/// Run the rest of a request's lifecycle independently of the connection.
async fn detach<Fut>(lifecycle: Fut) -> std::result::Result<Response, ApiError>
where
    Fut: std::future::Future<Output = std::result::Result<Prepared, ApiError>> + Send + 'static,
{
    match tokio::spawn(lifecycle).await {
        Ok(prepared) => prepared.map(Prepared::into_response),
        Err(e) => Err(ApiError::internal(DocshiftError::Other(format!(
            "Request task failed: {}",
            e
        )))),
    }
}

/// An output opened for streaming, its deletion already scheduled.
struct Prepared {
    file: tokio::fs::File,
    len: u64,
    filename: String,
    content_type: String,
}

/// Open `file`, then hand `owner` to the deletion scheduler.
///
/// The handle is opened first so the response can be streamed even if the
/// deletion fires before the client finishes reading.
async fn prepare(state: &ApiState, file: &Path, owner: Artifact, delay: Duration) -> Result<Prepared> {
    let opened = match tokio::fs::File::open(file).await {
        Ok(handle) => handle.metadata().await.map(|meta| (handle, meta.len())),
        Err(e) => Err(e),
    };
    let (handle, len) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            owner.discard().await.best_effort();
            return Err(DocshiftError::Io(e));
        }
    };

    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = mime_guess::from_path(file).first_or_octet_stream().to_string();

    retire(state, owner, delay);

    Ok(Prepared {
        file: handle,
        len,
        filename: sanitize(&name),
        content_type,
    })
}

impl Prepared {
    fn into_response(self) -> Response {
        tracing::debug!("Streaming {} ({} bytes)", self.filename, self.len);
        let headers = [
            (header::CONTENT_TYPE, self.content_type),
            (header::CONTENT_LENGTH, self.len.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", self.filename),
            ),
        ];
        (headers, Body::from_stream(ReaderStream::new(self.file))).into_response()
    }
}

/// Schedule deletion; if the scheduler refuses, remove the artifact now.
fn retire(state: &ApiState, artifact: Artifact, delay: Duration) {
    let path = artifact.path().to_path_buf();
    if let Err(e) = state.scheduler.schedule(artifact, delay) {
        tracing::warn!("{}; removing {} immediately", e, path.display());
        remove_path(&path).best_effort();
    }
}
