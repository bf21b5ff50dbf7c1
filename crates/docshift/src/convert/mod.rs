//! Conversion collaborators.
//!
//! Each engine is reached through a narrow blocking trait. The HTTP layer
//! only ever sees these traits; the concrete engines (yt-dlp, pdfium,
//! LibreOffice) are wired up by [`Collaborators::system`], and tests swap in
//! fakes.
//!
//! All trait methods block and must be called from a worker thread, never
//! from the event loop. See [`WorkerPool`](crate::workers::WorkerPool).

pub mod archive;
pub mod office;
pub mod spreadsheet;
pub mod video;

use crate::Result;
use crate::core::ServiceConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use archive::render_pages_to_zip;
pub use office::LibreOfficeConverter;
pub use spreadsheet::{convert_tables_to_xlsx, write_workbook};
pub use video::{VideoSource, YtDlpFetcher, download_video};

/// A table as rows of cell text. The first row is the header.
pub type Table = Vec<Vec<String>>;

/// Extracts every table from every page of a PDF.
pub trait TableExtractor: Send + Sync {
    fn extract_tables(&self, pdf: &Path) -> Result<Vec<Table>>;
}

/// Converts a PDF into a word-processor document at `output`.
pub trait DocumentConverter: Send + Sync {
    fn convert_to_docx(&self, pdf: &Path, output: &Path) -> Result<()>;
}

/// Renders each page of a PDF to `<out_dir>/<base_name>_page_<n>.png`, 1-based.
///
/// Returns the written paths in page order.
pub trait PageRasterizer: Send + Sync {
    fn render_pages(&self, pdf: &Path, out_dir: &Path, base_name: &str) -> Result<Vec<PathBuf>>;
}

/// Downloads a remote video and returns the path the engine reports.
pub trait VideoFetcher: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub output_template: String,
    pub options: FetchOptions,
}

/// Network resiliency knobs passed to the fetch engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub retries: Option<u32>,
    pub fragment_retries: Option<u32>,
    pub skip_unavailable_fragments: bool,
}

/// The set of engines the HTTP layer dispatches to.
#[derive(Clone)]
pub struct Collaborators {
    pub video: Arc<dyn VideoFetcher>,
    pub tables: Arc<dyn TableExtractor>,
    pub documents: Arc<dyn DocumentConverter>,
    pub pages: Arc<dyn PageRasterizer>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Engines backed by the installed system tools.
    pub fn system(config: &ServiceConfig) -> Self {
        let documents = LibreOfficeConverter::new(
            config.tools.soffice.clone(),
            std::time::Duration::from_secs(config.tools.conversion_timeout_secs),
        );

        Self {
            video: Arc::new(YtDlpFetcher::new(config.tools.yt_dlp.clone())),
            tables: system_tables(),
            documents: Arc::new(documents),
            pages: system_pages(config),
        }
    }
}

#[cfg(feature = "pdf")]
fn system_tables() -> Arc<dyn TableExtractor> {
    Arc::new(crate::pdf::PdfiumTableExtractor::new())
}

#[cfg(feature = "pdf")]
fn system_pages(config: &ServiceConfig) -> Arc<dyn PageRasterizer> {
    Arc::new(crate::pdf::PdfiumRasterizer::from_config(&config.render))
}

#[cfg(not(feature = "pdf"))]
fn system_tables() -> Arc<dyn TableExtractor> {
    Arc::new(Unavailable)
}

#[cfg(not(feature = "pdf"))]
fn system_pages(_config: &ServiceConfig) -> Arc<dyn PageRasterizer> {
    Arc::new(Unavailable)
}

/// Stand-in for PDF engines when the crate is built without `pdf`.
#[cfg(not(feature = "pdf"))]
struct Unavailable;

#[cfg(not(feature = "pdf"))]
impl Unavailable {
    fn error() -> crate::DocshiftError {
        crate::DocshiftError::MissingDependency("PDF support requires the 'pdf' feature".to_string())
    }
}

#[cfg(not(feature = "pdf"))]
impl TableExtractor for Unavailable {
    fn extract_tables(&self, _pdf: &Path) -> Result<Vec<Table>> {
        Err(Self::error())
    }
}

#[cfg(not(feature = "pdf"))]
impl PageRasterizer for Unavailable {
    fn render_pages(&self, _pdf: &Path, _out_dir: &Path, _base_name: &str) -> Result<Vec<PathBuf>> {
        Err(Self::error())
    }
}
