//! Page images to a zip archive.

use super::PageRasterizer;
use crate::{DocshiftError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const NO_PAGES_MESSAGE: &str = "No pages found in PDF.";

/// Render every page of `pdf` into `session_dir`, then pack the PNGs into `zip_path`.
///
/// Entries are stored under their bare file names. The session directory is
/// left in place; removing it is the caller's job.
pub fn render_pages_to_zip(
    rasterizer: &dyn PageRasterizer,
    pdf: &Path,
    session_dir: &Path,
    zip_path: &Path,
    base_name: &str,
) -> Result<usize> {
    let pages = rasterizer.render_pages(pdf, session_dir, base_name)?;
    if pages.is_empty() {
        return Err(DocshiftError::conversion(NO_PAGES_MESSAGE));
    }

    pack(&pages, zip_path)?;
    tracing::debug!("Packed {} page image(s) into {}", pages.len(), zip_path.display());
    Ok(pages.len())
}

fn pack(entries: &[PathBuf], zip_path: &Path) -> Result<()> {
    let file = std::fs::File::create(zip_path)?;
    let mut zip = ZipWriter::new(std::io::BufWriter::new(file));
    // PNG is already compressed.
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for entry in entries {
        let name = entry
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DocshiftError::Other(format!("Page image has no file name: {}", entry.display())))?;
        zip.start_file(name, options)?;
        let mut source = std::fs::File::open(entry)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    let mut inner = zip.finish()?;
    inner.flush()?;
    Ok(())
}
