use super::bindings::pdfium;
use super::error::{PdfError, Result, load_error};
use crate::convert::PageRasterizer;
use crate::core::RenderConfig;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};

const PDF_POINTS_PER_INCH: f64 = 72.0;
const MIN_DPI: i32 = 36;
const MAX_DPI: i32 = 600;

/// [`PageRasterizer`] backed by pdfium. Pages are written as PNG.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    target_dpi: i32,
    max_image_dimension: i32,
}

impl PdfiumRasterizer {
    pub fn new(target_dpi: i32, max_image_dimension: i32) -> Self {
        Self {
            target_dpi,
            max_image_dimension,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.target_dpi, config.max_image_dimension)
    }

    pub fn render_to_files(&self, pdf: &Path, out_dir: &Path, base_name: &str) -> Result<Vec<PathBuf>> {
        let pdfium = pdfium("page rendering")?;
        let document = pdfium.load_pdf_from_file(pdf, None).map_err(load_error)?;

        let mut written = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let path = out_dir.join(page_file_name(base_name, index + 1));
            self.render_page(&page, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    fn render_page(&self, page: &PdfPage, path: &Path) -> Result<()> {
        let width_points = page.width().value;
        let height_points = page.height().value;

        let dpi = calculate_optimal_dpi(
            width_points as f64,
            height_points as f64,
            self.target_dpi,
            self.max_image_dimension,
            MIN_DPI,
            MAX_DPI,
        );
        let scale = dpi as f64 / PDF_POINTS_PER_INCH;

        let config = PdfRenderConfig::new()
            .set_target_width(((width_points * scale as f32) as i32).max(1))
            .set_target_height(((height_points * scale as f32) as i32).max(1))
            .rotate_if_landscape(PdfPageRenderRotation::None, false);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| PdfError::RenderingFailed(format!("Failed to render page: {}", e)))?;

        bitmap
            .as_image()
            .into_rgb8()
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| PdfError::IOError(format!("Failed to write {}: {}", path.display(), e)))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render_pages(&self, pdf: &Path, out_dir: &Path, base_name: &str) -> crate::Result<Vec<PathBuf>> {
        Ok(self.render_to_files(pdf, out_dir, base_name)?)
    }
}

/// `<base>_page_<n>.png`, `n` starting at 1.
pub fn page_file_name(base_name: &str, page_number: usize) -> String {
    format!("{}_page_{}.png", base_name, page_number)
}

fn calculate_optimal_dpi(
    page_width: f64,
    page_height: f64,
    target_dpi: i32,
    max_dimension: i32,
    min_dpi: i32,
    max_dpi: i32,
) -> i32 {
    let width_inches = page_width / PDF_POINTS_PER_INCH;
    let height_inches = page_height / PDF_POINTS_PER_INCH;

    let width_at_target = (width_inches * target_dpi as f64) as i32;
    let height_at_target = (height_inches * target_dpi as f64) as i32;

    if width_at_target <= max_dimension && height_at_target <= max_dimension {
        return target_dpi.clamp(min_dpi, max_dpi);
    }

    let width_limited_dpi = (max_dimension as f64 / width_inches) as i32;
    let height_limited_dpi = (max_dimension as f64 / height_inches) as i32;

    width_limited_dpi.min(height_limited_dpi).clamp(min_dpi, max_dpi)
}
