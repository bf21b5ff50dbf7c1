//! pdfium-backed PDF engines.
//!
//! - **Table extraction**: words from character positions, then hOCR table
//!   reconstruction ([`PdfiumTableExtractor`])
//! - **Page rendering**: one PNG per page ([`PdfiumRasterizer`])
//!
//! The pdfium shared library is loaded lazily on first use, from
//! `PDFIUM_LIB_PATH` if set, otherwise from the system library path.
//!
//! Requires the `pdf` feature.
pub mod bindings;
pub mod error;
pub mod rendering;
pub mod table;

pub use error::PdfError;
pub use rendering::{PdfiumRasterizer, page_file_name};
pub use table::{PdfiumTableExtractor, extract_tables_from_file};
