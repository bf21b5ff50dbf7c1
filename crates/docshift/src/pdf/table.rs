//! PDF table extraction using pdfium character positions.
//!
//! Characters are grouped into positioned words, then handed to the hOCR
//! table reconstruction in `html-to-markdown-rs`, which clusters words into
//! rows and columns. Each page yields at most one table.

use super::bindings::pdfium;
use super::error::{PdfError, Result, load_error};
use crate::convert::{Table, TableExtractor};
use html_to_markdown_rs::hocr::{HocrWord, reconstruct_table};
use pdfium_render::prelude::*;
use std::path::Path;

/// Characters further apart than this (PDF units) belong to different words.
const WORD_SPACING_THRESHOLD: f32 = 3.0;

/// Horizontal distance (pixels) under which words share a column.
const COLUMN_THRESHOLD: u32 = 50;

/// Fraction of the median word height under which words share a row.
const ROW_THRESHOLD_RATIO: f64 = 0.5;

/// PDF text carries no recognition uncertainty.
const PDF_TEXT_CONFIDENCE: f64 = 95.0;

/// Reconstructed grids smaller than this are layout noise, not tables.
const MIN_TABLE_ROWS: usize = 2;
const MIN_TABLE_COLUMNS: usize = 2;

/// [`TableExtractor`] backed by pdfium.
#[derive(Debug, Default, Clone)]
pub struct PdfiumTableExtractor;

impl PdfiumTableExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TableExtractor for PdfiumTableExtractor {
    fn extract_tables(&self, pdf: &Path) -> crate::Result<Vec<Table>> {
        Ok(extract_tables_from_file(pdf)?)
    }
}

/// One table per page that has a tabular layout, in page order.
pub fn extract_tables_from_file(pdf: &Path) -> Result<Vec<Table>> {
    let pdfium = pdfium("table extraction")?;
    let document = pdfium.load_pdf_from_file(pdf, None).map_err(load_error)?;

    let mut tables = Vec::new();
    for (index, page) in document.pages().iter().enumerate() {
        let words = extract_words_from_page(&page)?;
        if words.is_empty() {
            continue;
        }
        let table = reconstruct_table(&words, COLUMN_THRESHOLD, ROW_THRESHOLD_RATIO, true);
        if is_table(&table) {
            tracing::debug!(
                "Page {}: {}x{} table",
                index + 1,
                table.len(),
                table.first().map(Vec::len).unwrap_or(0)
            );
            tables.push(table);
        }
    }
    Ok(tables)
}

fn is_table(table: &[Vec<String>]) -> bool {
    table.len() >= MIN_TABLE_ROWS && table.iter().map(Vec::len).max().unwrap_or(0) >= MIN_TABLE_COLUMNS
}

/// Extract positioned words from a page, in top-left image coordinates.
pub fn extract_words_from_page(page: &PdfPage) -> Result<Vec<HocrWord>> {
    let page_height = page.height().value;
    let page_text = page
        .text()
        .map_err(|e| PdfError::TextExtractionFailed(format!("Failed to get page text: {}", e)))?;

    let mut chars = Vec::new();
    for pdf_char in page_text.chars().iter() {
        let Some(ch) = pdf_char.unicode_char() else {
            continue;
        };
        let bounds = pdf_char
            .loose_bounds()
            .map_err(|e| PdfError::TextExtractionFailed(format!("Failed to get char bounds: {}", e)))?;
        chars.push(CharInfo {
            text: ch,
            x: bounds.left().value,
            y: bounds.bottom().value,
            width: bounds.width().value,
            height: bounds.height().value,
        });
    }

    Ok(group_chars_into_words(&chars, page_height))
}

#[derive(Debug, Clone)]
struct CharInfo {
    text: char,
    x: f32,
    /// PDF coordinates: bottom-left origin.
    y: f32,
    width: f32,
    height: f32,
}

fn group_chars_into_words(chars: &[CharInfo], page_height: f32) -> Vec<HocrWord> {
    let mut words = Vec::new();
    let mut current: Vec<&CharInfo> = Vec::new();

    for info in chars {
        if info.text.is_whitespace() {
            words.extend(finalize_word(&current, page_height));
            current.clear();
            continue;
        }
        if should_start_new_word(&current, info) {
            words.extend(finalize_word(&current, page_height));
            current.clear();
        }
        current.push(info);
    }
    words.extend(finalize_word(&current, page_height));

    words
}

fn should_start_new_word(current: &[&CharInfo], next: &CharInfo) -> bool {
    let Some(last) = current.last() else {
        return false;
    };

    if (next.y - last.y).abs() > last.height * 0.5 {
        return true;
    }

    next.x - (last.x + last.width) > WORD_SPACING_THRESHOLD
}

fn finalize_word(chars: &[&CharInfo], page_height: f32) -> Option<HocrWord> {
    if chars.is_empty() {
        return None;
    }

    let text: String = chars.iter().map(|c| c.text).collect();
    let left = chars.iter().map(|c| c.x).fold(f32::INFINITY, f32::min);
    let right = chars.iter().map(|c| c.x + c.width).fold(f32::NEG_INFINITY, f32::max);
    let bottom = chars.iter().map(|c| c.y).fold(f32::INFINITY, f32::min);
    let top = chars.iter().map(|c| c.y + c.height).fold(f32::NEG_INFINITY, f32::max);

    // Flip to a top-left origin, as hOCR expects.
    let top_in_image = (page_height - top).round();

    Some(HocrWord {
        text,
        left: left.round().max(0.0) as u32,
        top: top_in_image.max(0.0) as u32,
        width: (right - left).round().max(0.0) as u32,
        height: (top - bottom).round().max(0.0) as u32,
        confidence: PDF_TEXT_CONFIDENCE,
    })
}
