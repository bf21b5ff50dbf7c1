//! Tables to `.xlsx`.
//!
//! The workbook is written directly as SpreadsheetML parts inside a zip
//! container. One worksheet per table, named `Sheet1`, `Sheet2`, ... Cell
//! text goes through the shared-strings table.

use super::{Table, TableExtractor};
use crate::{DocshiftError, Result};
use quick_xml::escape::escape;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Returned when a document holds no tables at all.
pub const NO_TABLES_MESSAGE: &str = "No tables found in PDF.";

/// Extract every table from `pdf` and write them to `xlsx`.
///
/// Finding zero tables is a conversion error, not an empty workbook.
pub fn convert_tables_to_xlsx(extractor: &dyn TableExtractor, pdf: &Path, xlsx: &Path) -> Result<usize> {
    let tables = extractor.extract_tables(pdf)?;
    if tables.is_empty() {
        return Err(DocshiftError::conversion(NO_TABLES_MESSAGE));
    }

    let file = std::fs::File::create(xlsx)?;
    write_workbook(std::io::BufWriter::new(file), &tables)?;
    tracing::debug!("Wrote {} table(s) to {}", tables.len(), xlsx.display());
    Ok(tables.len())
}

/// Serialize `tables` as an xlsx workbook.
pub fn write_workbook<W: Write + std::io::Seek>(writer: W, tables: &[Table]) -> Result<()> {
    let mut strings = SharedStrings::default();
    let sheets: Vec<String> = tables.iter().map(|table| sheet_xml(table, &mut strings)).collect();

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut put = |name: &str, body: &str| -> Result<()> {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
        Ok(())
    };

    put("[Content_Types].xml", &content_types(sheets.len()))?;
    put("_rels/.rels", ROOT_RELS)?;
    put("xl/workbook.xml", &workbook_xml(sheets.len()))?;
    put("xl/_rels/workbook.xml.rels", &workbook_rels(sheets.len()))?;
    put("xl/styles.xml", STYLES)?;
    put("xl/sharedStrings.xml", &strings.to_xml())?;
    for (index, sheet) in sheets.iter().enumerate() {
        put(&format!("xl/worksheets/sheet{}.xml", index + 1), sheet)?;
    }

    let mut inner = zip.finish()?;
    inner.flush()?;
    Ok(())
}

#[derive(Default)]
struct SharedStrings {
    index: HashMap<String, usize>,
    ordered: Vec<String>,
    references: usize,
}

impl SharedStrings {
    fn intern(&mut self, text: &str) -> usize {
        self.references += 1;
        if let Some(&idx) = self.index.get(text) {
            return idx;
        }
        let idx = self.ordered.len();
        self.ordered.push(text.to_string());
        self.index.insert(text.to_string(), idx);
        idx
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from(XML_DECL);
        let _ = write!(
            xml,
            r#"<sst xmlns="{NS_MAIN}" count="{}" uniqueCount="{}">"#,
            self.references,
            self.ordered.len()
        );
        for text in &self.ordered {
            let _ = write!(xml, r#"<si><t xml:space="preserve">{}</t></si>"#, escape(text.as_str()));
        }
        xml.push_str("</sst>");
        xml
    }
}

fn sheet_xml(table: &Table, strings: &mut SharedStrings) -> String {
    let mut xml = String::from(XML_DECL);
    let _ = write!(xml, r#"<worksheet xmlns="{NS_MAIN}"><sheetData>"#);

    for (row_idx, row) in table.iter().enumerate() {
        let row_number = row_idx + 1;
        let _ = write!(xml, r#"<row r="{row_number}">"#);
        for (col_idx, cell) in row.iter().enumerate() {
            let text = strip_control(cell);
            if text.is_empty() {
                continue;
            }
            let sst = strings.intern(&text);
            let _ = write!(
                xml,
                r#"<c r="{}{}" t="s"><v>{}</v></c>"#,
                column_name(col_idx),
                row_number,
                sst
            );
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Spreadsheet column letters for a zero-based index: 0 -> A, 25 -> Z, 26 -> AA.
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// XML 1.0 forbids most C0 controls even when escaped.
fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

fn content_types(sheet_count: usize) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    for n in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(sheet_count: usize) -> String {
    let mut xml = String::from(XML_DECL);
    let _ = write!(xml, r#"<workbook xmlns="{NS_MAIN}" xmlns:r="{NS_REL}"><sheets>"#);
    for n in 1..=sheet_count {
        let _ = write!(xml, r#"<sheet name="Sheet{n}" sheetId="{n}" r:id="rId{n}"/>"#);
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    for n in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{n}" Type="{NS_REL}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        );
    }
    let styles_id = sheet_count + 1;
    let strings_id = sheet_count + 2;
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{styles_id}" Type="{NS_REL}/styles" Target="styles.xml"/>"#
    );
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{strings_id}" Type="{NS_REL}/sharedStrings" Target="sharedStrings.xml"/>"#
    );
    xml.push_str("</Relationships>");
    xml
}

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";
const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const ROOT_RELS: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    "</Relationships>"
);

const STYLES: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    "</styleSheet>"
);
