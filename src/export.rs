//! XLSX export.
//!
//! Writes a minimal Office Open XML workbook: one worksheet per energy source
//! with `Year`, `Net Production (mln kWh)` and `Installed Capacity (MW)`
//! columns. Strings are stored inline, so no shared-string table is needed.

use crate::model::{EnergySource, Metric, YearlySeries};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;
use zip::write::SimpleFileOptions;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("nothing to export: the series is empty")]
    Empty,
}

pub type ExportResult<T> = Result<T, ExportError>;

const HEADER_YEAR: &str = "Year";

/// Writes the workbook to `path`, returning the sheet names in order.
pub fn write_workbook(series: &YearlySeries, path: &Path) -> ExportResult<Vec<&'static str>> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let sheets = write_workbook_to(series, &mut writer)?;
    writer.flush()?;
    info!(path = %path.display(), sheets = sheets.len(), "workbook written");
    Ok(sheets)
}

/// Writes the workbook to any seekable writer.
///
/// Sheets follow `EnergySource::ALL` order; sources absent from the series
/// get no sheet. An empty series is an error rather than an empty workbook.
pub fn write_workbook_to<W: Write + Seek>(series: &YearlySeries, writer: W) -> ExportResult<Vec<&'static str>> {
    let sources: Vec<EnergySource> = EnergySource::ALL
        .into_iter()
        .filter(|s| series.contains_source(*s))
        .collect();
    if sources.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut zip = zip::ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types_xml(sources.len()).as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml(&sources).as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(workbook_rels_xml(sources.len()).as_bytes())?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(STYLES_XML.as_bytes())?;

    for (i, source) in sources.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(worksheet_xml(series, *source).as_bytes())?;
    }

    zip.finish()?;
    Ok(sources.iter().map(|s| s.sheet_name()).collect())
}

// ============================================================================
// Package parts
// ============================================================================

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

// Style 1 is the bold header font.
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs>
<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;

fn content_types_xml(sheet_count: usize) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
"#,
    );
    for i in 1..=sheet_count {
        content.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\n",
            i
        ));
    }
    content.push_str("</Types>");
    content
}

fn workbook_xml(sources: &[EnergySource]) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
"#,
    );
    for (i, source) in sources.iter().enumerate() {
        content.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>\n",
            escape_xml(source.sheet_name()),
            i + 1,
            i + 1
        ));
    }
    content.push_str("</sheets>\n</workbook>");
    content
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for i in 1..=sheet_count {
        content.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>\n",
            i, i
        ));
    }
    // styles take the id after the last sheet
    content.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>\n",
        sheet_count + 1
    ));
    content.push_str("</Relationships>");
    content
}

fn worksheet_xml(series: &YearlySeries, source: EnergySource) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cols><col min="1" max="1" width="8" customWidth="1"/><col min="2" max="3" width="26" customWidth="1"/></cols>
<sheetData>
"#,
    );

    content.push_str("<row r=\"1\">");
    let headers = [HEADER_YEAR, Metric::NetProduction.header(), Metric::InstalledCapacity.header()];
    for (col, header) in ["A", "B", "C"].iter().zip(headers) {
        content.push_str(&format!(
            "<c r=\"{}1\" t=\"inlineStr\" s=\"1\"><is><t>{}</t></is></c>",
            col,
            escape_xml(header)
        ));
    }
    content.push_str("</row>\n");

    if let Some(years) = series.years(source) {
        for (i, (year, metrics)) in years.iter().enumerate() {
            let row = i + 2;
            content.push_str(&format!(
                "<row r=\"{row}\"><c r=\"A{row}\"><v>{}</v></c><c r=\"B{row}\"><v>{}</v></c><c r=\"C{row}\"><v>{}</v></c></row>\n",
                year,
                metrics.production,
                metrics.capacity
            ));
        }
    }

    content.push_str("</sheetData>\n</worksheet>");
    content
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
