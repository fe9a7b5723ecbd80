//! Excel (XLSX) adapter.
//!
//! A workbook is read into sheets of sparse cells: shared strings are
//! resolved, formulas are kept next to their cached values. Merging is a
//! union of every input's sheets written into a fresh package with inline
//! strings.

use super::{FormatAdapter, bounded_preview, count_words};
use crate::config::MergeOptions;
use crate::convert::text_grid;
use crate::document::{DocumentMetadata, ProcessorResult, SourceDocument};
use crate::error::{DocMergeError, Result};
use crate::format::LogicalFormat;
use crate::ooxml::{
    Package, PackageWriter, attr, core_properties_xml, escape_xml, event_text, local_name,
    xml_error,
};
use bytes::Bytes;
use chrono::Utc;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Largest workbook accepted, in cells.
pub const MAX_CELLS: usize = 2_000_000;

/// Rows in a worksheet.
pub const MAX_ROWS: u32 = 1_048_576;

/// Columns in a worksheet.
pub const MAX_COLUMNS: u32 = 16_384;

/// Longest sheet name Excel accepts.
pub const MAX_SHEET_NAME: usize = 31;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const FORBIDDEN_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

const PREVIEW_SHEETS: usize = 3;
const PREVIEW_ROWS: usize = 5;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Adapter for Excel workbooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxAdapter;

/// A typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Number, kept as written.
    Number(String),
    /// Shared, inline or formula string.
    Text(String),
    /// Boolean.
    Bool(bool),
    /// Error literal such as `#DIV/0!`.
    Error(String),
}

impl CellValue {
    /// The value as shown in a grid.
    pub fn display(&self) -> String {
        match self {
            Self::Number(n) => n.clone(),
            Self::Text(t) => t.clone(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Error(e) => e.clone(),
        }
    }
}

/// One non-empty cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// 1-based row.
    pub row: u32,
    /// 1-based column.
    pub col: u32,
    /// Cached value.
    pub value: CellValue,
    /// Formula without the leading `=`.
    pub formula: Option<String>,
}

/// A worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    /// Tab name.
    pub name: String,
    /// Non-empty cells.
    pub cells: Vec<Cell>,
}

impl Sheet {
    /// Rows of displayed values. Empty rows are dropped; each row runs to
    /// its last non-empty cell.
    pub fn rows(&self) -> Vec<Vec<String>> {
        let mut rows: BTreeMap<u32, BTreeMap<u32, String>> = BTreeMap::new();
        for cell in &self.cells {
            rows.entry(cell.row)
                .or_default()
                .insert(cell.col, cell.value.display());
        }

        rows.into_values()
            .map(|cells| {
                let width = cells.keys().next_back().copied().unwrap_or(0);
                (1..=width)
                    .map(|col| cells.get(&col).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

/// A parsed workbook.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    /// Sheets in tab order.
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Cells across every sheet.
    pub fn cell_count(&self) -> usize {
        self.sheets.iter().map(|s| s.cells.len()).sum()
    }

    fn text(&self) -> String {
        self.sheets
            .iter()
            .map(|sheet| {
                let rows: Vec<String> = sheet.rows().iter().map(|r| r.join("\t")).collect();
                format!("{}\n{}", sheet.name, rows.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl FormatAdapter for XlsxAdapter {
    fn format(&self) -> LogicalFormat {
        LogicalFormat::Xlsx
    }

    fn analyze(&self, data: &Bytes) -> DocumentMetadata {
        let mut metadata = DocumentMetadata::default();
        let mut package = match Package::open(data, LogicalFormat::Xlsx) {
            Ok(package) => package,
            Err(err) => {
                debug!(error = %err, "XLSX analysis failed");
                return metadata;
            }
        };

        if let Err(err) = package.read_core_properties(&mut metadata) {
            debug!(error = %err, "Ignoring unreadable core properties");
        }
        match sheet_list(&mut package) {
            Ok(sheets) => metadata.sheet_count = Some(sheets.len() as u32),
            Err(err) => debug!(error = %err, "Could not list sheets"),
        }
        if let Ok(workbook) = parse_package(&mut package) {
            metadata.word_count = Some(count_words(&workbook.text()));
        }
        metadata
    }

    fn preview(&self, data: &Bytes) -> String {
        let workbook = match read_workbook(data) {
            Ok(workbook) => workbook,
            Err(err) => return format!("Excel workbook (unreadable: {err})"),
        };

        let mut preview = format!(
            "Excel workbook, {} sheet(s), {} cell(s)",
            workbook.sheets.len(),
            workbook.cell_count()
        );
        for sheet in workbook.sheets.iter().take(PREVIEW_SHEETS) {
            let rows: Vec<Vec<String>> = sheet.rows().into_iter().take(PREVIEW_ROWS).collect();
            preview.push_str(&format!("\n\n[{}]\n{}", sheet.name, text_grid(&rows)));
        }
        bounded_preview(&preview)
    }

    fn extract_text(&self, data: &Bytes) -> Result<String> {
        Ok(read_workbook(data)?.text())
    }

    fn validate_structure(&self, data: &Bytes) -> Result<()> {
        let mut package = Package::open(data, LogicalFormat::Xlsx)?;
        sheet_list(&mut package).map(|_| ())
    }

    fn merge_same_format(
        &self,
        sources: &[SourceDocument],
        options: &MergeOptions,
    ) -> ProcessorResult {
        let mut names = SheetNames::default();
        let mut sheets = Vec::new();
        let mut warnings = Vec::new();
        let mut author = None;
        let mut merged = 0usize;

        for source in sources {
            let parsed = Package::open(&source.data, LogicalFormat::Xlsx).and_then(|mut package| {
                let workbook = parse_package(&mut package)?;
                let mut metadata = DocumentMetadata::default();
                if let Err(err) = package.read_core_properties(&mut metadata) {
                    debug!(file = %source.name, error = %err, "Ignoring unreadable core properties");
                }
                Ok((workbook, metadata))
            });

            match parsed {
                Ok((workbook, metadata)) => {
                    if author.is_none() {
                        author = metadata.author;
                    }
                    for mut sheet in workbook.sheets {
                        sheet.name = names.claim(&sheet.name);
                        if !options.preserve_formulas {
                            strip_formulas(&mut sheet);
                        }
                        sheets.push(sheet);
                    }
                    merged += 1;
                }
                Err(err) => {
                    warn!(file = %source.name, error = %err, "Adding error sheet for unreadable XLSX");
                    warnings.push(format!("{}: {err}", source.name));
                    sheets.push(error_sheet(
                        names.claim(&format!("Error - {}", source.name)),
                        &source.name,
                        &err,
                    ));
                }
            }
        }

        if merged == 0 {
            return ProcessorResult::failed("no sheets could be read from any input XLSX");
        }

        let metadata = DocumentMetadata {
            title: Some(options.output_name.clone()),
            author,
            sheet_count: Some(sheets.len() as u32),
            created_date: Some(Utc::now()),
            modified_date: Some(Utc::now()),
            ..Default::default()
        };

        match write_workbook(&sheets, options.preserve_metadata.then_some(&metadata)) {
            Ok(data) => ProcessorResult::ok(data, LogicalFormat::Xlsx)
                .with_warnings(warnings)
                .with_metadata(metadata),
            Err(err) => ProcessorResult::failed(err.to_string()),
        }
    }

    fn bridge_text(&self, data: &Bytes) -> Result<String> {
        let workbook = read_workbook(data)?;
        Ok(workbook
            .sheets
            .iter()
            .map(|sheet| format!("{}\n\n{}", sheet.name.to_uppercase(), text_grid(&sheet.rows())))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// Read every sheet of a workbook.
///
/// # Errors
///
/// [`DocMergeError::SpreadsheetTooLarge`] above [`MAX_CELLS`], or
/// [`DocMergeError::Corrupted`] when the package cannot be parsed.
pub fn read_workbook(data: &Bytes) -> Result<Workbook> {
    let mut package = Package::open(data, LogicalFormat::Xlsx)?;
    parse_package(&mut package)
}

fn parse_package(package: &mut Package) -> Result<Workbook> {
    let shared = match package.read_optional(SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let mut workbook = Workbook::default();
    let mut budget = MAX_CELLS;
    for (name, part) in sheet_list(package)? {
        let xml = package.read_part(&part)?;
        let cells = parse_worksheet(&xml, &part, &shared, budget)?;
        budget -= cells.len();
        workbook.sheets.push(Sheet { name, cells });
    }
    Ok(workbook)
}

/// Sheet names and their part paths, in tab order.
fn sheet_list(package: &mut Package) -> Result<Vec<(String, String)>> {
    let xml = package.read_part(WORKBOOK_PART)?;
    let rels = package.relationships(WORKBOOK_PART)?;

    let mut sheets = Vec::new();
    let mut reader = Reader::from_str(&xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"sheet" =>
            {
                let index = sheets.len() + 1;
                let name = attr(e, "name").unwrap_or_else(|| format!("Sheet{index}"));
                let part = relationship_id(e)
                    .and_then(|id| rels.get(&id).cloned())
                    .unwrap_or_else(|| format!("xl/worksheets/sheet{index}.xml"));
                sheets.push((name, part));
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error(LogicalFormat::Xlsx, WORKBOOK_PART, err)),
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// The `r:id` attribute, whatever its prefix.
fn relationship_id(element: &BytesStart) -> Option<String> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| {
            let key = a.key.as_ref();
            key != b"id" && local_name(key) == b"id"
        })
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Parse `xl/sharedStrings.xml`. Phonetic runs are skipped.
pub fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| xml_error(LogicalFormat::Xlsx, SHARED_STRINGS_PART, err))?;
        match &event {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"si" => current = Some(String::new()),
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if local_name(e.name().as_ref()) == b"si" => {
                strings.push(String::new());
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"si" => strings.extend(current.take()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            other => {
                if in_text
                    && let Some(s) = current.as_mut()
                    && let Some(text) = event_text(other)
                {
                    s.push_str(&text);
                }
            }
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Capture {
    Value,
    Formula,
    Inline,
}

#[derive(Default)]
struct CellBuilder {
    row: u32,
    col: u32,
    kind: Option<String>,
    value: String,
    formula: Option<String>,
    inline: String,
}

impl CellBuilder {
    fn finish(self, shared: &[String]) -> Option<Cell> {
        let raw = self.value.trim();
        let value = match self.kind.as_deref() {
            Some("s") => {
                let index: usize = raw.parse().ok()?;
                CellValue::Text(shared.get(index).cloned().unwrap_or_default())
            }
            Some("inlineStr") => CellValue::Text(self.inline),
            Some("str") => CellValue::Text(self.value),
            Some("b") => CellValue::Bool(raw == "1"),
            Some("e") => CellValue::Error(raw.to_string()),
            _ if raw.is_empty() && self.formula.is_none() => return None,
            _ => CellValue::Number(raw.to_string()),
        };
        Some(Cell {
            row: self.row,
            col: self.col,
            value,
            formula: self.formula.filter(|f| !f.is_empty()),
        })
    }
}

/// Parse one worksheet part, refusing to read more than `budget` cells.
fn parse_worksheet(xml: &str, part: &str, shared: &[String], budget: usize) -> Result<Vec<Cell>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut cells = Vec::new();
    let mut row = 0u32;
    let mut next_col = 1u32;
    let mut cell: Option<CellBuilder> = None;
    let mut capture: Option<Capture> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| xml_error(LogicalFormat::Xlsx, part, err))?;
        match &event {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"row" => {
                row = attr(e, "r")
                    .and_then(|r| r.parse().ok())
                    .filter(|r| (1..=MAX_ROWS).contains(r))
                    .unwrap_or(row.saturating_add(1).min(MAX_ROWS));
                next_col = 1;
            }
            Event::Start(e) if local_name(e.name().as_ref()) == b"c" => {
                let (r, c) = attr(e, "r")
                    .and_then(|r| parse_cell_ref(&r))
                    .unwrap_or((row.max(1), next_col));
                next_col = c.saturating_add(1);
                cell = Some(CellBuilder {
                    row: r,
                    col: c,
                    kind: attr(e, "t"),
                    ..Default::default()
                });
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"c" => {
                next_col = attr(e, "r")
                    .and_then(|r| parse_cell_ref(&r))
                    .map_or(next_col, |(_, c)| c)
                    .saturating_add(1);
            }
            Event::Start(e) => {
                capture = match local_name(e.name().as_ref()) {
                    b"v" => Some(Capture::Value),
                    b"f" => {
                        if let Some(cell) = cell.as_mut() {
                            cell.formula = Some(String::new());
                        }
                        Some(Capture::Formula)
                    }
                    b"t" if cell.is_some() => Some(Capture::Inline),
                    _ => capture,
                };
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"v" | b"f" | b"t" => capture = None,
                b"c" => {
                    if let Some(built) = cell.take().and_then(|c| c.finish(shared)) {
                        if cells.len() >= budget {
                            return Err(DocMergeError::SpreadsheetTooLarge {
                                cells: MAX_CELLS - budget + cells.len() + 1,
                                limit: MAX_CELLS,
                            });
                        }
                        cells.push(built);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            other => {
                if let (Some(target), Some(cell)) = (capture, cell.as_mut())
                    && let Some(text) = event_text(other)
                {
                    match target {
                        Capture::Value => cell.value.push_str(&text),
                        Capture::Inline => cell.inline.push_str(&text),
                        Capture::Formula => {
                            cell.formula.get_or_insert_with(String::new).push_str(&text)
                        }
                    }
                }
            }
        }
        buf.clear();
    }
    Ok(cells)
}

/// Split `B12` into `(12, 2)`.
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .chars()
        .try_fold(0u32, |acc, c| {
            acc.checked_mul(26)?
                .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
        })?;
    let row = digits.parse().ok()?;
    ((1..=MAX_ROWS).contains(&row) && col <= MAX_COLUMNS).then_some((row, col))
}

/// Column letters for a 1-based column index.
pub fn column_name(mut col: u32) -> String {
    let mut name = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        name.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn strip_formulas(sheet: &mut Sheet) {
    for cell in &mut sheet.cells {
        cell.formula = None;
    }
}

fn error_sheet(name: String, file: &str, err: &DocMergeError) -> Sheet {
    let text = |row, value: String| Cell {
        row,
        col: 1,
        value: CellValue::Text(value),
        formula: None,
    };
    Sheet {
        name,
        cells: vec![
            text(1, format!("Could not read {file}")),
            text(2, err.to_string()),
        ],
    }
}

/// Replace characters Excel forbids in sheet names and cut to length.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if FORBIDDEN_NAME_CHARS.contains(&c) { '_' } else { c })
        .filter(|c| !c.is_control())
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    let cleaned = if cleaned.is_empty() { "Sheet" } else { cleaned };
    cleaned.chars().take(MAX_SHEET_NAME).collect()
}

/// Sheet names already used in the output workbook.
#[derive(Debug, Default)]
struct SheetNames {
    taken: HashSet<String>,
}

impl SheetNames {
    /// Sanitize `wanted` and make it unique (case-insensitively) with a
    /// ` (n)` suffix that still fits the length limit.
    fn claim(&mut self, wanted: &str) -> String {
        let base = sanitize_sheet_name(wanted);
        let mut candidate = base.clone();
        let mut n = 2;
        while self.taken.contains(&candidate.to_lowercase()) {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME - suffix.chars().count();
            let stem: String = base.chars().take(keep).collect();
            candidate = format!("{}{suffix}", stem.trim_end());
            n += 1;
        }
        self.taken.insert(candidate.to_lowercase());
        candidate
    }
}

/// Write sheets into a new XLSX package.
pub fn write_workbook(sheets: &[Sheet], metadata: Option<&DocumentMetadata>) -> Result<Vec<u8>> {
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
    );
    let mut sheet_entries = String::new();
    let mut rels = String::new();

    let mut writer = PackageWriter::new();
    for (index, sheet) in sheets.iter().enumerate() {
        let number = index + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{number}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        sheet_entries.push_str(&format!(
            r#"<sheet name="{}" sheetId="{number}" r:id="rId{number}"/>"#,
            escape_xml(&sheet.name)
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{number}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{number}.xml"/>"#
        ));
        writer.add_part(
            &format!("xl/worksheets/sheet{number}.xml"),
            &worksheet_xml(sheet),
        )?;
    }
    content_types.push_str("</Types>");

    writer.add_part("[Content_Types].xml", &content_types)?;
    writer.add_part(
        "_rels/.rels",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#
        ),
    )?;
    writer.add_part(
        WORKBOOK_PART,
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>{sheet_entries}</sheets></workbook>"#
        ),
    )?;
    writer.add_part(
        "xl/_rels/workbook.xml.rels",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        ),
    )?;
    let core = core_properties_xml(metadata.unwrap_or(&DocumentMetadata::default()));
    writer.add_part("docProps/core.xml", &core)?;
    writer.finish()
}

fn worksheet_xml(sheet: &Sheet) -> String {
    let mut cells: Vec<&Cell> = sheet.cells.iter().collect();
    cells.sort_by_key(|c| (c.row, c.col));

    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}"><sheetData>"#
    );
    let mut open_row: Option<u32> = None;
    for cell in cells {
        if open_row != Some(cell.row) {
            if open_row.is_some() {
                xml.push_str("</row>");
            }
            xml.push_str(&format!(r#"<row r="{}">"#, cell.row));
            open_row = Some(cell.row);
        }
        xml.push_str(&cell_xml(cell));
    }
    if open_row.is_some() {
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn cell_xml(cell: &Cell) -> String {
    let reference = format!("{}{}", column_name(cell.col), cell.row);
    let formula = cell
        .formula
        .as_ref()
        .map(|f| format!("<f>{}</f>", escape_xml(f)))
        .unwrap_or_default();

    match &cell.value {
        CellValue::Text(text) if cell.formula.is_some() => format!(
            r#"<c r="{reference}" t="str">{formula}<v>{}</v></c>"#,
            escape_xml(text)
        ),
        CellValue::Text(text) => format!(
            r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            escape_xml(text)
        ),
        CellValue::Number(n) => format!(r#"<c r="{reference}">{formula}<v>{}</v></c>"#, escape_xml(n)),
        CellValue::Bool(b) => format!(
            r#"<c r="{reference}" t="b">{formula}<v>{}</v></c>"#,
            u8::from(*b)
        ),
        CellValue::Error(e) => format!(
            r#"<c r="{reference}" t="e">{formula}<v>{}</v></c>"#,
            escape_xml(e)
        ),
    }
}
