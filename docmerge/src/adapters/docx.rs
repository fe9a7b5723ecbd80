//! Word (DOCX) adapter.
//!
//! `word/document.xml` is read into a flat list of [`Block`]s: paragraphs
//! (with heading level and list flag) and tables. Merging writes those
//! blocks into a new minimal package; styling beyond headings is not carried
//! over.

use super::{FormatAdapter, bounded_preview, count_words};
use crate::config::MergeOptions;
use crate::convert::text_grid;
use crate::document::{DocumentMetadata, ProcessorResult, SourceDocument};
use crate::error::Result;
use crate::format::LogicalFormat;
use crate::ooxml::{
    Package, PackageWriter, attr, core_properties_xml, escape_xml, event_text, local_name,
    xml_error,
};
use bytes::Bytes;
use chrono::Utc;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

const DOCUMENT_PART: &str = "word/document.xml";

/// Structured text shorter than this falls back to raw extraction.
const STRUCTURED_MIN_CHARS: usize = 100;

const PREVIEW_LINES: usize = 8;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

/// A4 portrait, one-inch margins.
const SECTION_PROPERTIES: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#;

/// Adapter for Word documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxAdapter;

/// One paragraph of body text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    /// Text with tabs and line breaks.
    pub text: String,
    /// Heading level 1-9, from a `Heading N` or `Title` style.
    pub heading: Option<u8>,
    /// Whether the paragraph is numbered or bulleted.
    pub list_item: bool,
}

/// A top-level body element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A paragraph.
    Paragraph(Paragraph),
    /// A table as rows of cell text. Nested tables are flattened into their
    /// enclosing cell.
    Table(Vec<Vec<String>>),
}

/// Parsed `word/document.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordDocument {
    /// Body in document order.
    pub blocks: Vec<Block>,
    /// Drawings, pictures and embedded objects that were skipped.
    pub skipped_objects: usize,
}

impl WordDocument {
    /// All text runs, one paragraph per line, table cells separated by tabs.
    pub fn raw_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => lines.push(p.text.clone()),
                Block::Table(rows) => lines.extend(rows.iter().map(|row| row.join("\t"))),
            }
        }
        lines.join("\n")
    }

    /// Text with headings set apart, bullets marked and tables drawn as grids.
    pub fn structured_text(&self) -> String {
        let mut out: Vec<String> = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) if p.heading.is_some() => {
                    if out.last().is_some_and(|l| !l.is_empty()) {
                        out.push(String::new());
                    }
                    match p.heading {
                        Some(level) if level <= 2 => out.push(p.text.to_uppercase()),
                        _ => out.push(p.text.clone()),
                    }
                }
                Block::Paragraph(p) if p.list_item => out.push(format!("\u{2022} {}", p.text)),
                Block::Paragraph(p) => out.push(p.text.clone()),
                Block::Table(rows) => {
                    out.push(String::new());
                    out.push(text_grid(rows));
                    out.push(String::new());
                }
            }
        }
        out.join("\n").trim().to_string()
    }

    fn count(&self, tables: bool) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Table(_)) == tables)
            .count()
    }
}

impl FormatAdapter for DocxAdapter {
    fn format(&self) -> LogicalFormat {
        LogicalFormat::Docx
    }

    fn analyze(&self, data: &Bytes) -> DocumentMetadata {
        let mut metadata = DocumentMetadata::default();
        let mut package = match Package::open(data, LogicalFormat::Docx) {
            Ok(package) => package,
            Err(err) => {
                debug!(error = %err, "DOCX analysis failed");
                return metadata;
            }
        };

        if let Err(err) = package.read_core_properties(&mut metadata) {
            debug!(error = %err, "Ignoring unreadable core properties");
        }
        if let Ok(app) = package.read_app_properties() {
            metadata.page_count = app.pages;
            metadata.word_count = app.words;
        }
        if metadata.word_count.is_none()
            && let Ok(doc) = read_document(&mut package)
        {
            metadata.word_count = Some(count_words(&doc.raw_text()));
        }
        metadata
    }

    fn preview(&self, data: &Bytes) -> String {
        let doc = match load(data) {
            Ok(doc) => doc,
            Err(_) => return "Word document (unreadable)".to_string(),
        };

        let text = doc.structured_text();
        let head: Vec<&str> = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(PREVIEW_LINES)
            .collect();
        bounded_preview(&format!(
            "Word document, {} paragraph(s), {} table(s)\n\n{}",
            doc.count(false),
            doc.count(true),
            head.join("\n")
        ))
    }

    fn extract_text(&self, data: &Bytes) -> Result<String> {
        Ok(load(data)?.raw_text())
    }

    fn validate_structure(&self, data: &Bytes) -> Result<()> {
        load(data).map(|_| ())
    }

    fn merge_same_format(
        &self,
        sources: &[SourceDocument],
        options: &MergeOptions,
    ) -> ProcessorResult {
        let mut body = BodyWriter::new(options.preserve_formatting);
        let mut warnings = Vec::new();
        let mut author = None;
        let mut merged = 0usize;
        let mut words = 0u64;

        for (index, source) in sources.iter().enumerate() {
            if index > 0 && options.page_breaks {
                body.page_break();
            }
            if options.include_headers {
                body.document_header(&source.name);
            }

            let parsed = Package::open(&source.data, LogicalFormat::Docx).and_then(|mut package| {
                let doc = read_document(&mut package)?;
                let mut metadata = DocumentMetadata::default();
                if let Err(err) = package.read_core_properties(&mut metadata) {
                    debug!(file = %source.name, error = %err, "Ignoring unreadable core properties");
                }
                Ok((doc, metadata))
            });

            match parsed {
                Ok((doc, metadata)) => {
                    if author.is_none() {
                        author = metadata.author;
                    }
                    if doc.skipped_objects > 0 {
                        warnings.push(format!(
                            "{}: complex formatting not preserved ({} embedded object(s) skipped)",
                            source.name, doc.skipped_objects
                        ));
                    }
                    words += count_words(&doc.raw_text());
                    for block in &doc.blocks {
                        body.block(block);
                    }
                    merged += 1;
                }
                Err(err) => {
                    warn!(file = %source.name, error = %err, "Inserting error paragraph for unreadable DOCX");
                    warnings.push(format!("{}: {err}", source.name));
                    body.error_notice(&source.name, &err.to_string());
                }
            }

            if options.include_footers {
                body.document_footer(&source.name);
            }
        }

        if merged == 0 {
            return ProcessorResult::failed("no content could be read from any input DOCX");
        }

        let metadata = DocumentMetadata {
            title: Some(options.output_name.clone()),
            author,
            created_date: Some(Utc::now()),
            modified_date: Some(Utc::now()),
            word_count: Some(words),
            ..Default::default()
        };

        match write_package(&body.finish(), options.preserve_metadata.then_some(&metadata)) {
            Ok(data) => ProcessorResult::ok(data, LogicalFormat::Docx)
                .with_warnings(warnings)
                .with_metadata(metadata),
            Err(err) => ProcessorResult::failed(err.to_string()),
        }
    }

    fn bridge_text(&self, data: &Bytes) -> Result<String> {
        let doc = load(data)?;
        let structured = doc.structured_text();
        if structured.chars().count() < STRUCTURED_MIN_CHARS {
            return Ok(doc.raw_text());
        }
        Ok(structured)
    }
}

fn load(data: &Bytes) -> Result<WordDocument> {
    let mut package = Package::open(data, LogicalFormat::Docx)?;
    read_document(&mut package)
}

fn read_document(package: &mut Package) -> Result<WordDocument> {
    parse_document(&package.read_part(DOCUMENT_PART)?)
}

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Vec<String>>,
    cell: Option<String>,
}

/// Parse the main document part.
pub fn parse_document(xml: &str) -> Result<WordDocument> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut doc = WordDocument::default();
    let mut paragraph: Option<Paragraph> = None;
    let mut tables: Vec<TableBuilder> = Vec::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| xml_error(LogicalFormat::Docx, DOCUMENT_PART, err))?;

        match &event {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"p" => paragraph = Some(Paragraph::default()),
                b"r" => in_run = true,
                b"t" => in_text = true,
                b"tbl" => tables.push(TableBuilder::default()),
                b"tr" => {
                    if let Some(table) = tables.last_mut() {
                        table.rows.push(Vec::new());
                    }
                }
                b"tc" => {
                    if let Some(table) = tables.last_mut() {
                        table.cell = Some(String::new());
                    }
                }
                b"drawing" | b"pict" | b"object" => doc.skipped_objects += 1,
                name => apply_property(name, e, paragraph.as_mut()),
            },
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"p" => finish_paragraph(Paragraph::default(), &mut tables, &mut doc.blocks),
                b"tab" if in_run => push_text(paragraph.as_mut(), "\t"),
                b"br" | b"cr" if in_run => push_text(paragraph.as_mut(), "\n"),
                name => apply_property(name, e, paragraph.as_mut()),
            },
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => {
                    if let Some(done) = paragraph.take() {
                        finish_paragraph(done, &mut tables, &mut doc.blocks);
                    }
                }
                b"tc" => {
                    if let Some(table) = tables.last_mut()
                        && let Some(cell) = table.cell.take()
                        && let Some(row) = table.rows.last_mut()
                    {
                        row.push(cell.trim().to_string());
                    }
                }
                b"tbl" => {
                    if let Some(done) = tables.pop() {
                        match tables.last_mut().and_then(|outer| outer.cell.as_mut()) {
                            Some(cell) => {
                                for row in &done.rows {
                                    append_cell_text(cell, &row.join(" "));
                                }
                            }
                            None => doc.blocks.push(Block::Table(done.rows)),
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            other => {
                if in_text && let Some(text) = event_text(other) {
                    push_text(paragraph.as_mut(), &text);
                }
            }
        }
        buf.clear();
    }

    Ok(doc)
}

fn apply_property(name: &[u8], element: &BytesStart, paragraph: Option<&mut Paragraph>) {
    let Some(paragraph) = paragraph else { return };
    match name {
        b"pStyle" => {
            if let Some(level) = attr(element, "w:val").and_then(|v| heading_level(&v)) {
                paragraph.heading = Some(level);
            }
        }
        b"numPr" => paragraph.list_item = true,
        _ => {}
    }
}

fn push_text(paragraph: Option<&mut Paragraph>, text: &str) {
    if let Some(paragraph) = paragraph {
        paragraph.text.push_str(text);
    }
}

fn finish_paragraph(paragraph: Paragraph, tables: &mut [TableBuilder], blocks: &mut Vec<Block>) {
    match tables.last_mut().and_then(|table| table.cell.as_mut()) {
        Some(cell) => append_cell_text(cell, &paragraph.text),
        None => blocks.push(Block::Paragraph(paragraph)),
    }
}

fn append_cell_text(cell: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !cell.is_empty() {
        cell.push(' ');
    }
    cell.push_str(text);
}

/// Heading level for a paragraph style id such as `Heading2` or `Title`.
fn heading_level(style: &str) -> Option<u8> {
    let style = style.to_lowercase();
    if style == "title" {
        return Some(1);
    }
    let level: u8 = style.strip_prefix("heading")?.trim().parse().ok()?;
    (1..=9).contains(&level).then_some(level)
}

/// Accumulates `<w:body>` content for a merged document.
struct BodyWriter {
    xml: String,
    preserve_formatting: bool,
}

impl BodyWriter {
    fn new(preserve_formatting: bool) -> Self {
        Self {
            xml: String::new(),
            preserve_formatting,
        }
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Paragraph(p) => self.paragraph(p),
            Block::Table(rows) => self.table(rows),
        }
    }

    fn paragraph(&mut self, p: &Paragraph) {
        match p.heading {
            Some(level) if self.preserve_formatting => {
                let size = 32u8.saturating_sub(level.saturating_sub(1) * 4).max(22);
                self.xml.push_str(&format!(
                    r#"<w:p><w:pPr><w:pStyle w:val="Heading{level}"/></w:pPr>{}</w:p>"#,
                    run(&p.text, &format!(r#"<w:b/><w:sz w:val="{size}"/>"#))
                ));
            }
            _ if p.list_item => {
                let indent = if self.preserve_formatting {
                    r#"<w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>"#
                } else {
                    ""
                };
                self.xml.push_str(&format!(
                    "<w:p>{indent}{}</w:p>",
                    run(&format!("\u{2022}\t{}", p.text), "")
                ));
            }
            _ => self
                .xml
                .push_str(&format!("<w:p>{}</w:p>", run(&p.text, ""))),
        }
    }

    fn table(&mut self, rows: &[Vec<String>]) {
        self.xml.push_str(
            r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/><w:tblBorders><w:top w:val="single" w:sz="4"/><w:left w:val="single" w:sz="4"/><w:bottom w:val="single" w:sz="4"/><w:right w:val="single" w:sz="4"/><w:insideH w:val="single" w:sz="4"/><w:insideV w:val="single" w:sz="4"/></w:tblBorders></w:tblPr>"#,
        );
        for row in rows {
            self.xml.push_str("<w:tr>");
            for cell in row {
                self.xml
                    .push_str(&format!("<w:tc><w:p>{}</w:p></w:tc>", run(cell, "")));
            }
            self.xml.push_str("</w:tr>");
        }
        self.xml.push_str("</w:tbl>");
    }

    fn page_break(&mut self) {
        self.xml
            .push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
    }

    fn document_header(&mut self, name: &str) {
        self.xml.push_str(&format!(
            r#"<w:p><w:pPr><w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1"/></w:pBdr></w:pPr>{}</w:p>"#,
            run(name, r#"<w:b/><w:sz w:val="28"/>"#)
        ));
    }

    fn document_footer(&mut self, name: &str) {
        self.xml.push_str(&format!(
            "<w:p>{}</w:p>",
            run(&format!("End of {name}"), r#"<w:i/><w:sz w:val="18"/>"#)
        ));
    }

    fn error_notice(&mut self, name: &str, reason: &str) {
        self.xml.push_str(&format!(
            "<w:p>{}</w:p>",
            run(
                &format!("[Could not merge {name}: {reason}]"),
                r#"<w:b/><w:color w:val="C00000"/>"#
            )
        ));
    }

    fn finish(self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}{SECTION_PROPERTIES}</w:body></w:document>"#,
            self.xml
        )
    }
}

/// One run; tabs and newlines become `<w:tab/>` and `<w:br/>`.
fn run(text: &str, properties: &str) -> String {
    let mut xml = String::from("<w:r>");
    if !properties.is_empty() {
        xml.push_str(&format!("<w:rPr>{properties}</w:rPr>"));
    }
    for (line_index, line) in text.split('\n').enumerate() {
        if line_index > 0 {
            xml.push_str("<w:br/>");
        }
        for (tab_index, segment) in line.split('\t').enumerate() {
            if tab_index > 0 {
                xml.push_str("<w:tab/>");
            }
            if !segment.is_empty() {
                xml.push_str(&format!(
                    r#"<w:t xml:space="preserve">{}</w:t>"#,
                    escape_xml(segment)
                ));
            }
        }
    }
    xml.push_str("</w:r>");
    xml
}

fn write_package(document_xml: &str, metadata: Option<&DocumentMetadata>) -> Result<Vec<u8>> {
    let mut writer = PackageWriter::new();
    writer.add_part("[Content_Types].xml", CONTENT_TYPES)?;
    writer.add_part("_rels/.rels", PACKAGE_RELS)?;
    writer.add_part(DOCUMENT_PART, document_xml)?;
    writer.add_part("word/_rels/document.xml.rels", DOCUMENT_RELS)?;
    let core = core_properties_xml(metadata.unwrap_or(&DocumentMetadata::default()));
    writer.add_part("docProps/core.xml", &core)?;
    writer.finish()
}
