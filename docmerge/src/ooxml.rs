//! Shared helpers for OOXML packages (Word, Excel, PowerPoint).
//!
//! An OOXML file is a zip archive of XML parts. Reading goes through
//! [`Package`]; writing goes through [`PackageWriter`]. The XML helpers here
//! deal with the parts of quick-xml's event model every adapter needs: local
//! names, attributes, text and entity references.

use crate::document::DocumentMetadata;
use crate::error::{DocMergeError, Result};
use crate::format::LogicalFormat;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

/// A read-only OOXML package.
pub struct Package {
    archive: ZipArchive<Cursor<Bytes>>,
    format: LogicalFormat,
}

impl Package {
    /// Open the zip container.
    ///
    /// # Errors
    ///
    /// Returns [`DocMergeError::Corrupted`] if the bytes are not a zip archive.
    pub fn open(data: &Bytes, format: LogicalFormat) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(data.clone()))
            .map_err(|err| DocMergeError::corrupted(format, format!("invalid zip: {err}")))?;
        Ok(Self { archive, format })
    }

    /// Format the package was opened as.
    pub fn format(&self) -> LogicalFormat {
        self.format
    }

    /// Read a part as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`DocMergeError::Corrupted`] if the part is missing or
    /// unreadable.
    pub fn read_part(&mut self, path: &str) -> Result<String> {
        self.read_optional(path)?.ok_or_else(|| {
            DocMergeError::corrupted(self.format, format!("missing part {path}"))
        })
    }

    /// Read a part that may legitimately be absent.
    pub fn read_optional(&mut self, path: &str) -> Result<Option<String>> {
        let mut file = match self.archive.by_name(path) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(err) => {
                return Err(DocMergeError::corrupted(
                    self.format,
                    format!("unreadable part {path}: {err}"),
                ));
            }
        };

        let mut raw = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut raw).map_err(|err| {
            DocMergeError::corrupted(self.format, format!("unreadable part {path}: {err}"))
        })?;
        Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
    }

    /// Whether the package contains `path`.
    pub fn has_part(&self, path: &str) -> bool {
        self.archive.index_for_name(path).is_some()
    }

    /// Names of every part.
    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Fill title, author and dates from `docProps/core.xml`.
    pub fn read_core_properties(&mut self, metadata: &mut DocumentMetadata) -> Result<()> {
        if let Some(xml) = self.read_optional("docProps/core.xml")? {
            parse_core_properties(&xml, metadata)?;
        }
        Ok(())
    }

    /// Counts from `docProps/app.xml`.
    pub fn read_app_properties(&mut self) -> Result<AppProperties> {
        match self.read_optional("docProps/app.xml")? {
            Some(xml) => parse_app_properties(&xml),
            None => Ok(AppProperties::default()),
        }
    }

    /// Relationships of `part`, keyed by relationship id, with targets
    /// resolved to package paths.
    pub fn relationships(&mut self, part: &str) -> Result<HashMap<String, String>> {
        let (dir, file) = match part.rsplit_once('/') {
            Some((dir, file)) => (dir, file),
            None => ("", part),
        };
        let rels_path = if dir.is_empty() {
            format!("_rels/{file}.rels")
        } else {
            format!("{dir}/_rels/{file}.rels")
        };

        let Some(xml) = self.read_optional(&rels_path)? else {
            return Ok(HashMap::new());
        };

        let mut rels = HashMap::new();
        let mut reader = Reader::from_str(&xml);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    if let (Some(id), Some(target)) = (attr(e, "Id"), attr(e, "Target")) {
                        rels.insert(id, resolve_target(dir, &target));
                    }
                }
                Ok(Event::Eof) => break,
                Err(err) => return Err(xml_error(self.format, &rels_path, err)),
                _ => {}
            }
            buf.clear();
        }
        Ok(rels)
    }
}

/// Counts reported by `docProps/app.xml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppProperties {
    /// `<Pages>`.
    pub pages: Option<u32>,
    /// `<Words>`.
    pub words: Option<u64>,
    /// `<Slides>`.
    pub slides: Option<u32>,
}

/// Resolve a relationship target against the directory of its source part.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Strip a namespace prefix from a qualified name.
pub fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().rposition(|&b| b == b':') {
        Some(pos) => &qname[pos + 1..],
        None => qname,
    }
}

/// Value of the attribute whose qualified name is `key`, entities decoded.
pub fn attr(element: &BytesStart, key: &str) -> Option<String> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key.as_bytes())
        .map(|a| decode_entities(&String::from_utf8_lossy(&a.value)))
}

/// Text carried by a text, CDATA or entity-reference event.
pub fn event_text(event: &Event) -> Option<String> {
    match event {
        Event::Text(t) => Some(decode_entities(&String::from_utf8_lossy(t))),
        Event::CData(t) => Some(String::from_utf8_lossy(t).into_owned()),
        Event::GeneralRef(r) => {
            let name = String::from_utf8_lossy(r);
            Some(
                resolve_entity(&name)
                    .map(String::from)
                    .unwrap_or_else(|| format!("&{name};")),
            )
        }
        _ => None,
    }
}

/// Resolve a predefined or numeric entity name (without `&` and `;`).
pub fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Replace entity references in `raw`; unknown references are kept.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        match tail.find(';') {
            Some(end) if end <= 10 => match resolve_entity(&tail[..end]) {
                Some(ch) => {
                    out.push(ch);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = tail;
                }
            },
            _ => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape text for element content or attribute values, dropping characters
/// XML 1.0 cannot carry.
pub fn escape_xml(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= '\u{20}')
        .filter(|&c| c != '\u{FFFE}' && c != '\u{FFFF}')
        .collect();
    quick_xml::escape::escape(&cleaned).into_owned()
}

pub(crate) fn xml_error(format: LogicalFormat, part: &str, err: quick_xml::Error) -> DocMergeError {
    DocMergeError::corrupted(format, format!("malformed XML in {part}: {err}"))
}

/// Parse `docProps/core.xml`.
pub fn parse_core_properties(xml: &str, metadata: &mut DocumentMetadata) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    let mut text = String::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) => {
                current = Some(local_name(e.name().as_ref()).to_vec());
                text.clear();
            }
            Event::End(_) => {
                if let Some(name) = current.take() {
                    let value = text.trim();
                    if !value.is_empty() {
                        match name.as_slice() {
                            b"title" => metadata.title = Some(value.to_string()),
                            b"creator" => metadata.author = Some(value.to_string()),
                            b"created" => metadata.created_date = parse_w3c_date(value),
                            b"modified" => metadata.modified_date = parse_w3c_date(value),
                            _ => {}
                        }
                    }
                }
                text.clear();
            }
            Event::Eof => break,
            ref other => {
                if current.is_some()
                    && let Some(t) = event_text(other)
                {
                    text.push_str(&t);
                }
            }
        }
        buf.clear();
    }
    Ok(())
}

/// Parse `docProps/app.xml`.
pub fn parse_app_properties(xml: &str) -> Result<AppProperties> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    let mut props = AppProperties::default();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) => current = Some(local_name(e.name().as_ref()).to_vec()),
            Event::End(_) => current = None,
            Event::Text(ref t) => {
                let value = String::from_utf8_lossy(t);
                let value = value.trim();
                match current.as_deref() {
                    Some(b"Pages") => props.pages = value.parse().ok(),
                    Some(b"Words") => props.words = value.parse().ok(),
                    Some(b"Slides") => props.slides = value.parse().ok(),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(props)
}

fn parse_w3c_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// `docProps/core.xml` for a generated package.
pub fn core_properties_xml(metadata: &DocumentMetadata) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    );
    if let Some(title) = &metadata.title {
        xml.push_str(&format!("<dc:title>{}</dc:title>", escape_xml(title)));
    }
    if let Some(author) = &metadata.author {
        xml.push_str(&format!("<dc:creator>{}</dc:creator>", escape_xml(author)));
    }
    for (tag, date) in [
        ("created", metadata.created_date),
        ("modified", metadata.modified_date),
    ] {
        if let Some(date) = date {
            xml.push_str(&format!(
                r#"<dcterms:{tag} xsi:type="dcterms:W3CDTF">{}</dcterms:{tag}>"#,
                date.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
    }
    xml.push_str("</cp:coreProperties>");
    xml
}

/// Writes a zip package to memory.
pub struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl PackageWriter {
    /// Empty package.
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Add a deflated part.
    pub fn add_part(&mut self, path: &str, content: &str) -> Result<()> {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        self.zip.start_file(path, options)?;
        self.zip.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Finish the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.zip.finish()?;
        Ok(cursor.into_inner())
    }
}

impl Default for PackageWriter {
    fn default() -> Self {
        Self::new()
    }
}
