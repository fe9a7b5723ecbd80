//! PDF adapter.
//!
//! Merging keeps the first readable document as the base and appends the
//! pages of every following document to its page tree. Appended documents
//! are renumbered past the base's highest object id, their inherited page
//! attributes are copied onto the pages themselves, and their own catalog
//! and page-tree nodes are dropped.

use super::{FormatAdapter, bounded_preview, count_words};
use crate::config::{MergeOptions, Quality};
use crate::document::{DocumentMetadata, ProcessorResult, SourceDocument};
use crate::error::{DocMergeError, Result};
use crate::format::LogicalFormat;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, warn};

/// Page attributes a page may inherit from its ancestors.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

/// Guard against cyclic `/Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

/// Adapter for `application/pdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfAdapter;

/// Output of [`merge_pdf_buffers`].
#[derive(Debug, Clone)]
pub struct PdfMergeOutcome {
    /// Serialized PDF.
    pub data: Vec<u8>,
    /// Pages in the output.
    pub page_count: usize,
    /// Inputs that contributed pages.
    pub documents_merged: usize,
    /// Inputs that were skipped, with the reason.
    pub warnings: Vec<String>,
}

impl FormatAdapter for PdfAdapter {
    fn format(&self) -> LogicalFormat {
        LogicalFormat::Pdf
    }

    fn analyze(&self, data: &Bytes) -> DocumentMetadata {
        let doc = match Document::load_mem(data) {
            Ok(doc) => doc,
            Err(err) => {
                debug!(error = %err, "PDF analysis failed");
                return DocumentMetadata::default();
            }
        };

        let mut metadata = DocumentMetadata {
            page_count: Some(doc.get_pages().len() as u32),
            ..Default::default()
        };

        if let Some(info) = info_dictionary(&doc) {
            metadata.title = string_field(info, b"Title");
            metadata.author = string_field(info, b"Author");
            metadata.created_date = string_field(info, b"CreationDate")
                .as_deref()
                .and_then(parse_pdf_date);
            metadata.modified_date = string_field(info, b"ModDate")
                .as_deref()
                .and_then(parse_pdf_date);
        }

        if let Ok(text) = document_text(&doc) {
            metadata.word_count = Some(count_words(&text));
        }

        metadata
    }

    fn preview(&self, data: &Bytes) -> String {
        let doc = match Document::load_mem(data) {
            Ok(doc) => doc,
            Err(_) => return "PDF document (unreadable)".to_string(),
        };

        let pages = doc.get_pages();
        let mut preview = format!("PDF document, {} page(s)", pages.len());

        if let Some(&first) = pages.keys().next()
            && let Ok(text) = doc.extract_text(&[first])
        {
            let lines: Vec<&str> = text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .take(8)
                .collect();
            if !lines.is_empty() {
                preview.push_str("\n\n");
                preview.push_str(&lines.join("\n"));
            }
        }

        bounded_preview(&preview)
    }

    fn extract_text(&self, data: &Bytes) -> Result<String> {
        let doc = load(&SourceDocument::new("document.pdf", data.clone()))?;
        document_text(&doc)
    }

    fn validate_structure(&self, data: &Bytes) -> Result<()> {
        let doc = load(&SourceDocument::new("document.pdf", data.clone()))?;
        if doc.get_pages().is_empty() {
            return Err(DocMergeError::corrupted(
                LogicalFormat::Pdf,
                "document has no pages",
            ));
        }
        Ok(())
    }

    fn merge_same_format(
        &self,
        sources: &[SourceDocument],
        options: &MergeOptions,
    ) -> ProcessorResult {
        match merge_pdf_buffers(sources, options) {
            Ok(outcome) => {
                let metadata = DocumentMetadata {
                    page_count: Some(outcome.page_count as u32),
                    ..Default::default()
                };
                ProcessorResult::ok(outcome.data, LogicalFormat::Pdf)
                    .with_warnings(outcome.warnings)
                    .with_metadata(metadata)
            }
            Err(err) => ProcessorResult::failed(err.to_string()),
        }
    }
}

/// Merge PDF buffers in order.
///
/// Inputs that cannot be loaded (corrupt, encrypted) or have no pages are
/// skipped and reported in [`PdfMergeOutcome::warnings`].
///
/// # Errors
///
/// Fails with [`DocMergeError::MergeFailed`] when no input contributed a
/// page, or when the merged document cannot be written.
pub fn merge_pdf_buffers(
    sources: &[SourceDocument],
    options: &MergeOptions,
) -> Result<PdfMergeOutcome> {
    let mut warnings = Vec::new();
    let mut merged: Option<Document> = None;
    let mut author: Option<String> = None;
    let mut documents_merged = 0;

    for source in sources {
        let doc = match load(source) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(file = %source.name, error = %err, "Skipping unreadable PDF");
                warnings.push(format!("{}: {err}", source.name));
                continue;
            }
        };

        if doc.get_pages().is_empty() {
            warn!(file = %source.name, "Skipping PDF without pages");
            warnings.push(format!("{}: document has no pages", source.name));
            continue;
        }

        if author.is_none() {
            author = info_dictionary(&doc).and_then(|info| string_field(info, b"Author"));
        }

        match merged.as_mut() {
            None => merged = Some(doc),
            Some(base) => match append_document(base, doc) {
                Ok(added) => debug!(file = %source.name, pages = added, "Appended PDF pages"),
                Err(err) => {
                    warn!(file = %source.name, error = %err, "Skipping PDF that could not be appended");
                    warnings.push(format!("{}: {err}", source.name));
                    continue;
                }
            },
        }
        documents_merged += 1;
    }

    let Some(mut doc) = merged else {
        return Err(DocMergeError::merge_failed(
            "no pages could be read from any input PDF",
        ));
    };

    if options.preserve_metadata {
        stamp_metadata(&mut doc, &options.output_name, author.as_deref());
    } else {
        doc.trailer.remove(b"Info");
    }

    match options.quality {
        Quality::High | Quality::Medium => doc.compress(),
        Quality::Low => {
            doc.compress();
            doc.prune_objects();
        }
    }
    doc.renumber_objects();

    let page_count = doc.get_pages().len();
    let mut data = Vec::new();
    doc.save_to(&mut data)?;

    Ok(PdfMergeOutcome {
        data,
        page_count,
        documents_merged,
        warnings,
    })
}

fn load(source: &SourceDocument) -> Result<Document> {
    Document::load_mem(&source.data).map_err(|err| {
        let message = err.to_string();
        let lower = message.to_lowercase();
        if ["decrypt", "password", "encrypt"]
            .iter()
            .any(|k| lower.contains(k))
        {
            DocMergeError::PasswordProtected {
                name: source.name.clone(),
            }
        } else {
            DocMergeError::corrupted(LogicalFormat::Pdf, message)
        }
    })
}

fn document_text(doc: &Document) -> Result<String> {
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages).map_err(|err| {
        DocMergeError::other(format!("text extraction failed on PDF: {err}"))
    })
}

/// Append every page of `doc` to the page tree of `base`.
///
/// `base` is left untouched when this fails.
fn append_document(base: &mut Document, mut doc: Document) -> Result<usize> {
    let root = pages_root(base)?;
    doc.renumber_objects_with(base.max_id + 1);

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for &page_id in &pages {
        flatten_inherited(&mut doc, page_id);
    }

    doc.objects.retain(|_, object| {
        !matches!(object_type(object), Some(b"Catalog") | Some(b"Pages"))
    });
    for &page_id in &pages {
        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            page.set("Parent", Object::Reference(root));
        }
    }

    add_pages_to_tree(base, root, &pages)?;
    base.max_id = base.max_id.max(doc.max_id);
    base.objects.extend(doc.objects);
    Ok(pages.len())
}

/// Copy inherited attributes onto the page so it survives re-parenting.
fn flatten_inherited(doc: &mut Document, page_id: ObjectId) {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return;
    };

    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(parent_id) = parent else { break };
        if missing.is_empty() {
            break;
        }
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                inherited.push((*key, value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key, value);
        }
    }
}

fn pages_root(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| DocMergeError::merge_failed(format!("Failed to get pages reference: {e}")))
}

/// Add page references to the root `Pages` node and update its count.
fn add_pages_to_tree(doc: &mut Document, root: ObjectId, page_ids: &[ObjectId]) -> Result<()> {
    let pages = doc
        .get_dictionary_mut(root)
        .map_err(|e| DocMergeError::merge_failed(format!("Failed to get pages object: {e}")))?;

    match pages.get_mut(b"Kids") {
        Ok(Object::Array(kids)) => {
            kids.extend(page_ids.iter().map(|&id| Object::Reference(id)));
        }
        _ => return Err(DocMergeError::merge_failed("Kids is not an array")),
    }

    let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    pages.set("Count", Object::Integer(count + page_ids.len() as i64));
    Ok(())
}

fn object_type(object: &Object) -> Option<&[u8]> {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return None,
    };
    dict.get(b"Type").and_then(Object::as_name).ok()
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Decode a text string from the Info dictionary (UTF-16BE with BOM, or
/// single-byte).
fn string_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let Ok(Object::String(raw, _)) = dict.get(key) else {
        return None;
    };

    let text = if let Some(utf16) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        match std::str::from_utf8(raw) {
            Ok(s) => s.to_string(),
            Err(_) => raw.iter().map(|&b| b as char).collect(),
        }
    };

    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Parse `D:YYYYMMDDHHmmSS`, ignoring the timezone suffix.
fn parse_pdf_date(value: &str) -> Option<DateTime<Utc>> {
    let digits: String = value
        .trim()
        .trim_start_matches("D:")
        .chars()
        .take_while(char::is_ascii_digit)
        .take(14)
        .collect();
    if digits.len() < 4 {
        return None;
    }

    const DEFAULTS: &str = "00000101000000";
    let padded = format!("{digits}{}", &DEFAULTS[digits.len()..]);
    NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn format_pdf_date(date: DateTime<Utc>) -> String {
    date.format("D:%Y%m%d%H%M%SZ").to_string()
}

fn stamp_metadata(doc: &mut Document, title: &str, author: Option<&str>) {
    let now = format_pdf_date(Utc::now());
    let mut info = Dictionary::new();
    info.set("Title", Object::string_literal(title));
    if let Some(author) = author {
        info.set("Author", Object::string_literal(author));
    }
    info.set(
        "Creator",
        Object::String(b"docmerge".to_vec(), StringFormat::Literal),
    );
    info.set(
        "Producer",
        Object::String(b"docmerge".to_vec(), StringFormat::Literal),
    );
    info.set("CreationDate", Object::string_literal(now.as_str()));
    info.set("ModDate", Object::string_literal(now.as_str()));

    let info_id = doc.add_object(info);
    doc.trailer.set("Info", Object::Reference(info_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::layout::{PageLayout, PageLine};
    use crate::convert::render::render_pages;
    use rstest::rstest;

    fn pdf_with_pages(texts: &[&str]) -> Bytes {
        let layout = PageLayout::default();
        let pages: Vec<Vec<PageLine>> = texts
            .iter()
            .map(|t| vec![PageLine::body(*t)])
            .collect();
        Bytes::from(render_pages(&pages, &layout).unwrap())
    }

    #[test]
    fn test_analyze_counts_pages() {
        let data = pdf_with_pages(&["one", "two", "three"]);
        let metadata = PdfAdapter.analyze(&data);
        assert_eq!(metadata.page_count, Some(3));
    }

    #[test]
    fn test_analyze_garbage_is_empty() {
        let metadata = PdfAdapter.analyze(&Bytes::from_static(b"%PDF-1.4 garbage"));
        assert_eq!(metadata, DocumentMetadata::default());
    }

    #[test]
    fn test_merge_preserves_page_count_and_order() {
        let a = SourceDocument::new("a.pdf", pdf_with_pages(&["alpha one", "alpha two"]));
        let b = SourceDocument::new("b.pdf", pdf_with_pages(&["bravo"]));

        let outcome = merge_pdf_buffers(&[a, b], &MergeOptions::default()).unwrap();
        assert_eq!(outcome.page_count, 3);
        assert_eq!(outcome.documents_merged, 2);
        assert!(outcome.warnings.is_empty());

        let merged = Document::load_mem(&outcome.data).unwrap();
        let pages: Vec<u32> = merged.get_pages().keys().copied().collect();
        let first = merged.extract_text(&[pages[0]]).unwrap();
        let last = merged.extract_text(&[pages[2]]).unwrap();
        assert!(first.contains("alpha"));
        assert!(last.contains("bravo"));
    }

    #[test]
    fn test_merge_skips_corrupt_inputs() {
        let good = SourceDocument::new("good.pdf", pdf_with_pages(&["ok"]));
        let bad = SourceDocument::new("bad.pdf", Bytes::from_static(b"%PDF-1.7 broken"));

        let result = PdfAdapter.merge_same_format(&[bad, good], &MergeOptions::default());
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("bad.pdf"));
        assert_eq!(result.metadata.unwrap().page_count, Some(1));
    }

    /// A PDF whose root page node holds `Kids` behind a reference.
    fn pdf_with_indirect_kids(text: &str) -> Bytes {
        let mut doc = Document::load_mem(&pdf_with_pages(&[text])).unwrap();
        let root = pages_root(&doc).unwrap();
        let kids = doc
            .get_dictionary(root)
            .and_then(|pages| pages.get(b"Kids"))
            .cloned()
            .unwrap();
        let kids_id = doc.add_object(kids);
        doc.get_dictionary_mut(root)
            .unwrap()
            .set("Kids", Object::Reference(kids_id));
        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        Bytes::from(data)
    }

    #[test]
    fn test_merge_skips_inputs_that_cannot_be_appended() {
        let base = SourceDocument::new("base.pdf", pdf_with_indirect_kids("base"));
        let extra = SourceDocument::new("extra.pdf", pdf_with_pages(&["extra"]));

        let outcome = merge_pdf_buffers(&[base, extra], &MergeOptions::default()).unwrap();
        assert_eq!(outcome.documents_merged, 1);
        assert_eq!(outcome.page_count, 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("extra.pdf"));

        let merged = Document::load_mem(&outcome.data).unwrap();
        let pages: Vec<u32> = merged.get_pages().keys().copied().collect();
        assert!(merged.extract_text(&pages).unwrap().contains("base"));
    }

    #[test]
    fn test_merge_fails_without_pages() {
        let bad = SourceDocument::new("bad.pdf", Bytes::from_static(b"nope"));
        let result = PdfAdapter.merge_same_format(&[bad], &MergeOptions::default());
        assert!(!result.success);
        assert!(result.error.unwrap().contains("no pages"));
    }

    #[test]
    fn test_metadata_only_when_requested() {
        let src = SourceDocument::new("a.pdf", pdf_with_pages(&["x"]));
        let options = MergeOptions {
            output_name: "Quarterly".to_string(),
            ..Default::default()
        };
        let outcome = merge_pdf_buffers(std::slice::from_ref(&src), &options).unwrap();
        let metadata = PdfAdapter.analyze(&Bytes::from(outcome.data));
        assert_eq!(metadata.title.as_deref(), Some("Quarterly"));
        assert!(metadata.created_date.is_some());

        let options = MergeOptions {
            preserve_metadata: false,
            ..Default::default()
        };
        let outcome = merge_pdf_buffers(&[src], &options).unwrap();
        let metadata = PdfAdapter.analyze(&Bytes::from(outcome.data));
        assert!(metadata.title.is_none());
    }

    #[rstest]
    #[case(Quality::Low)]
    #[case(Quality::Medium)]
    #[case(Quality::High)]
    fn test_every_quality_produces_valid_pdf(#[case] quality: Quality) {
        let src = SourceDocument::new("a.pdf", pdf_with_pages(&["x", "y"]));
        let options = MergeOptions {
            quality,
            ..Default::default()
        };
        let outcome = merge_pdf_buffers(&[src.clone(), src], &options).unwrap();
        assert!(outcome.data.starts_with(b"%PDF-"));
        assert_eq!(outcome.page_count, 4);
    }

    #[rstest]
    #[case("D:20240315093000Z", "2024-03-15T09:30:00Z")]
    #[case("D:20240315", "2024-03-15T00:00:00Z")]
    #[case("D:2024", "2024-01-01T00:00:00Z")]
    fn test_parse_pdf_date(#[case] raw: &str, #[case] expected: &str) {
        let parsed = parse_pdf_date(raw).unwrap();
        assert_eq!(parsed.to_rfc3339_opts(chrono::SecondsFormat::Secs, true), expected);
    }

    #[test]
    fn test_parse_pdf_date_rejects_garbage() {
        assert!(parse_pdf_date("yesterday").is_none());
    }

    #[test]
    fn test_validate_structure() {
        assert!(PdfAdapter.validate_structure(&pdf_with_pages(&["x"])).is_ok());
        let err = PdfAdapter
            .validate_structure(&Bytes::from_static(b"%PDF-1.4\n%%EOF"))
            .unwrap_err();
        assert!(matches!(
            err,
            DocMergeError::Corrupted { .. } | DocMergeError::PasswordProtected { .. }
        ));
    }
}
