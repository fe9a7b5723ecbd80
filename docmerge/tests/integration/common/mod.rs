//! In-memory fixtures for every supported format.
//!
//! Nothing is read from disk: PDFs are rendered through the conversion
//! bridge and OOXML packages are assembled part by part.

#![allow(dead_code)]

use docmerge::convert::ConversionBridge;
use docmerge::convert::layout::PAGE_BREAK;
use docmerge::ooxml::{PackageWriter, escape_xml};
use docmerge::{FileInput, MergeSession, NoopObserver};

/// A PDF with `pages` pages, each carrying `label` and its page number.
pub fn pdf(label: &str, pages: usize) -> Vec<u8> {
    let text = (1..=pages)
        .map(|n| format!("{label} page {n}"))
        .collect::<Vec<_>>()
        .join(&PAGE_BREAK.to_string());
    ConversionBridge::default()
        .text_to_pdf(&text)
        .expect("render fixture pdf")
        .to_vec()
}

/// Starts like a PDF but cannot be parsed.
pub fn corrupt_pdf() -> Vec<u8> {
    b"%PDF-1.7\n1 0 obj << /Type /Catalog /Pages 2 0 R >>\ntruncated".to_vec()
}

/// A Word document with one paragraph per entry.
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", escape_xml(p)))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut writer = PackageWriter::new();
    writer
        .add_part("[Content_Types].xml", CONTENT_TYPES)
        .expect("content types");
    writer
        .add_part("word/document.xml", &document)
        .expect("document part");
    writer.finish().expect("finish docx")
}

/// A workbook with one sheet per `(name, rows)` entry, cells as inline strings.
pub fn xlsx(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
    let mut writer = PackageWriter::new();
    writer
        .add_part("[Content_Types].xml", CONTENT_TYPES)
        .expect("content types");

    let mut entries = String::new();
    let mut rels = String::new();
    for (index, (name, rows)) in sheets.iter().enumerate() {
        let n = index + 1;
        entries.push_str(&format!(
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            escape_xml(name)
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
        writer
            .add_part(&format!("xl/worksheets/sheet{n}.xml"), &sheet_xml(rows))
            .expect("sheet part");
    }

    writer
        .add_part(
            "xl/workbook.xml",
            &format!(
                r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{entries}</sheets></workbook>"#
            ),
        )
        .expect("workbook part");
    writer
        .add_part(
            "xl/_rels/workbook.xml.rels",
            &format!("<Relationships>{rels}</Relationships>"),
        )
        .expect("workbook rels");
    writer.finish().expect("finish xlsx")
}

fn sheet_xml(rows: &[&[&str]]) -> String {
    let mut data = String::new();
    for (r, row) in rows.iter().enumerate() {
        data.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            let column = char::from(b'A' + c as u8);
            data.push_str(&format!(
                r#"<c r="{column}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                r + 1,
                escape_xml(value)
            ));
        }
        data.push_str("</row>");
    }
    format!(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
    )
}

/// A presentation with one slide per `(title, bullets)` entry.
pub fn pptx(slides: &[(&str, &[&str])]) -> Vec<u8> {
    let mut writer = PackageWriter::new();
    writer
        .add_part("[Content_Types].xml", CONTENT_TYPES)
        .expect("content types");

    let mut ids = String::new();
    let mut rels = String::new();
    for (index, (title, bullets)) in slides.iter().enumerate() {
        let n = index + 1;
        let bullets: String = bullets
            .iter()
            .map(|b| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", escape_xml(b)))
            .collect();
        let slide = format!(
            r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp><p:sp><p:txBody>{bullets}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            escape_xml(title)
        );
        writer
            .add_part(&format!("ppt/slides/slide{n}.xml"), &slide)
            .expect("slide part");
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{n}"/>"#, 255 + n));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="slide" Target="slides/slide{n}.xml"/>"#
        ));
    }

    writer
        .add_part(
            "ppt/presentation.xml",
            &format!(
                r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
            ),
        )
        .expect("presentation part");
    writer
        .add_part(
            "ppt/_rels/presentation.xml.rels",
            &format!("<Relationships>{rels}</Relationships>"),
        )
        .expect("presentation rels");
    writer.finish().expect("finish pptx")
}

/// CSV text from rows.
pub fn csv(rows: &[&[&str]]) -> Vec<u8> {
    let mut out = rows
        .iter()
        .map(|row| row.join(","))
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out.into_bytes()
}

/// Pages in a PDF buffer.
pub fn page_count(data: &[u8]) -> usize {
    lopdf::Document::load_mem(data)
        .expect("load merged pdf")
        .get_pages()
        .len()
}

/// Whether the content stream of page `number` (1-based) contains `needle`.
pub fn page_contains(data: &[u8], number: u32, needle: &str) -> bool {
    let doc = lopdf::Document::load_mem(data).expect("load merged pdf");
    let Some(page_id) = doc.get_pages().get(&number).copied() else {
        return false;
    };
    let content = doc.get_page_content(page_id).unwrap_or_default();
    content
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

/// A session holding `files`, already through the processing pipeline.
pub async fn processed_session(files: Vec<FileInput>) -> MergeSession {
    let mut session = MergeSession::default();
    session.add_files(files).expect("add files");
    session.process_pending(&NoopObserver).await;
    session
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;
