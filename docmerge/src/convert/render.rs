//! Draw laid-out pages into a PDF with lopdf.

use super::layout::{LineStyle, PageLayout, PageLine, encode_winansi, text_width};
use crate::error::Result;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

/// Render `pages` into a standalone PDF.
///
/// Fonts and the media box live on the page-tree root and are inherited by
/// every page. A centered `Page X of N` footer is drawn in the bottom margin.
pub fn render_pages(pages: &[Vec<PageLine>], layout: &PageLayout) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let total = pages.len().max(1);
    let mut kids: Vec<Object> = Vec::with_capacity(total);
    let empty = Vec::new();
    let pages_iter = if pages.is_empty() {
        std::slice::from_ref(&empty)
    } else {
        pages
    };

    for (index, lines) in pages_iter.iter().enumerate() {
        let content = page_content(lines, layout, index + 1, total);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), layout.width.into(), layout.height.into()],
        }),
    );

    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn page_content(lines: &[PageLine], layout: &PageLayout, number: usize, total: usize) -> Content {
    let mut operations = Vec::new();
    let mut baseline = layout.height - layout.margin - layout.font_size;

    for line in lines {
        if !line.text.is_empty() {
            let (font, size) = match line.style {
                LineStyle::Body => ("F1", layout.font_size),
                LineStyle::Title => ("F2", layout.title_size),
            };
            push_text(&mut operations, font, size, layout.margin, baseline, &line.text);
        }
        baseline -= layout.line_height;
    }

    let footer = format!("Page {number} of {total}");
    let x = (layout.width - text_width(&footer, layout.footer_size)) / 2.0;
    push_text(
        &mut operations,
        "F1",
        layout.footer_size,
        x,
        layout.margin / 2.0,
        &footer,
    );

    Content { operations }
}

fn push_text(operations: &mut Vec<Operation>, font: &str, size: f32, x: f32, y: f32, text: &str) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec![font.into(), size.into()]));
    operations.push(Operation::new("Td", vec![x.into(), y.into()]));
    operations.push(Operation::new(
        "Tj",
        vec![Object::String(encode_winansi(text), StringFormat::Literal)],
    ));
    operations.push(Operation::new("ET", vec![]));
}
