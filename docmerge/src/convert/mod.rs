//! Conversion bridge: any supported document to PDF.
//!
//! Used when a merge spans several formats, or several Word documents. Each
//! non-PDF document is reduced to best-effort plain text by its adapter,
//! sanitized, wrapped, paginated and drawn with a standard font. PDF sources
//! are passed through untouched so their original pages are kept.

pub mod layout;
pub mod render;

pub use layout::{PageLayout, PageLine};

use crate::adapters::adapter_for;
use crate::document::SourceDocument;
use crate::error::Result;
use crate::format::LogicalFormat;
use bytes::Bytes;
use layout::{TITLE_MAX_CHARS, layout_text};
use render::render_pages;

/// Widest column in a text grid, in characters.
const GRID_MAX_COLUMN: usize = 40;

/// Converts documents into standalone PDFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionBridge {
    layout: PageLayout,
}

impl ConversionBridge {
    /// Bridge with a custom page layout.
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }

    /// Layout in use.
    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Convert one document to PDF.
    ///
    /// With `include_headers`, the document's upper-cased name is drawn as
    /// a title above its content.
    ///
    /// # Errors
    ///
    /// Fails when the adapter cannot extract text or the PDF cannot be
    /// written.
    pub fn to_pdf(
        &self,
        source: &SourceDocument,
        format: LogicalFormat,
        include_headers: bool,
    ) -> Result<Bytes> {
        if format == LogicalFormat::Pdf {
            return Ok(source.data.clone());
        }

        let body = adapter_for(format).bridge_text(&source.data)?;
        let text = if include_headers {
            format!("{}\n\n{body}", heading_for(&source.name))
        } else {
            body
        };
        self.text_to_pdf(&text)
    }

    /// Lay out and render arbitrary text.
    pub fn text_to_pdf(&self, text: &str) -> Result<Bytes> {
        let pages = layout_text(text, &self.layout);
        Ok(Bytes::from(render_pages(&pages, &self.layout)?))
    }

    /// A page explaining why `name` could not be converted.
    pub fn placeholder(&self, name: &str, reason: &str) -> Result<Bytes> {
        self.text_to_pdf(&format!(
            "CONVERSION FAILED\n\n{name} could not be converted to PDF.\n\n{reason}"
        ))
    }
}

/// Upper-cased document name, short enough to render as a title.
pub fn heading_for(name: &str) -> String {
    name.to_uppercase().chars().take(TITLE_MAX_CHARS).collect()
}

/// Render rows as a fixed-width text grid with a rule under the first row.
///
/// # Examples
///
/// ```
/// use docmerge::convert::text_grid;
///
/// let rows = vec![
///     vec!["name".to_string(), "qty".to_string()],
///     vec!["apple".to_string(), "3".to_string()],
/// ];
/// assert_eq!(text_grid(&rows), "name  | qty\n------+----\napple | 3");
/// ```
pub fn text_grid(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let mut widths = vec![0usize; columns];
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.chars().count().min(GRID_MAX_COLUMN));
        }
    }

    let format_row = |row: &[String]| -> String {
        let used = row
            .iter()
            .rposition(|cell| !cell.trim().is_empty())
            .map_or(0, |last| last + 1);
        let cells: Vec<String> = (0..used)
            .map(|index| {
                let cell = row.get(index).map(String::as_str).unwrap_or("");
                let cell: String = cell.chars().take(GRID_MAX_COLUMN).collect();
                format!("{cell:<width$}", width = widths[index])
            })
            .collect();
        cells.join(" | ").trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (index, row) in rows.iter().enumerate() {
        lines.push(format_row(row));
        if index == 0 {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            lines.push(rule.join("-+-"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Document;

    #[test]
    fn test_pdf_passes_through() {
        let data = Bytes::from_static(b"%PDF-1.7 original bytes");
        let source = SourceDocument::new("a.pdf", data.clone());
        let out = ConversionBridge::default()
            .to_pdf(&source, LogicalFormat::Pdf, true)
            .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_text_with_header_becomes_pdf() {
        let source = SourceDocument::new("notes.txt", Bytes::from_static(b"hello world"));
        let out = ConversionBridge::default()
            .to_pdf(&source, LogicalFormat::Txt, true)
            .unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("NOTES.TXT"));
        assert!(text.contains("hello world"));
    }

    #[test]
    fn test_placeholder_names_document() {
        let out = ConversionBridge::default()
            .placeholder("deck.pptx", "bad zip")
            .unwrap();
        let doc = Document::load_mem(&out).unwrap();
        assert!(doc.extract_text(&[1]).unwrap().contains("deck.pptx"));
    }

    #[test]
    fn test_heading_is_bounded() {
        let heading = heading_for(&format!("{}.txt", "a".repeat(80)));
        assert_eq!(heading.chars().count(), TITLE_MAX_CHARS);
        assert!(layout::is_title(&heading));
    }

    #[test]
    fn test_grid_pads_ragged_rows() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["long cell".to_string()],
        ];
        let grid = text_grid(&rows);
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "a         | b | c");
        assert_eq!(lines[1], "----------+---+--");
        assert_eq!(lines[2], "long cell");
    }

    #[test]
    fn test_grid_of_nothing() {
        assert_eq!(text_grid(&[]), "");
    }
}
