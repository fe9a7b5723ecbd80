//! Per-format adapters.
//!
//! Every [`LogicalFormat`] has exactly one [`FormatAdapter`], registered in a
//! static table and looked up with [`adapter_for`]. Adapters are stateless
//! and synchronous; the pipeline decides when to yield between them.
//!
//! # Examples
//!
//! ```
//! use bytes::Bytes;
//! use docmerge::adapters::adapter_for;
//! use docmerge::format::LogicalFormat;
//!
//! let adapter = adapter_for(LogicalFormat::Txt);
//! let metadata = adapter.analyze(&Bytes::from_static(b"two words"));
//! assert_eq!(metadata.word_count, Some(2));
//! ```

pub mod docx;
pub mod pdf;
pub mod pptx;
pub mod text;
pub mod xlsx;

use crate::config::MergeOptions;
use crate::document::{DocumentMetadata, ProcessorResult, SourceDocument};
use crate::error::Result;
use crate::format::LogicalFormat;
use bytes::Bytes;

pub use docx::DocxAdapter;
pub use pdf::PdfAdapter;
pub use pptx::PptxAdapter;
pub use text::TextAdapter;
pub use xlsx::XlsxAdapter;

/// Maximum length of a preview, in characters.
pub const PREVIEW_LIMIT: usize = 600;

/// Analyze, preview, extract and merge one logical format.
pub trait FormatAdapter: Send + Sync {
    /// The format this adapter handles.
    fn format(&self) -> LogicalFormat;

    /// Best-effort metadata. Never fails; fields are left empty on error.
    fn analyze(&self, data: &Bytes) -> DocumentMetadata;

    /// Short human-readable summary, at most [`PREVIEW_LIMIT`] characters.
    fn preview(&self, data: &Bytes) -> String;

    /// All text content.
    fn extract_text(&self, data: &Bytes) -> Result<String>;

    /// Lightweight parse proving the bytes are usable.
    fn validate_structure(&self, data: &Bytes) -> Result<()>;

    /// Merge documents of this format into one output of the same format.
    fn merge_same_format(&self, sources: &[SourceDocument], options: &MergeOptions)
    -> ProcessorResult;

    /// Text handed to the conversion bridge.
    ///
    /// Defaults to [`extract_text`](Self::extract_text); tabular and
    /// structured formats override it.
    fn bridge_text(&self, data: &Bytes) -> Result<String> {
        self.extract_text(data)
    }
}

/// Registry indexed in [`LogicalFormat::ALL`] order.
static REGISTRY: [&dyn FormatAdapter; 6] = [
    &PdfAdapter,
    &DocxAdapter,
    &XlsxAdapter,
    &PptxAdapter,
    &TextAdapter::PLAIN,
    &TextAdapter::CSV,
];

/// The adapter registered for `format`.
pub fn adapter_for(format: LogicalFormat) -> &'static dyn FormatAdapter {
    REGISTRY[format as usize]
}

/// Count whitespace-separated words.
pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Cut `text` to at most [`PREVIEW_LIMIT`] characters, marking the cut.
pub fn bounded_preview(text: &str) -> String {
    let text = text.trim_end();
    if text.chars().count() <= PREVIEW_LIMIT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(PREVIEW_LIMIT - 3).collect();
    cut.push_str("...");
    cut
}
