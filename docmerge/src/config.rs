//! Configuration for merge jobs.
//!
//! [`MergeOptions`] is captured once per job and never mutated afterwards.
//! [`ProcessingLimits`] and [`ChunkConfig`] hold the batch limits and the
//! chunked-processing knobs shared by every job of a session.

use crate::document::DocumentId;
use crate::error::{DocMergeError, Result};
use crate::format::LogicalFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Default per-file size limit (50 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default number of files accepted in one batch.
pub const DEFAULT_MAX_FILES: usize = 100;

/// How the merge order is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Follow the document list order.
    #[default]
    Sequential,
    /// Follow [`MergeOptions::custom_order`].
    Custom,
}

impl FromStr for MergeMode {
    type Err = DocMergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "custom" => Ok(Self::Custom),
            _ => Err(DocMergeError::invalid_options(format!(
                "Invalid merge mode: {s}. Must be one of: sequential, custom"
            ))),
        }
    }
}

/// Output quality, mapped to PDF stream compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Compress streams and drop unreferenced objects.
    Low,
    /// Compress streams.
    Medium,
    /// Compress streams, keep every object.
    #[default]
    High,
}

impl FromStr for Quality {
    type Err = DocMergeError;

    /// Parse quality from string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `low`, `medium` or `high`.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(DocMergeError::invalid_options(format!(
                "Invalid quality: {s}. Must be one of: low, medium, high"
            ))),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Separator placed between documents in a plain-text merge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "text")]
pub enum TextSeparator {
    /// A horizontal rule: blank line, `---`, blank line.
    #[default]
    Default,
    /// A form feed; the conversion bridge starts a new page there.
    PageBreak,
    /// A banner line naming the next file.
    FileHeader,
    /// Caller-provided text.
    Custom(String),
}

impl TextSeparator {
    /// Form feed character used as the page-break marker.
    pub const PAGE_BREAK: char = '\u{000C}';

    /// Text inserted before the document called `next_name`.
    pub fn render(&self, next_name: &str) -> String {
        match self {
            Self::Default => "\n\n---\n\n".to_string(),
            Self::PageBreak => format!("\n{}\n", Self::PAGE_BREAK),
            Self::FileHeader => format!("\n\n===== {next_name} =====\n\n"),
            Self::Custom(text) => text.clone(),
        }
    }
}

impl FromStr for TextSeparator {
    type Err = DocMergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "default" | "rule" => Ok(Self::Default),
            "page-break" | "pagebreak" => Ok(Self::PageBreak),
            "file-header" | "header" => Ok(Self::FileHeader),
            _ => Ok(Self::Custom(s.replace("\\n", "\n"))),
        }
    }
}

/// Options captured when a merge job is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOptions {
    /// Ordering mode.
    pub mode: MergeMode,
    /// Requested output format; `None` lets the orchestrator decide.
    pub output_format: Option<LogicalFormat>,
    /// Output file name without extension.
    pub output_name: String,
    /// Copy title, author and dates into the output.
    pub preserve_metadata: bool,
    /// Keep heading styles in Word output.
    pub preserve_formatting: bool,
    /// Output quality.
    pub quality: Quality,
    /// Start every document on a new page.
    pub page_breaks: bool,
    /// Insert a header naming each source document.
    pub include_headers: bool,
    /// Insert a footer after each source document.
    pub include_footers: bool,
    /// Explicit document order for [`MergeMode::Custom`].
    pub custom_order: Option<Vec<DocumentId>>,
    /// Separator between plain-text documents.
    pub separator: TextSeparator,
    /// Keep only the first CSV header row when headers are included.
    pub skip_duplicate_headers: bool,
    /// Keep spreadsheet formulas instead of cached values.
    pub preserve_formulas: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            mode: MergeMode::Sequential,
            output_format: None,
            output_name: "merged".to_string(),
            preserve_metadata: true,
            preserve_formatting: true,
            quality: Quality::High,
            page_breaks: true,
            include_headers: false,
            include_footers: false,
            custom_order: None,
            separator: TextSeparator::Default,
            skip_duplicate_headers: true,
            preserve_formulas: false,
        }
    }
}

impl MergeOptions {
    /// Validate option combinations.
    ///
    /// # Errors
    ///
    /// Returns [`DocMergeError::InvalidOptions`] when the output name is
    /// blank, `Custom` mode has no order, or the order repeats an id.
    pub fn validate(&self) -> Result<()> {
        if self.output_name.trim().is_empty() {
            return Err(DocMergeError::invalid_options("Output name cannot be empty"));
        }

        if self
            .output_name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\0'))
        {
            return Err(DocMergeError::invalid_options(format!(
                "Output name contains a path separator: {}",
                self.output_name
            )));
        }

        match (&self.mode, &self.custom_order) {
            (MergeMode::Custom, None) => {
                return Err(DocMergeError::invalid_options(
                    "Custom merge mode requires an explicit document order",
                ));
            }
            (_, Some(order)) => {
                let mut seen = HashSet::with_capacity(order.len());
                if let Some(dup) = order.iter().find(|id| !seen.insert(**id)) {
                    return Err(DocMergeError::invalid_options(format!(
                        "Document {dup} appears more than once in the custom order"
                    )));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Check that a custom order only names known documents.
    pub fn validate_order(&self, known: &[DocumentId]) -> Result<()> {
        if let Some(order) = &self.custom_order
            && let Some(missing) = order.iter().find(|id| !known.contains(id))
        {
            return Err(DocMergeError::invalid_options(format!(
                "Custom order references unknown document {missing}"
            )));
        }
        Ok(())
    }

    /// Output file name including the extension for `format`.
    pub fn file_name_for(&self, format: LogicalFormat) -> String {
        let base = self.output_name.trim();
        let ext = format.extension();
        let suffix = format!(".{ext}");
        if base.to_lowercase().ends_with(&suffix) {
            base.to_string()
        } else {
            format!("{base}{suffix}")
        }
    }
}

/// Batch limits enforced at upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingLimits {
    /// Maximum size of one file in bytes.
    pub max_file_size: u64,
    /// Maximum number of files in one batch.
    pub max_files: usize,
}

impl Default for ProcessingLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

/// Chunked processing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkConfig {
    /// Slice size in bytes.
    pub chunk_size: usize,
    /// Slices processed at the same time.
    pub max_concurrent_chunks: usize,
    /// Whole files processed at the same time.
    pub max_concurrent_files: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5 * 1024 * 1024,
            max_concurrent_chunks: 3,
            max_concurrent_files: 2,
        }
    }
}

impl ChunkConfig {
    /// Reject zero-sized settings.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DocMergeError::invalid_options("Chunk size must be positive"));
        }
        if self.max_concurrent_chunks == 0 || self.max_concurrent_files == 0 {
            return Err(DocMergeError::invalid_options(
                "Concurrency limits must be at least 1",
            ));
        }
        Ok(())
    }
}
