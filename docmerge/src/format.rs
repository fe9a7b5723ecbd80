//! Format detection and upload validation.
//!
//! Detection trusts the declared MIME type first and the file extension
//! second; content is only inspected by [`FormatValidator::validate_structure`],
//! which checks the magic signature and then asks the format's adapter for a
//! lightweight parse.

use crate::adapters;
use crate::chunk::ChunkProcessor;
use crate::config::ProcessingLimits;
use crate::error::{DocMergeError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// PDF header bytes.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// ZIP local file header, shared by every OOXML package.
pub const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];

/// The closed set of formats the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalFormat {
    /// Portable Document Format.
    Pdf,
    /// Word (OOXML).
    Docx,
    /// Excel (OOXML).
    Xlsx,
    /// PowerPoint (OOXML).
    Pptx,
    /// Plain text.
    Txt,
    /// Comma-separated values.
    Csv,
}

impl LogicalFormat {
    /// Every format, in registry order.
    pub const ALL: [LogicalFormat; 6] = [
        Self::Pdf,
        Self::Docx,
        Self::Xlsx,
        Self::Pptx,
        Self::Txt,
        Self::Csv,
    ];

    /// Canonical media type.
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Txt => "text/plain",
            Self::Csv => "text/csv",
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::Pptx => "pptx",
            Self::Txt => "txt",
            Self::Csv => "csv",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word",
            Self::Xlsx => "Excel",
            Self::Pptx => "PowerPoint",
            Self::Txt => "Text",
            Self::Csv => "CSV",
        }
    }

    /// Look up a declared MIME type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.split(';').next().unwrap_or_default().trim();
        let mime = mime.to_ascii_lowercase();
        match mime.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(Self::Xlsx)
            }
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Some(Self::Pptx)
            }
            "text/plain" => Some(Self::Txt),
            "text/csv" | "application/csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Look up the extension of a file name, case-insensitively.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        ext.parse().ok()
    }

    /// Whether the format is an OOXML zip package.
    pub fn is_ooxml(&self) -> bool {
        matches!(self, Self::Docx | Self::Xlsx | Self::Pptx)
    }

    /// Whether the format is rendered as a grid by the conversion bridge.
    pub fn is_tabular(&self) -> bool {
        matches!(self, Self::Xlsx | Self::Csv)
    }

    /// Magic signature, if the format has one.
    pub fn magic(&self) -> Option<&'static [u8]> {
        match self {
            Self::Pdf => Some(PDF_MAGIC),
            Self::Docx | Self::Xlsx | Self::Pptx => Some(ZIP_MAGIC),
            Self::Txt | Self::Csv => None,
        }
    }
}

impl FromStr for LogicalFormat {
    type Err = DocMergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "xlsx" => Ok(Self::Xlsx),
            "pptx" => Ok(Self::Pptx),
            "txt" => Ok(Self::Txt),
            "csv" => Ok(Self::Csv),
            _ => Err(DocMergeError::unsupported_format(s)),
        }
    }
}

impl fmt::Display for LogicalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A file handed to the engine by the upload layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    /// File name as the user sees it.
    pub name: String,
    /// Declared MIME type, possibly empty.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// File content.
    pub data: Bytes,
}

impl FileInput {
    /// Create an input; the size is taken from the data.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: data.len() as u64,
            data,
        }
    }

    /// Create an input with no declared MIME type.
    pub fn from_name(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(name, "", data)
    }
}

/// Upload-time format checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatValidator {
    limits: ProcessingLimits,
}

impl FormatValidator {
    /// Create a validator with the given limits.
    pub fn new(limits: ProcessingLimits) -> Self {
        Self { limits }
    }

    /// Limits in effect.
    pub fn limits(&self) -> &ProcessingLimits {
        &self.limits
    }

    /// Detect the logical format from the declared MIME type, then the
    /// extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use docmerge::format::{FileInput, FormatValidator, LogicalFormat};
    ///
    /// let file = FileInput::from_name("REPORT.PDF", b"%PDF-1.7".to_vec());
    /// assert_eq!(FormatValidator::default().detect(&file), Some(LogicalFormat::Pdf));
    /// ```
    pub fn detect(&self, file: &FileInput) -> Option<LogicalFormat> {
        LogicalFormat::from_mime(&file.mime_type)
            .or_else(|| LogicalFormat::from_file_name(&file.name))
    }

    /// Size, emptiness and format checks. Does not look at the content.
    ///
    /// # Errors
    ///
    /// - [`DocMergeError::FileTooLarge`] above the size limit
    /// - [`DocMergeError::EmptyFile`] for zero bytes
    /// - [`DocMergeError::UnsupportedFormat`] when nothing is detected
    pub fn validate(&self, file: &FileInput) -> Result<LogicalFormat> {
        if file.size > self.limits.max_file_size {
            return Err(DocMergeError::file_too_large(
                &file.name,
                file.size,
                self.limits.max_file_size,
            ));
        }

        if file.size == 0 || file.data.is_empty() {
            return Err(DocMergeError::empty_file(&file.name));
        }

        self.detect(file)
            .ok_or_else(|| DocMergeError::unsupported_format(&file.name))
    }

    /// Check the batch size against the file-count limit.
    pub fn validate_batch(&self, existing: usize, incoming: usize) -> Result<()> {
        let count = existing + incoming;
        if count > self.limits.max_files {
            return Err(DocMergeError::TooManyFiles {
                count,
                limit: self.limits.max_files,
            });
        }
        Ok(())
    }

    /// Magic-signature check followed by a lightweight parse.
    ///
    /// # Errors
    ///
    /// Returns [`DocMergeError::Corrupted`] on a bad signature or parse
    /// failure, or [`DocMergeError::PasswordProtected`] for encrypted PDFs.
    pub fn validate_structure(&self, data: &Bytes, format: LogicalFormat) -> Result<()> {
        if let Some(magic) = format.magic() {
            let chunks = ChunkProcessor::default();
            let outcome = chunks.validate_chunks(data, |chunk, is_first, _is_last| {
                !is_first || chunk.starts_with(magic)
            });
            if !outcome.valid {
                return Err(DocMergeError::corrupted(
                    format,
                    format!(
                        "invalid file header: missing signature (chunk {})",
                        outcome.failed_chunk.unwrap_or(1)
                    ),
                ));
            }
        }

        adapters::adapter_for(format).validate_structure(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("application/pdf", Some(LogicalFormat::Pdf))]
    #[case("text/csv", Some(LogicalFormat::Csv))]
    #[case("application/csv", Some(LogicalFormat::Csv))]
    #[case("text/plain; charset=utf-8", Some(LogicalFormat::Txt))]
    #[case(
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        Some(LogicalFormat::Pptx)
    )]
    #[case("image/png", None)]
    #[case("", None)]
    fn test_from_mime(#[case] mime: &str, #[case] expected: Option<LogicalFormat>) {
        assert_eq!(LogicalFormat::from_mime(mime), expected);
    }

    #[rstest]
    #[case("a.PDF", Some(LogicalFormat::Pdf))]
    #[case("budget.Xlsx", Some(LogicalFormat::Xlsx))]
    #[case("archive.tar.gz", None)]
    #[case("README", None)]
    fn test_from_file_name(#[case] name: &str, #[case] expected: Option<LogicalFormat>) {
        assert_eq!(LogicalFormat::from_file_name(name), expected);
    }

    #[test]
    fn test_mime_wins_over_extension() {
        let file = FileInput::new("data.txt", "text/csv", b"a,b".to_vec());
        assert_eq!(
            FormatValidator::default().detect(&file),
            Some(LogicalFormat::Csv)
        );
    }

    #[test]
    fn test_extension_used_when_mime_unknown() {
        let file = FileInput::new("notes.txt", "application/octet-stream", b"hi".to_vec());
        assert_eq!(
            FormatValidator::default().detect(&file),
            Some(LogicalFormat::Txt)
        );
    }

    #[test]
    fn test_validate_size_limit() {
        let validator = FormatValidator::new(ProcessingLimits {
            max_file_size: 4,
            max_files: 100,
        });
        let file = FileInput::from_name("a.txt", b"hello".to_vec());
        let err = validator.validate(&file).unwrap_err();
        assert!(matches!(err, DocMergeError::FileTooLarge { .. }));

        let file = FileInput::from_name("a.txt", b"hell".to_vec());
        assert_eq!(validator.validate(&file).unwrap(), LogicalFormat::Txt);
    }

    #[test]
    fn test_validate_empty_and_unsupported() {
        let validator = FormatValidator::default();
        let err = validator
            .validate(&FileInput::from_name("a.txt", Vec::new()))
            .unwrap_err();
        assert!(matches!(err, DocMergeError::EmptyFile { .. }));

        let err = validator
            .validate(&FileInput::from_name("a.odt", b"x".to_vec()))
            .unwrap_err();
        assert!(matches!(err, DocMergeError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_validate_batch() {
        let validator = FormatValidator::default();
        assert!(validator.validate_batch(99, 1).is_ok());
        assert!(matches!(
            validator.validate_batch(99, 2),
            Err(DocMergeError::TooManyFiles { count: 101, .. })
        ));
    }

    #[test]
    fn test_structure_rejects_bad_signature() {
        let validator = FormatValidator::default();
        let data = Bytes::from_static(b"not a pdf at all");
        let err = validator
            .validate_structure(&data, LogicalFormat::Pdf)
            .unwrap_err();
        assert!(matches!(err, DocMergeError::Corrupted { .. }));
        assert!(err.to_string().contains("invalid file header"));

        let data = Bytes::from_static(b"PK\x05\x06 empty zip");
        assert!(validator
            .validate_structure(&data, LogicalFormat::Docx)
            .is_err());
    }

    #[test]
    fn test_structure_accepts_text() {
        let validator = FormatValidator::default();
        let data = Bytes::from_static(b"plain words");
        assert!(validator.validate_structure(&data, LogicalFormat::Txt).is_ok());
    }

    #[test]
    fn test_format_round_trips_through_str() {
        for format in LogicalFormat::ALL {
            assert_eq!(format.to_string().parse::<LogicalFormat>().unwrap(), format);
            assert!(!format.media_type().is_empty());
        }
    }
}
