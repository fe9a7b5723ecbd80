//! Error types for docmerge.
//!
//! [`DocMergeError`] is returned by every fallible operation in the crate.
//! Each variant maps onto exactly one [`ErrorCode`] of the user-facing
//! taxonomy, either directly (typed variants) or through the
//! [`ErrorClassifier`] (variants that only carry a parser message).
//!
//! # Error Categories
//!
//! - **Validation Errors**: size limits, empty files, unknown formats
//! - **Document Errors**: corrupted or password-protected inputs
//! - **Merge Errors**: unsupported combinations, failed assembly
//! - **Job Errors**: concurrent jobs, unsettled documents, cancellation

use crate::classify::{ClassifiedError, ErrorClassifier, ErrorCode, ErrorContext};
use crate::format::LogicalFormat;
use std::io;

/// Result type alias for docmerge operations.
pub type Result<T> = std::result::Result<T, DocMergeError>;

/// Main error type for docmerge operations.
#[derive(Debug, thiserror::Error)]
pub enum DocMergeError {
    /// File is larger than the per-file limit.
    #[error("File too large: {name} is {size} bytes (limit {limit} bytes)")]
    FileTooLarge {
        /// File name.
        name: String,
        /// Actual size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// File has no content.
    #[error("File is empty: {name}")]
    EmptyFile {
        /// File name.
        name: String,
    },

    /// Neither the declared type nor the extension is supported.
    #[error("Unsupported format for {name}\n  Supported: pdf, docx, xlsx, pptx, txt, csv")]
    UnsupportedFormat {
        /// File name.
        name: String,
    },

    /// The document structure could not be parsed.
    #[error("Corrupted or invalid {format} document: {details}")]
    Corrupted {
        /// Format the bytes were expected to be in.
        format: LogicalFormat,
        /// Parser message.
        details: String,
    },

    /// The PDF is encrypted.
    #[error("PDF is encrypted and requires a password: {name}")]
    PasswordProtected {
        /// File name.
        name: String,
    },

    /// The batch is larger than the file-count limit.
    #[error("Too many files: {count} (limit {limit})")]
    TooManyFiles {
        /// Requested number of files.
        count: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Workbook is above the cell budget.
    #[error("Spreadsheet too large: {cells} cells (limit {limit})")]
    SpreadsheetTooLarge {
        /// Cells found so far.
        cells: usize,
        /// Cell budget.
        limit: usize,
    },

    /// The requested input/output combination cannot be produced.
    #[error("Conversion not supported: {from} -> {to}")]
    ConversionNotSupported {
        /// Input formats, comma separated.
        from: String,
        /// Requested output format.
        to: LogicalFormat,
    },

    /// Merge produced no output.
    #[error("Merge operation failed: {reason}")]
    MergeFailed {
        /// What went wrong.
        reason: String,
    },

    /// Conversion bridge failed.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        /// What went wrong.
        reason: String,
    },

    /// Generic per-document processing failure.
    #[error("Processing failed for {name}: {reason}")]
    ProcessingFailed {
        /// File name.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// Another job is already running.
    #[error("A merge job is already in progress")]
    JobAlreadyActive,

    /// Some referenced documents have not finished processing.
    #[error("{pending} document(s) are still being processed")]
    DocumentsNotReady {
        /// Number of unsettled documents.
        pending: usize,
    },

    /// Nothing to merge.
    #[error("No documents to merge")]
    NoDocuments,

    /// Merge options are inconsistent.
    #[error("Invalid options: {message}")]
    InvalidOptions {
        /// Description of the problem.
        message: String,
    },

    /// Illegal job status transition.
    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// The job was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// PDF library failure.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// ZIP container failure.
    #[error("Invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parse failure.
    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl DocMergeError {
    /// Create a FileTooLarge error.
    pub fn file_too_large(name: impl Into<String>, size: u64, limit: u64) -> Self {
        Self::FileTooLarge {
            name: name.into(),
            size,
            limit,
        }
    }

    /// Create an EmptyFile error.
    pub fn empty_file(name: impl Into<String>) -> Self {
        Self::EmptyFile { name: name.into() }
    }

    /// Create an UnsupportedFormat error.
    pub fn unsupported_format(name: impl Into<String>) -> Self {
        Self::UnsupportedFormat { name: name.into() }
    }

    /// Create a Corrupted error.
    pub fn corrupted(format: LogicalFormat, details: impl Into<String>) -> Self {
        Self::Corrupted {
            format,
            details: details.into(),
        }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }

    /// Create a ConversionFailed error.
    pub fn conversion_failed(reason: impl Into<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
        }
    }

    /// Create a ProcessingFailed error.
    pub fn processing_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProcessingFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidOptions error.
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Taxonomy code for this error.
    ///
    /// Library-level variants (`Pdf`, `Zip`, `Xml`, `Io`, `Other`) have no
    /// fixed code and are run through the classifier.
    pub fn code(&self) -> ErrorCode {
        self.code_in(None)
    }

    fn code_in(&self, context: Option<ErrorContext>) -> ErrorCode {
        match self {
            Self::FileTooLarge { .. } | Self::TooManyFiles { .. } => ErrorCode::FileTooLarge,
            Self::EmptyFile { .. } => ErrorCode::FileEmpty,
            Self::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            Self::Corrupted { .. } => ErrorCode::FileCorrupted,
            Self::PasswordProtected { .. } => ErrorCode::PdfPasswordProtected,
            Self::SpreadsheetTooLarge { .. } => ErrorCode::XlsxLargeSpreadsheet,
            Self::ConversionNotSupported { .. } | Self::ConversionFailed { .. } => {
                ErrorCode::ConversionFailed
            }
            Self::MergeFailed { .. } | Self::NoDocuments => ErrorCode::MergeFailed,
            Self::ProcessingFailed { .. }
            | Self::DocumentsNotReady { .. }
            | Self::JobAlreadyActive
            | Self::InvalidOptions { .. }
            | Self::InvalidTransition { .. }
            | Self::Cancelled => ErrorCode::ProcessingFailed,
            Self::Pdf(_) | Self::Zip(_) | Self::Xml(_) | Self::Io(_) | Self::Other(_) => {
                ErrorClassifier::new().code_for(&self.to_string(), context)
            }
        }
    }

    /// User-facing record for this error.
    pub fn classify(&self, context: Option<ErrorContext>) -> ClassifiedError {
        ClassifiedError::new(self.code_in(context)).with_details(self.to_string())
    }

    /// Check if this error only affects a single document.
    ///
    /// Recoverable errors mark one document as failed; the rest of the
    /// batch can still be merged.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FileTooLarge { .. }
                | Self::EmptyFile { .. }
                | Self::UnsupportedFormat { .. }
                | Self::Corrupted { .. }
                | Self::PasswordProtected { .. }
                | Self::SpreadsheetTooLarge { .. }
                | Self::ProcessingFailed { .. }
                | Self::Pdf(_)
                | Self::Zip(_)
                | Self::Xml(_)
        )
    }

    /// Check if this error should stop all processing immediately.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoDocuments
                | Self::TooManyFiles { .. }
                | Self::ConversionNotSupported { .. }
                | Self::JobAlreadyActive
                | Self::Cancelled
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidOptions { .. } | Self::NoDocuments | Self::Other(_) => 1,
            Self::FileTooLarge { .. }
            | Self::EmptyFile { .. }
            | Self::UnsupportedFormat { .. }
            | Self::TooManyFiles { .. } => 2,
            Self::Corrupted { .. }
            | Self::PasswordProtected { .. }
            | Self::SpreadsheetTooLarge { .. }
            | Self::Pdf(_)
            | Self::Zip(_)
            | Self::Xml(_) => 3,
            Self::ConversionNotSupported { .. } => 4,
            Self::Io(_) => 5,
            Self::MergeFailed { .. }
            | Self::ConversionFailed { .. }
            | Self::ProcessingFailed { .. } => 6,
            Self::JobAlreadyActive
            | Self::DocumentsNotReady { .. }
            | Self::InvalidTransition { .. } => 7,
            Self::Cancelled => 130,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_file_too_large_display() {
        let err = DocMergeError::file_too_large("big.pdf", 60_000_000, 52_428_800);
        let msg = err.to_string();
        assert!(msg.contains("File too large"));
        assert!(msg.contains("big.pdf"));
        assert!(msg.contains("52428800"));
    }

    #[test]
    fn test_conversion_not_supported_display() {
        let err = DocMergeError::ConversionNotSupported {
            from: "xlsx".to_string(),
            to: LogicalFormat::Pdf,
        };
        let msg = err.to_string();
        assert!(msg.contains("Conversion not supported"));
        assert!(msg.contains("xlsx -> pdf"));
    }

    #[test]
    fn test_codes_for_typed_variants() {
        assert_eq!(
            DocMergeError::empty_file("a.txt").code(),
            ErrorCode::FileEmpty
        );
        assert_eq!(
            DocMergeError::corrupted(LogicalFormat::Docx, "bad zip").code(),
            ErrorCode::FileCorrupted
        );
        assert_eq!(
            DocMergeError::PasswordProtected {
                name: "s.pdf".into()
            }
            .code(),
            ErrorCode::PdfPasswordProtected
        );
        assert_eq!(DocMergeError::NoDocuments.code(), ErrorCode::MergeFailed);
    }

    #[test]
    fn test_untyped_variants_are_classified() {
        let err = DocMergeError::other("unexpected EOF while reading trailer");
        assert_eq!(err.code(), ErrorCode::FileCorrupted);

        let err = DocMergeError::other("write failed");
        let classified = err.classify(Some(ErrorContext::Merge));
        assert_eq!(classified.code, ErrorCode::MergeFailed);
        assert_eq!(classified.technical_details.as_deref(), Some("write failed"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(DocMergeError::corrupted(LogicalFormat::Pdf, "x").is_recoverable());
        assert!(DocMergeError::empty_file("a").is_recoverable());
        assert!(!DocMergeError::NoDocuments.is_recoverable());
        assert!(!DocMergeError::Cancelled.is_recoverable());
    }

    #[test]
    fn test_is_fatal() {
        assert!(DocMergeError::NoDocuments.is_fatal());
        assert!(DocMergeError::JobAlreadyActive.is_fatal());
        assert!(!DocMergeError::corrupted(LogicalFormat::Pdf, "x").is_fatal());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(DocMergeError::NoDocuments.exit_code(), 1);
        assert_eq!(DocMergeError::unsupported_format("a.odt").exit_code(), 2);
        assert_eq!(
            DocMergeError::corrupted(LogicalFormat::Xlsx, "x").exit_code(),
            3
        );
        assert_eq!(DocMergeError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err: DocMergeError = io_err.into();
        assert!(matches!(err, DocMergeError::Io(_)));
        assert!(err.source().is_some());
    }
}
