//! Error taxonomy and heuristic classification.
//!
//! Every failure that reaches a user is described by an [`ErrorCode`] with a
//! fixed severity and user guidance. Raw failures coming out of parsers are
//! plain strings, so [`ErrorClassifier`] maps them onto the taxonomy with an
//! ordered list of keyword rules.
//!
//! Classification is best-effort: the rules are evaluated top to bottom, the
//! first match wins, and anything unmatched becomes
//! [`ErrorCode::UnknownError`]. The classifier never fails.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How bad a failure is for the current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic loss, the output is still complete.
    Low,
    /// Part of the input could not be used.
    Medium,
    /// The operation failed for this input.
    High,
    /// Nothing can proceed in this environment.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Closed set of error codes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Upload and validation.
    /// File exceeds the per-file size limit.
    FileTooLarge,
    /// No supported format could be detected.
    UnsupportedFormat,
    /// The file structure is damaged.
    FileCorrupted,
    /// The file has no content.
    FileEmpty,

    // Processing.
    /// Generic per-document processing failure.
    ProcessingFailed,
    /// Processing ran out of memory.
    MemoryExceeded,
    /// The merge step failed.
    MergeFailed,
    /// Converting to the output format failed or is not supported.
    ConversionFailed,

    // Format specific.
    /// PDF requires a password.
    PdfPasswordProtected,
    /// Text could not be extracted from a PDF.
    PdfExtractionFailed,
    /// Word document uses formatting that cannot be carried over.
    DocxComplexFormatting,
    /// Spreadsheet exceeds the cell budget.
    XlsxLargeSpreadsheet,
    /// Presentation contains media that is dropped.
    PptxMediaNotSupported,

    // Environment.
    /// The host environment lacks a required capability.
    BrowserNotSupported,
    /// The host has too little memory for the job.
    InsufficientMemory,

    // Generic.
    /// Anything the classifier could not match.
    UnknownError,
    /// The operation took too long.
    TimeoutError,
}

impl ErrorCode {
    /// Every code, in taxonomy order.
    pub const ALL: [ErrorCode; 17] = [
        Self::FileTooLarge,
        Self::UnsupportedFormat,
        Self::FileCorrupted,
        Self::FileEmpty,
        Self::ProcessingFailed,
        Self::MemoryExceeded,
        Self::MergeFailed,
        Self::ConversionFailed,
        Self::PdfPasswordProtected,
        Self::PdfExtractionFailed,
        Self::DocxComplexFormatting,
        Self::XlsxLargeSpreadsheet,
        Self::PptxMediaNotSupported,
        Self::BrowserNotSupported,
        Self::InsufficientMemory,
        Self::UnknownError,
        Self::TimeoutError,
    ];

    /// Wire name of the code, e.g. `FILE_TOO_LARGE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::FileCorrupted => "FILE_CORRUPTED",
            Self::FileEmpty => "FILE_EMPTY",
            Self::ProcessingFailed => "PROCESSING_FAILED",
            Self::MemoryExceeded => "MEMORY_EXCEEDED",
            Self::MergeFailed => "MERGE_FAILED",
            Self::ConversionFailed => "CONVERSION_FAILED",
            Self::PdfPasswordProtected => "PDF_PASSWORD_PROTECTED",
            Self::PdfExtractionFailed => "PDF_EXTRACTION_FAILED",
            Self::DocxComplexFormatting => "DOCX_COMPLEX_FORMATTING",
            Self::XlsxLargeSpreadsheet => "XLSX_LARGE_SPREADSHEET",
            Self::PptxMediaNotSupported => "PPTX_MEDIA_NOT_SUPPORTED",
            Self::BrowserNotSupported => "BROWSER_NOT_SUPPORTED",
            Self::InsufficientMemory => "INSUFFICIENT_MEMORY",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
        }
    }

    /// Severity attached to the code.
    pub fn severity(&self) -> Severity {
        match self {
            Self::DocxComplexFormatting | Self::PptxMediaNotSupported => Severity::Low,
            Self::FileEmpty | Self::XlsxLargeSpreadsheet | Self::PdfExtractionFailed => {
                Severity::Medium
            }
            Self::FileTooLarge
            | Self::UnsupportedFormat
            | Self::FileCorrupted
            | Self::ProcessingFailed
            | Self::MergeFailed
            | Self::ConversionFailed
            | Self::PdfPasswordProtected
            | Self::UnknownError
            | Self::TimeoutError => Severity::High,
            Self::MemoryExceeded | Self::BrowserNotSupported | Self::InsufficientMemory => {
                Severity::Critical
            }
        }
    }

    /// Short user-facing title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::FileTooLarge => "File too large",
            Self::UnsupportedFormat => "Unsupported file format",
            Self::FileCorrupted => "File appears to be corrupted",
            Self::FileEmpty => "File is empty",
            Self::ProcessingFailed => "Processing failed",
            Self::MemoryExceeded => "Memory limit exceeded",
            Self::MergeFailed => "Merge failed",
            Self::ConversionFailed => "Conversion failed",
            Self::PdfPasswordProtected => "Password-protected PDF",
            Self::PdfExtractionFailed => "Could not read PDF text",
            Self::DocxComplexFormatting => "Complex Word formatting",
            Self::XlsxLargeSpreadsheet => "Spreadsheet too large",
            Self::PptxMediaNotSupported => "Presentation media not supported",
            Self::BrowserNotSupported => "Environment not supported",
            Self::InsufficientMemory => "Not enough memory",
            Self::UnknownError => "Unexpected error",
            Self::TimeoutError => "Operation timed out",
        }
    }

    /// User-facing explanation.
    pub fn message(&self) -> &'static str {
        match self {
            Self::FileTooLarge => "The file exceeds the maximum size allowed for a single document.",
            Self::UnsupportedFormat => {
                "Only PDF, Word, Excel, PowerPoint, text and CSV files can be merged."
            }
            Self::FileCorrupted => "The file could not be read because its structure is damaged.",
            Self::FileEmpty => "The file does not contain any data.",
            Self::ProcessingFailed => "The document could not be processed.",
            Self::MemoryExceeded => "The operation needed more memory than is available.",
            Self::MergeFailed => "The documents could not be combined.",
            Self::ConversionFailed => "The documents could not be converted to the output format.",
            Self::PdfPasswordProtected => "The PDF is encrypted and requires a password to open.",
            Self::PdfExtractionFailed => "Text could not be extracted from the PDF.",
            Self::DocxComplexFormatting => {
                "Some formatting in the Word document cannot be preserved."
            }
            Self::XlsxLargeSpreadsheet => "The spreadsheet has too many cells to merge.",
            Self::PptxMediaNotSupported => {
                "Images, audio and video in presentations are not carried into the output."
            }
            Self::BrowserNotSupported => "This environment lacks a capability the merge needs.",
            Self::InsufficientMemory => "There is not enough free memory to run the merge.",
            Self::UnknownError => "Something unexpected went wrong.",
            Self::TimeoutError => "The operation took too long and was stopped.",
        }
    }

    /// Suggested next step for the user.
    pub fn action(&self) -> &'static str {
        match self {
            Self::FileTooLarge => "Split the file into smaller parts or compress it.",
            Self::UnsupportedFormat => "Convert the file to a supported format and try again.",
            Self::FileCorrupted => "Open and re-save the file in its original application.",
            Self::FileEmpty => "Remove the file or replace it with one that has content.",
            Self::ProcessingFailed => "Remove the document and try again.",
            Self::MemoryExceeded => "Merge fewer or smaller documents at once.",
            Self::MergeFailed => "Check that at least one document is readable and retry.",
            Self::ConversionFailed => "Choose PDF as the output format or merge files of one type.",
            Self::PdfPasswordProtected => "Remove the password protection and upload it again.",
            Self::PdfExtractionFailed => "The PDF may be scanned; use a text-based PDF instead.",
            Self::DocxComplexFormatting => "Review the merged output for layout differences.",
            Self::XlsxLargeSpreadsheet => "Split the workbook into smaller files.",
            Self::PptxMediaNotSupported => "Embed media separately if you need it.",
            Self::BrowserNotSupported => "Use an up-to-date environment.",
            Self::InsufficientMemory => "Close other applications and try again.",
            Self::UnknownError => "Try again; if the problem persists, report it.",
            Self::TimeoutError => "Try again with fewer documents.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage a failure happened in, used as a tie-breaker by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorContext {
    /// File intake and size/format checks.
    Upload,
    /// Structural validation.
    Validation,
    /// Metadata analysis and previews.
    Analysis,
    /// Same-format merge or final PDF assembly.
    Merge,
    /// Conversion bridge.
    Conversion,
}

/// A failure mapped onto the taxonomy, ready to show to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    /// Taxonomy code.
    pub code: ErrorCode,
    /// Severity of the code.
    pub severity: Severity,
    /// Short title.
    pub title: String,
    /// Explanation.
    pub message: String,
    /// Suggested action.
    pub action: String,
    /// Underlying failure text, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_details: Option<String>,
}

impl ClassifiedError {
    /// Build the user-facing record for `code`.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            severity: code.severity(),
            title: code.title().to_string(),
            message: code.message().to_string(),
            action: code.action().to_string(),
            technical_details: None,
        }
    }

    /// Attach the raw failure text.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        if !details.is_empty() {
            self.technical_details = Some(details);
        }
        self
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.title, self.message)?;
        if let Some(details) = &self.technical_details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ClassifiedError {}

type Predicate = fn(&str, Option<ErrorContext>) -> bool;

/// One classification rule: a predicate over the lower-cased message.
struct Rule {
    matches: Predicate,
    code: ErrorCode,
}

fn contains_any(message: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| message.contains(needle))
}

/// Evaluated top to bottom; order matters where phrases overlap.
static RULES: &[Rule] = &[
    Rule {
        matches: |m, _| contains_any(m, &["password", "encrypted", "encryption", "decrypt"]),
        code: ErrorCode::PdfPasswordProtected,
    },
    Rule {
        matches: |m, _| contains_any(m, &["timed out", "timeout", "deadline exceeded"]),
        code: ErrorCode::TimeoutError,
    },
    Rule {
        matches: |m, _| {
            contains_any(m, &["too many cells", "spreadsheet too large", "cell limit"])
        },
        code: ErrorCode::XlsxLargeSpreadsheet,
    },
    Rule {
        matches: |m, _| contains_any(m, &["too large", "file size", "exceeds the maximum size"]),
        code: ErrorCode::FileTooLarge,
    },
    Rule {
        matches: |m, ctx| {
            contains_any(m, &["out of memory", "allocation failed", "memory allocation"])
                && ctx != Some(ErrorContext::Upload)
        },
        code: ErrorCode::MemoryExceeded,
    },
    Rule {
        matches: |m, _| contains_any(m, &["insufficient memory", "not enough memory"]),
        code: ErrorCode::InsufficientMemory,
    },
    Rule {
        matches: |m, _| {
            contains_any(m, &["not supported in this environment", "missing capability"])
        },
        code: ErrorCode::BrowserNotSupported,
    },
    Rule {
        matches: |m, _| contains_any(m, &["conversion not supported", "cannot convert"]),
        code: ErrorCode::ConversionFailed,
    },
    Rule {
        matches: |m, _| {
            contains_any(m, &["unsupported format", "unsupported file", "unknown format"])
        },
        code: ErrorCode::UnsupportedFormat,
    },
    Rule {
        matches: |m, _| contains_any(m, &["media", "video", "audio"]) && m.contains("slide"),
        code: ErrorCode::PptxMediaNotSupported,
    },
    Rule {
        matches: |m, _| contains_any(m, &["complex formatting", "unsupported element"]),
        code: ErrorCode::DocxComplexFormatting,
    },
    Rule {
        matches: |m, _| {
            contains_any(m, &["empty file", "file is empty", "no content", "zero bytes"])
        },
        code: ErrorCode::FileEmpty,
    },
    Rule {
        matches: |m, _| {
            contains_any(
                m,
                &[
                    "corrupt",
                    "invalid file header",
                    "invalid header",
                    "invalid zip",
                    "invalid pdf",
                    "malformed",
                    "damaged",
                    "unexpected eof",
                    "invalid xref",
                    "missing signature",
                ],
            )
        },
        code: ErrorCode::FileCorrupted,
    },
    Rule {
        matches: |m, ctx| {
            m.contains("extract")
                && (m.contains("pdf") || ctx == Some(ErrorContext::Analysis))
                && !m.contains("zip")
        },
        code: ErrorCode::PdfExtractionFailed,
    },
    Rule {
        matches: |m, ctx| ctx == Some(ErrorContext::Conversion) && looks_like_failure(m),
        code: ErrorCode::ConversionFailed,
    },
    Rule {
        matches: |m, ctx| {
            (ctx == Some(ErrorContext::Merge) && looks_like_failure(m)) || m.contains("merge")
        },
        code: ErrorCode::MergeFailed,
    },
    Rule {
        matches: |m, ctx| {
            matches!(
                ctx,
                Some(ErrorContext::Analysis) | Some(ErrorContext::Validation)
            ) && looks_like_failure(m)
        },
        code: ErrorCode::ProcessingFailed,
    },
];

fn looks_like_failure(message: &str) -> bool {
    contains_any(message, &["fail", "error", "could not", "cannot", "unable"])
}

/// Maps raw failure text onto the taxonomy.
///
/// The rules are keyword heuristics and will occasionally misfile an error;
/// callers must treat the result as guidance, not as a diagnosis.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Create a classifier.
    pub fn new() -> Self {
        Self
    }

    /// Classify a raw message, using `context` to break ties between
    /// generic failure phrases.
    ///
    /// # Examples
    ///
    /// ```
    /// use docmerge::classify::{ErrorClassifier, ErrorCode, ErrorContext};
    ///
    /// let classifier = ErrorClassifier::new();
    /// let err = classifier.classify("Invalid file header", None);
    /// assert_eq!(err.code, ErrorCode::FileCorrupted);
    ///
    /// let err = classifier.classify("write failed", Some(ErrorContext::Conversion));
    /// assert_eq!(err.code, ErrorCode::ConversionFailed);
    /// ```
    pub fn classify(&self, raw: &str, context: Option<ErrorContext>) -> ClassifiedError {
        ClassifiedError::new(self.code_for(raw, context)).with_details(raw)
    }

    /// Only the code that [`classify`](Self::classify) would pick.
    pub fn code_for(&self, raw: &str, context: Option<ErrorContext>) -> ErrorCode {
        let message = raw.to_lowercase();
        RULES
            .iter()
            .find(|rule| (rule.matches)(&message, context))
            .map(|rule| rule.code)
            .unwrap_or(ErrorCode::UnknownError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PDF is encrypted, password required", None, ErrorCode::PdfPasswordProtected)]
    #[case("couldn't parse input: invalid file header", None, ErrorCode::FileCorrupted)]
    #[case("invalid Zip archive: missing signature", None, ErrorCode::FileCorrupted)]
    #[case("file size 60 MB exceeds the maximum size", None, ErrorCode::FileTooLarge)]
    #[case("Unsupported format for report.odt", None, ErrorCode::UnsupportedFormat)]
    #[case("operation timed out after 30s", None, ErrorCode::TimeoutError)]
    #[case("memory allocation failed", Some(ErrorContext::Merge), ErrorCode::MemoryExceeded)]
    #[case("workbook has too many cells", None, ErrorCode::XlsxLargeSpreadsheet)]
    #[case("text extraction failed on PDF page 3", None, ErrorCode::PdfExtractionFailed)]
    #[case("conversion not supported: pdf -> docx", None, ErrorCode::ConversionFailed)]
    fn test_keyword_rules(
        #[case] raw: &str,
        #[case] context: Option<ErrorContext>,
        #[case] expected: ErrorCode,
    ) {
        assert_eq!(ErrorClassifier::new().code_for(raw, context), expected);
    }

    #[rstest]
    #[case(ErrorContext::Merge, ErrorCode::MergeFailed)]
    #[case(ErrorContext::Conversion, ErrorCode::ConversionFailed)]
    #[case(ErrorContext::Analysis, ErrorCode::ProcessingFailed)]
    fn test_context_breaks_ties(#[case] context: ErrorContext, #[case] expected: ErrorCode) {
        let code = ErrorClassifier::new().code_for("operation failed", Some(context));
        assert_eq!(code, expected);
    }

    #[test]
    fn test_unmatched_falls_back_to_unknown() {
        let err = ErrorClassifier::new().classify("the moon is made of cheese", None);
        assert_eq!(err.code, ErrorCode::UnknownError);
        assert_eq!(err.severity, Severity::High);
        assert_eq!(
            err.technical_details.as_deref(),
            Some("the moon is made of cheese")
        );
    }

    #[test]
    fn test_failure_without_context_is_unknown() {
        let code = ErrorClassifier::new().code_for("operation failed", None);
        assert_eq!(code, ErrorCode::UnknownError);
    }

    #[test]
    fn test_every_code_has_guidance() {
        for code in ErrorCode::ALL {
            assert!(!code.title().is_empty());
            assert!(!code.message().is_empty());
            assert!(!code.action().is_empty());
            assert_eq!(code.to_string(), code.as_str());
        }
    }

    #[test]
    fn test_serializes_wire_names() {
        let err = ClassifiedError::new(ErrorCode::FileTooLarge);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "FILE_TOO_LARGE");
        assert_eq!(json["severity"], "high");
        assert!(json.get("technicalDetails").is_none());
    }

    #[test]
    fn test_display_includes_details() {
        let err = ClassifiedError::new(ErrorCode::MergeFailed).with_details("no pages");
        let msg = err.to_string();
        assert!(msg.contains("MERGE_FAILED"));
        assert!(msg.contains("no pages"));
    }
}
