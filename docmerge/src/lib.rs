//! docmerge - merge PDF, Word, Excel, PowerPoint, text and CSV files into a
//! single document.
//!
//! The engine runs entirely in process:
//!
//! - format detection and upload limits ([`format`])
//! - one adapter per format for analysis, previews and same-format merges
//!   ([`adapters`])
//! - a text-to-PDF conversion bridge for mixed sets ([`convert`])
//! - chunked, bounded-concurrency processing of large inputs ([`chunk`])
//! - a fixed error taxonomy with user guidance ([`classify`])
//! - the orchestrator that picks the output format and runs jobs ([`merge`])
//!
//! # Examples
//!
//! ## Merging a session
//!
//! ```no_run
//! use docmerge::{FileInput, MergeOptions, MergeSession, NoopObserver};
//!
//! # async fn example() -> docmerge::Result<()> {
//! let mut session = MergeSession::default();
//! session.add_files(vec![
//!     FileInput::from_name("report.pdf", std::fs::read("report.pdf")?),
//!     FileInput::from_name("figures.xlsx", std::fs::read("figures.xlsx")?),
//! ])?;
//! session.process_pending(&NoopObserver).await;
//!
//! session.merge(MergeOptions::default(), &NoopObserver).await?;
//! if let Some(output) = session.output().and_then(|h| h.output()) {
//!     std::fs::write(&output.file_name, &output.data)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Deciding the output format
//!
//! ```
//! use docmerge::LogicalFormat::*;
//! use docmerge::merge::{FormatReason, decide_output_format};
//!
//! let decision = decide_output_format(&[Docx, Docx]);
//! assert_eq!(decision.format, Pdf);
//! assert_eq!(decision.reason, FormatReason::MultiWordRedirect);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod chunk;
pub mod classify;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod format;
pub mod merge;
pub mod ooxml;
pub mod output;
pub mod resources;
pub mod utils;

// Re-export commonly used types
pub use classify::{ClassifiedError, ErrorClassifier, ErrorCode, ErrorContext, Severity};
pub use config::{ChunkConfig, MergeMode, MergeOptions, ProcessingLimits, Quality, TextSeparator};
pub use document::{DocumentHandle, DocumentId, DocumentList, DocumentMetadata, PipelineStage};
pub use error::{DocMergeError, Result};
pub use format::{FileInput, FormatValidator, LogicalFormat};
pub use merge::{
    CancelToken, JobStatus, MergeObserver, MergeOutput, MergeSession, NoopObserver, Orchestrator,
    ProcessingJob,
};
pub use resources::{OutputHandle, OutputRegistry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
