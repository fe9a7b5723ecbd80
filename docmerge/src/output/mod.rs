//! User-facing output for command-line front ends.
//!
//! # Examples
//!
//! ```
//! use docmerge::output::OutputFormatter;
//!
//! let formatter = OutputFormatter::quiet();
//! formatter.info("suppressed");
//! formatter.warning("always shown");
//! ```

pub mod formatter;
pub mod progress;

pub use formatter::{MessageLevel, OutputFormatter, document_line};
pub use progress::{ProgressBar, ProgressReporter, ProgressStyle};

use crate::document::DocumentList;
use crate::merge::{JobStatus, MergeOutput, ProcessingJob};
use crate::utils::format_file_size;

/// Print the document list in merge order.
pub fn display_documents(formatter: &OutputFormatter, documents: &DocumentList) {
    formatter.section(&format!("Documents ({}):", documents.len()));
    for (index, handle) in documents.iter().enumerate() {
        formatter.list_item(index + 1, &document_line(handle));
        if let Some(preview) = &handle.preview {
            let first = preview.lines().next().unwrap_or_default();
            formatter.detail("preview", first);
        }
        if let Some(error) = &handle.error {
            formatter.detail("action", &error.action);
        }
    }
}

/// Print the outcome of a job, its warnings and, when verbose, its plan.
pub fn display_job(formatter: &OutputFormatter, job: &ProcessingJob, output: Option<&MergeOutput>) {
    formatter.debug(&format!(
        "Output format: {} ({})",
        job.output_format, job.format_reason
    ));

    for warning in &job.warnings {
        formatter.warning(warning);
    }

    match (job.status, output) {
        (JobStatus::Completed, Some(output)) => {
            formatter.success(&format!(
                "Merged {} document(s) into {} ({})",
                job.document_ids.len(),
                output.file_name,
                format_file_size(output.size as u64)
            ));
            if output.degraded {
                formatter.warning(&format!(
                    "{} output was produced as {}",
                    output.requested_format, output.format
                ));
            }
        }
        (JobStatus::Failed, _) => {
            if let Some(error) = &job.error {
                formatter.error(&error.to_string());
                formatter.info(&error.action);
            }
        }
        (status, _) => formatter.info(&format!("Job is {status}")),
    }
}
