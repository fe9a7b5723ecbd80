//! Output format decision and merge dispatch.
//!
//! Both functions are pure: they look only at the formats of the documents
//! taking part, in order.

use crate::error::{DocMergeError, Result};
use crate::format::LogicalFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Why an output format was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormatReason {
    /// Nothing to merge; PDF is the fallback.
    NoDocuments,
    /// Every input has the same format.
    SingleFormat,
    /// Several Word documents are merged through PDF for layout fidelity.
    MultiWordRedirect,
    /// Inputs span several formats.
    CrossFormat,
    /// The caller asked for this format.
    Requested,
}

impl fmt::Display for FormatReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoDocuments => "no documents",
            Self::SingleFormat => "single format detected",
            Self::MultiWordRedirect => "multiple Word documents are merged as PDF for fidelity",
            Self::CrossFormat => "cross-format compatibility",
            Self::Requested => "requested output format",
        };
        f.write_str(text)
    }
}

/// Output format and the reason for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDecision {
    /// Chosen format.
    pub format: LogicalFormat,
    /// Why.
    pub reason: FormatReason,
}

/// How the merge will be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeStrategy {
    /// The format's own adapter merges the inputs.
    Native(LogicalFormat),
    /// Every input goes through the conversion bridge, then a PDF merge.
    Bridge,
}

/// A validated merge plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePlan {
    /// Output format.
    pub output: LogicalFormat,
    /// Why that format.
    pub reason: FormatReason,
    /// How to get there.
    pub strategy: MergeStrategy,
}

/// Pick the output format for `formats`.
///
/// # Examples
///
/// ```
/// use docmerge::format::LogicalFormat::*;
/// use docmerge::merge::decision::{FormatReason, decide_output_format};
///
/// assert_eq!(decide_output_format(&[Xlsx, Xlsx]).format, Xlsx);
/// assert_eq!(decide_output_format(&[Docx, Docx]).reason, FormatReason::MultiWordRedirect);
/// assert_eq!(decide_output_format(&[Txt, Pdf]).format, Pdf);
/// ```
pub fn decide_output_format(formats: &[LogicalFormat]) -> OutputDecision {
    let distinct: BTreeSet<LogicalFormat> = formats.iter().copied().collect();
    let mut iter = distinct.iter();

    match (iter.next(), iter.next()) {
        (None, _) => OutputDecision {
            format: LogicalFormat::Pdf,
            reason: FormatReason::NoDocuments,
        },
        (Some(&LogicalFormat::Docx), None) if formats.len() >= 2 => OutputDecision {
            format: LogicalFormat::Pdf,
            reason: FormatReason::MultiWordRedirect,
        },
        (Some(&format), None) => OutputDecision {
            format,
            reason: FormatReason::SingleFormat,
        },
        (Some(_), Some(_)) => OutputDecision {
            format: LogicalFormat::Pdf,
            reason: FormatReason::CrossFormat,
        },
    }
}

/// Decide the output format (or take `requested`) and choose a strategy.
///
/// # Errors
///
/// [`DocMergeError::NoDocuments`] for an empty set, and
/// [`DocMergeError::ConversionNotSupported`] when the combination cannot be
/// produced. Nothing is processed in either case.
pub fn plan_merge(
    formats: &[LogicalFormat],
    requested: Option<LogicalFormat>,
) -> Result<MergePlan> {
    if formats.is_empty() {
        return Err(DocMergeError::NoDocuments);
    }

    let decision = decide_output_format(formats);
    let (output, reason) = match requested {
        Some(format) if format != decision.format => (format, FormatReason::Requested),
        _ => (decision.format, decision.reason),
    };

    let distinct: BTreeSet<LogicalFormat> = formats.iter().copied().collect();
    let word_documents = formats
        .iter()
        .filter(|f| **f == LogicalFormat::Docx)
        .count();

    let strategy = if output == LogicalFormat::Pdf && (distinct.len() > 1 || word_documents >= 2)
    {
        MergeStrategy::Bridge
    } else if distinct.len() == 1 && distinct.contains(&output) {
        MergeStrategy::Native(output)
    } else {
        let from = distinct
            .iter()
            .map(|f| f.extension())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(DocMergeError::ConversionNotSupported { from, to: output });
    };

    Ok(MergePlan {
        output,
        reason,
        strategy,
    })
}
