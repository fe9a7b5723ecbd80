//! Document handles and the user-arranged document list.

use crate::classify::ClassifiedError;
use crate::config::ProcessingLimits;
use crate::error::{DocMergeError, Result};
use crate::format::{FileInput, LogicalFormat};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-document processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Uploaded, not yet picked up.
    Pending,
    /// Size/format/structure checks.
    Validating,
    /// Metadata extraction.
    Analyzing,
    /// Preview generation.
    Previewing,
    /// Ready to merge.
    Processed,
    /// Failed; see the handle's error.
    Error,
}

impl PipelineStage {
    /// Whether the stage is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Error)
    }
}

/// Coarse status derived from the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Not started.
    Pending,
    /// In one of the working stages.
    Processing,
    /// Ready.
    Processed,
    /// Failed.
    Error,
}

impl From<PipelineStage> for DocumentStatus {
    fn from(stage: PipelineStage) -> Self {
        match stage {
            PipelineStage::Pending => Self::Pending,
            PipelineStage::Validating | PipelineStage::Analyzing | PipelineStage::Previewing => {
                Self::Processing
            }
            PipelineStage::Processed => Self::Processed,
            PipelineStage::Error => Self::Error,
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Error => "error",
        };
        f.write_str(text)
    }
}

/// Best-effort facts about a document. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Pages (PDF, Word).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Worksheets (Excel).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_count: Option<u32>,
    /// Slides (PowerPoint).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_count: Option<u32>,
    /// Words in the extracted text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,
    /// Document title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Document author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Creation date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    /// Last modification date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
}

/// A document as tracked by a session.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    /// Stable id.
    pub id: DocumentId,
    /// The uploaded file.
    pub source: FileInput,
    /// Display name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Detected format.
    pub format: Option<LogicalFormat>,
    /// Current stage.
    pub stage: PipelineStage,
    /// Metadata once analyzed.
    pub metadata: Option<DocumentMetadata>,
    /// Preview text once generated.
    pub preview: Option<String>,
    /// Progress in `[0, 1]`.
    pub progress: f32,
    /// Failure, if any.
    pub error: Option<ClassifiedError>,
    /// Set when the document failed basic validation and cannot be merged.
    pub excluded: bool,
}

impl DocumentHandle {
    /// Wrap an uploaded file.
    pub fn new(source: FileInput) -> Self {
        Self {
            id: DocumentId::new(),
            name: source.name.clone(),
            size: source.size,
            source,
            format: None,
            stage: PipelineStage::Pending,
            metadata: None,
            preview: None,
            progress: 0.0,
            error: None,
            excluded: false,
        }
    }

    /// Coarse status.
    pub fn status(&self) -> DocumentStatus {
        self.stage.into()
    }

    /// Whether the document can take part in a merge.
    pub fn is_eligible(&self) -> bool {
        self.stage.is_terminal() && !self.excluded && self.format.is_some()
    }

    /// Move to `stage` and bump progress; progress never decreases.
    pub fn advance(&mut self, stage: PipelineStage, progress: f32) {
        self.stage = stage;
        self.progress = self.progress.max(progress.clamp(0.0, 1.0));
    }

    /// Mark as failed.
    pub fn fail(&mut self, error: ClassifiedError) {
        self.stage = PipelineStage::Error;
        self.progress = 1.0;
        self.error = Some(error);
    }

    /// Bytes and name handed to adapters.
    pub fn to_source(&self) -> SourceDocument {
        SourceDocument::new(self.name.clone(), self.source.data.clone())
    }
}

/// Ordered list of uploaded documents.
///
/// The order is the merge order unless a job supplies its own.
#[derive(Debug, Clone, Default)]
pub struct DocumentList {
    documents: Vec<DocumentHandle>,
    limits: ProcessingLimits,
}

impl DocumentList {
    /// Empty list with the given limits.
    pub fn new(limits: ProcessingLimits) -> Self {
        Self {
            documents: Vec::new(),
            limits,
        }
    }

    /// Append files, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DocMergeError::TooManyFiles`] if the batch would exceed the
    /// file-count limit.
    pub fn add(&mut self, files: Vec<FileInput>) -> Result<Vec<DocumentId>> {
        let count = self.documents.len() + files.len();
        if count > self.limits.max_files {
            return Err(DocMergeError::TooManyFiles {
                count,
                limit: self.limits.max_files,
            });
        }

        let ids = files
            .into_iter()
            .map(|file| {
                let handle = DocumentHandle::new(file);
                let id = handle.id;
                self.documents.push(handle);
                id
            })
            .collect();
        Ok(ids)
    }

    /// Remove a document, returning it.
    pub fn remove(&mut self, id: DocumentId) -> Option<DocumentHandle> {
        let index = self.position(id)?;
        Some(self.documents.remove(index))
    }

    /// Move a document to `index` (clamped to the list length).
    pub fn move_to(&mut self, id: DocumentId, index: usize) -> Result<()> {
        let from = self
            .position(id)
            .ok_or_else(|| DocMergeError::invalid_options(format!("Unknown document {id}")))?;
        let handle = self.documents.remove(from);
        let to = index.min(self.documents.len());
        self.documents.insert(to, handle);
        Ok(())
    }

    /// Replace the order with `order`, which must be a permutation of the
    /// current ids.
    pub fn reorder(&mut self, order: &[DocumentId]) -> Result<()> {
        if order.len() != self.documents.len() {
            return Err(DocMergeError::invalid_options(format!(
                "Reorder expects {} ids, got {}",
                self.documents.len(),
                order.len()
            )));
        }

        let mut indices = Vec::with_capacity(order.len());
        for id in order {
            match self.position(*id) {
                Some(index) if !indices.contains(&index) => indices.push(index),
                _ => {
                    return Err(DocMergeError::invalid_options(format!(
                        "Unknown or repeated document {id}"
                    )));
                }
            }
        }

        let mut slots: Vec<Option<DocumentHandle>> =
            std::mem::take(&mut self.documents).into_iter().map(Some).collect();
        self.documents = indices
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();
        Ok(())
    }

    /// Look up a document.
    pub fn get(&self, id: DocumentId) -> Option<&DocumentHandle> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Look up a document mutably.
    pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut DocumentHandle> {
        self.documents.iter_mut().find(|d| d.id == id)
    }

    /// Index of a document.
    pub fn position(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| d.id == id)
    }

    /// Documents in list order.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentHandle> {
        self.documents.iter()
    }

    /// Documents in list order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DocumentHandle> {
        self.documents.iter_mut()
    }

    /// Ids in list order.
    pub fn ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|d| d.id).collect()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Whether every document has reached a terminal stage.
    pub fn all_settled(&self) -> bool {
        self.documents.iter().all(|d| d.stage.is_terminal())
    }

    /// Drop every document.
    pub fn clear(&mut self) {
        self.documents.clear();
    }
}

/// Name and bytes of one merge input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Display name.
    pub name: String,
    /// Content.
    pub data: Bytes,
}

impl SourceDocument {
    /// Create a source.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Outcome of a same-format merge.
#[derive(Debug, Clone, Default)]
pub struct ProcessorResult {
    /// Whether output was produced.
    pub success: bool,
    /// Output bytes.
    pub data: Option<Bytes>,
    /// Metadata of the output.
    pub metadata: Option<DocumentMetadata>,
    /// Fatal error when nothing was produced.
    pub error: Option<String>,
    /// Per-document problems that were absorbed.
    pub warnings: Vec<String>,
    /// Format the bytes are actually encoded in.
    pub content_format: Option<LogicalFormat>,
}

impl ProcessorResult {
    /// Successful result.
    pub fn ok(data: impl Into<Bytes>, format: LogicalFormat) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            content_format: Some(format),
            ..Default::default()
        }
    }

    /// Failed result.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Attach absorbed warnings.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Convert into the output bytes or a merge error.
    pub fn into_data(self) -> Result<Bytes> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(DocMergeError::merge_failed(
                self.error.unwrap_or_else(|| "no output produced".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(n: usize) -> Vec<FileInput> {
        (0..n)
            .map(|i| FileInput::from_name(format!("f{i}.txt"), b"x".to_vec()))
            .collect()
    }

    #[test]
    fn test_status_derived_from_stage() {
        let mut handle = DocumentHandle::new(FileInput::from_name("a.txt", b"a".to_vec()));
        assert_eq!(handle.status(), DocumentStatus::Pending);
        handle.advance(PipelineStage::Analyzing, 0.4);
        assert_eq!(handle.status(), DocumentStatus::Processing);
        handle.advance(PipelineStage::Processed, 1.0);
        assert_eq!(handle.status(), DocumentStatus::Processed);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut handle = DocumentHandle::new(FileInput::from_name("a.txt", b"a".to_vec()));
        handle.advance(PipelineStage::Analyzing, 0.6);
        handle.advance(PipelineStage::Previewing, 0.3);
        assert_eq!(handle.progress, 0.6);
    }

    #[test]
    fn test_add_enforces_limit_atomically() {
        let mut list = DocumentList::new(ProcessingLimits {
            max_files: 3,
            ..Default::default()
        });
        list.add(files(2)).unwrap();
        let err = list.add(files(2)).unwrap_err();
        assert!(matches!(err, DocMergeError::TooManyFiles { count: 4, limit: 3 }));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_move_and_remove_keep_identity() {
        let mut list = DocumentList::default();
        let ids = list.add(files(3)).unwrap();

        list.move_to(ids[2], 0).unwrap();
        assert_eq!(list.ids(), vec![ids[2], ids[0], ids[1]]);

        let removed = list.remove(ids[0]).unwrap();
        assert_eq!(removed.name, "f0.txt");
        assert_eq!(list.ids(), vec![ids[2], ids[1]]);
        assert!(list.remove(ids[0]).is_none());
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let mut list = DocumentList::default();
        let ids = list.add(files(3)).unwrap();

        list.reorder(&[ids[1], ids[2], ids[0]]).unwrap();
        assert_eq!(list.ids(), vec![ids[1], ids[2], ids[0]]);

        assert!(list.reorder(&[ids[0], ids[0], ids[1]]).is_err());
        assert!(list.reorder(&[ids[0]]).is_err());
    }

    #[test]
    fn test_all_settled() {
        let mut list = DocumentList::default();
        let ids = list.add(files(2)).unwrap();
        assert!(!list.all_settled());
        for id in ids {
            list.get_mut(id).unwrap().advance(PipelineStage::Processed, 1.0);
        }
        assert!(list.all_settled());
    }

    #[test]
    fn test_processor_result_into_data() {
        let ok = ProcessorResult::ok(b"out".to_vec(), LogicalFormat::Txt);
        assert_eq!(ok.into_data().unwrap(), Bytes::from_static(b"out"));

        let err = ProcessorResult::failed("nothing readable").into_data().unwrap_err();
        assert!(err.to_string().contains("nothing readable"));
    }
}
