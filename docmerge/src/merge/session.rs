//! A merge session: the document list, its pipelines and the live output.

use super::job::ProcessingJob;
use super::orchestrator::{CancelToken, Orchestrator};
use super::pipeline::process_document;
use super::progress::MergeObserver;
use crate::config::{ChunkConfig, MergeOptions, ProcessingLimits};
use crate::convert::PageLayout;
use crate::document::{DocumentHandle, DocumentId, DocumentList, PipelineStage};
use crate::error::Result;
use crate::format::{FileInput, FormatValidator};
use crate::resources::{OutputHandle, OutputRegistry};
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of one [`MergeSession::process_pending`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    /// Documents that reached `processed`.
    pub processed: usize,
    /// Documents that ended in `error`.
    pub failed: usize,
}

/// Owns everything a user works with between upload and download.
///
/// The live output is released when a document is removed, when the job is
/// cancelled or replaced, and on teardown.
#[derive(Debug, Default)]
pub struct MergeSession {
    documents: DocumentList,
    validator: FormatValidator,
    orchestrator: Orchestrator,
    outputs: OutputRegistry,
    current: Option<OutputHandle>,
    last_job: Option<ProcessingJob>,
    cancel: CancelToken,
}

impl MergeSession {
    /// Session with explicit limits and chunking.
    pub fn new(limits: ProcessingLimits, chunk_config: ChunkConfig) -> Self {
        Self {
            documents: DocumentList::new(limits),
            validator: FormatValidator::new(limits),
            orchestrator: Orchestrator::new(chunk_config, PageLayout::default()),
            ..Default::default()
        }
    }

    /// Documents in merge order.
    pub fn documents(&self) -> &DocumentList {
        &self.documents
    }

    /// The orchestrator running this session's jobs.
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Registry holding the live output.
    pub fn outputs(&self) -> &OutputRegistry {
        &self.outputs
    }

    /// Handle of the live output.
    pub fn output(&self) -> Option<&OutputHandle> {
        self.current.as_ref()
    }

    /// The most recent job. Its output, if any, lives in
    /// [`output`](Self::output).
    pub fn last_job(&self) -> Option<&ProcessingJob> {
        self.last_job.as_ref()
    }

    /// Token that stops the next or running merge.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Add uploaded files as pending documents.
    ///
    /// # Errors
    ///
    /// [`DocMergeError::TooManyFiles`](crate::DocMergeError::TooManyFiles)
    /// when the batch would exceed the file-count limit; nothing is added.
    pub fn add_files(&mut self, files: Vec<FileInput>) -> Result<Vec<DocumentId>> {
        self.validator
            .validate_batch(self.documents.len(), files.len())?;
        let ids = self.documents.add(files)?;
        debug!(added = ids.len(), total = self.documents.len(), "Added documents");
        Ok(ids)
    }

    /// Run every pending document through its pipeline.
    ///
    /// Pipelines run concurrently, bounded by the chunk processor's file
    /// concurrency, and each touches only its own handle.
    pub async fn process_pending(&mut self, observer: &dyn MergeObserver) -> PipelineSummary {
        let validator = &self.validator;
        let chunks = self.orchestrator.chunks();
        let pending: Vec<&mut DocumentHandle> = self
            .documents
            .iter_mut()
            .filter(|d| d.stage == PipelineStage::Pending)
            .collect();

        let stages = chunks
            .process_files(pending, |handle| {
                process_document(handle, validator, chunks, observer)
            })
            .await;

        let processed = stages
            .iter()
            .filter(|s| **s == PipelineStage::Processed)
            .count();
        let summary = PipelineSummary {
            processed,
            failed: stages.len() - processed,
        };
        info!(processed = summary.processed, failed = summary.failed, "Documents processed");
        summary
    }

    /// Remove a document and release the live output.
    pub fn remove_document(&mut self, id: DocumentId) -> Option<DocumentHandle> {
        let removed = self.documents.remove(id)?;
        self.release_output();
        Some(removed)
    }

    /// Move a document to `index`.
    pub fn move_document(&mut self, id: DocumentId, index: usize) -> Result<()> {
        self.documents.move_to(id, index)
    }

    /// Replace the document order.
    pub fn reorder(&mut self, order: &[DocumentId]) -> Result<()> {
        self.documents.reorder(order)
    }

    /// Merge the settled documents, replacing any previous output.
    ///
    /// A failed job is returned as `Ok` with its classified error.
    ///
    /// # Errors
    ///
    /// Everything [`Orchestrator::merge`] rejects before running, and
    /// [`DocMergeError::Cancelled`](crate::DocMergeError::Cancelled).
    pub async fn merge(
        &mut self,
        options: MergeOptions,
        observer: &dyn MergeObserver,
    ) -> Result<&ProcessingJob> {
        self.release_output();
        self.last_job = None;

        let result = self
            .orchestrator
            .merge(&self.documents, options, observer, &self.cancel)
            .await;
        if self.cancel.is_cancelled() {
            self.cancel = CancelToken::new();
        }

        let mut job = result?;
        if let Some(output) = job.result.take() {
            self.current = Some(self.outputs.register(output));
        }
        let job = self.last_job.insert(job);
        Ok(&*job)
    }

    /// Stop the running merge, if any, and discard the job and its output.
    pub fn cancel(&mut self) {
        if self.orchestrator.is_busy() {
            self.cancel.cancel();
        }
        self.last_job = None;
        self.release_output();
    }

    /// Release every resource and forget all documents.
    pub fn teardown(&mut self) {
        self.cancel();
        let revoked = self.outputs.revoke_all();
        self.documents.clear();
        debug!(revoked, "Session torn down");
    }

    fn release_output(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocMergeError;
    use crate::format::LogicalFormat;
    use crate::merge::job::JobStatus;
    use crate::merge::progress::NoopObserver;

    fn text(name: &str, body: &str) -> FileInput {
        FileInput::from_name(name, body.as_bytes().to_vec())
    }

    async fn session_with(files: Vec<FileInput>) -> MergeSession {
        let mut session = MergeSession::default();
        session.add_files(files).unwrap();
        session.process_pending(&NoopObserver).await;
        session
    }

    #[tokio::test]
    async fn test_process_pending_reports_outcomes() {
        let mut session = MergeSession::default();
        session
            .add_files(vec![text("a.txt", "alpha"), text("b.bin", "??")])
            .unwrap();

        let summary = session.process_pending(&NoopObserver).await;
        assert_eq!(summary, PipelineSummary { processed: 1, failed: 1 });
        assert!(session.documents().all_settled());

        let again = session.process_pending(&NoopObserver).await;
        assert_eq!(again, PipelineSummary::default());
    }

    #[tokio::test]
    async fn test_merge_registers_one_output() {
        let mut session = session_with(vec![text("a.txt", "alpha"), text("b.txt", "beta")]).await;

        let job = session.merge(MergeOptions::default(), &NoopObserver).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.output_format, LogicalFormat::Txt);

        let output = session.output().unwrap().output().unwrap();
        assert_eq!(output.file_name, "merged.txt");
        assert_eq!(session.outputs().len(), 1);

        session.merge(MergeOptions::default(), &NoopObserver).await.unwrap();
        assert_eq!(session.outputs().len(), 1);
    }

    #[tokio::test]
    async fn test_removing_a_document_releases_the_output() {
        let mut session = session_with(vec![text("a.txt", "alpha"), text("b.txt", "beta")]).await;
        session.merge(MergeOptions::default(), &NoopObserver).await.unwrap();
        let first = session.documents().ids()[0];

        assert!(session.remove_document(first).is_some());
        assert!(session.output().is_none());
        assert!(session.outputs().is_empty());
        assert_eq!(session.documents().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_and_teardown_release_everything() {
        let mut session = session_with(vec![text("a.txt", "alpha")]).await;
        session.merge(MergeOptions::default(), &NoopObserver).await.unwrap();

        session.cancel();
        assert!(session.last_job().is_none());
        assert!(session.outputs().is_empty());

        session.merge(MergeOptions::default(), &NoopObserver).await.unwrap();
        session.teardown();
        assert!(session.outputs().is_empty());
        assert!(session.documents().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_token_stops_the_next_merge_once() {
        let mut session = session_with(vec![text("a.txt", "alpha")]).await;
        session.cancel_token().cancel();

        let err = session
            .merge(MergeOptions::default(), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, DocMergeError::Cancelled));
        assert!(session.output().is_none());

        assert!(session.merge(MergeOptions::default(), &NoopObserver).await.is_ok());
    }

    #[test]
    fn test_batch_limit_is_enforced() {
        let limits = ProcessingLimits {
            max_files: 2,
            ..Default::default()
        };
        let mut session = MergeSession::new(limits, ChunkConfig::default());
        let err = session
            .add_files(vec![text("a.txt", "a"), text("b.txt", "b"), text("c.txt", "c")])
            .unwrap_err();
        assert!(matches!(err, DocMergeError::TooManyFiles { .. }));
        assert!(session.documents().is_empty());
    }

    #[tokio::test]
    async fn test_reorder_changes_merge_order() {
        let mut session = session_with(vec![text("a.txt", "alpha"), text("b.txt", "beta")]).await;
        let mut order = session.documents().ids();
        order.reverse();
        session.reorder(&order).unwrap();

        session.merge(MergeOptions::default(), &NoopObserver).await.unwrap();
        let data = session.output().unwrap().data().unwrap();
        let merged = String::from_utf8(data.to_vec()).unwrap();
        assert!(merged.find("beta").unwrap() < merged.find("alpha").unwrap());
    }
}
