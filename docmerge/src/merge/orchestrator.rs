//! Merge orchestration.
//!
//! The [`Orchestrator`] turns the current document list into a job, picks the
//! output format, dispatches to a native same-format merge or to the
//! conversion bridge followed by a PDF merge, and reports progress along the
//! way. Only one job may run at a time.

use super::decision::{MergePlan, MergeStrategy, plan_merge};
use super::job::{ActiveJobGuard, JobStatus, ProcessingJob};
use super::progress::{ANALYZED, COMPLETE, MERGED, MergeObserver, ProgressTracker, VALIDATED};
use crate::adapters::adapter_for;
use crate::adapters::pdf::merge_pdf_buffers;
use crate::chunk::ChunkProcessor;
use crate::classify::ErrorContext;
use crate::config::{ChunkConfig, MergeOptions};
use crate::convert::{ConversionBridge, PageLayout};
use crate::document::{DocumentId, DocumentList, DocumentMetadata, SourceDocument};
use crate::error::{DocMergeError, Result};
use crate::format::LogicalFormat;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Percent reached when every bridge conversion is done.
const CONVERTED: f32 = 85.0;

/// Cooperative cancellation flag shared with a running job.
///
/// Clones share the flag. The job checks it at every yield point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DocMergeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The merged document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutput {
    /// Output bytes.
    #[serde(skip)]
    pub data: Bytes,
    /// Length of `data`.
    pub size: usize,
    /// Media type of `data`.
    pub media_type: String,
    /// Suggested file name, extension included.
    pub file_name: String,
    /// Format the bytes are encoded in.
    pub format: LogicalFormat,
    /// Format the job decided on.
    pub requested_format: LogicalFormat,
    /// Whether `format` differs from `requested_format`.
    pub degraded: bool,
}

/// One document taking part in a merge.
#[derive(Debug, Clone)]
struct MergeInput {
    id: DocumentId,
    source: SourceDocument,
    format: LogicalFormat,
    metadata: Option<DocumentMetadata>,
    problem: Option<String>,
}

/// Result of converting one document for the bridge.
enum Converted {
    Pdf(SourceDocument),
    Placeholder(SourceDocument, String),
    Skipped(String),
    Cancelled,
}

/// Drives merge jobs over a [`DocumentList`].
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    chunks: ChunkProcessor,
    bridge: ConversionBridge,
    active: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Orchestrator with explicit chunking and page layout.
    pub fn new(chunk_config: ChunkConfig, layout: PageLayout) -> Self {
        Self {
            chunks: ChunkProcessor::new(chunk_config),
            bridge: ConversionBridge::new(layout),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Chunk processor shared with the document pipelines.
    pub fn chunks(&self) -> &ChunkProcessor {
        &self.chunks
    }

    /// Conversion bridge in use.
    pub fn bridge(&self) -> &ConversionBridge {
        &self.bridge
    }

    /// Whether a job is running.
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Build a queued job without running it.
    ///
    /// The job lists the eligible documents in merge order together with the
    /// decided output format.
    ///
    /// # Errors
    ///
    /// Invalid options, unsettled documents, an empty eligible set or an
    /// unsupported format combination. Nothing is processed in any case.
    pub fn create_job(
        &self,
        documents: &DocumentList,
        options: MergeOptions,
    ) -> Result<ProcessingJob> {
        self.prepare(documents, options).map(|(job, _, _)| job)
    }

    fn prepare(
        &self,
        documents: &DocumentList,
        options: MergeOptions,
    ) -> Result<(ProcessingJob, MergePlan, Vec<MergeInput>)> {
        options.validate()?;

        let order = match &options.custom_order {
            Some(order) => {
                options.validate_order(&documents.ids())?;
                order.clone()
            }
            None => documents.ids(),
        };

        let handles: Vec<_> = order.iter().filter_map(|id| documents.get(*id)).collect();
        let pending = handles.iter().filter(|d| !d.stage.is_terminal()).count();
        if pending > 0 {
            return Err(DocMergeError::DocumentsNotReady { pending });
        }

        let mut skipped = Vec::new();
        let mut inputs = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.format {
                Some(format) if handle.is_eligible() => inputs.push(MergeInput {
                    id: handle.id,
                    source: handle.to_source(),
                    format,
                    metadata: handle.metadata.clone(),
                    problem: handle.error.as_ref().map(|e| {
                        e.technical_details.clone().unwrap_or_else(|| e.message.clone())
                    }),
                }),
                _ => {
                    let reason = handle
                        .error
                        .as_ref()
                        .map_or_else(|| "not mergeable".to_string(), |e| e.title.clone());
                    skipped.push(format!("{}: excluded ({reason})", handle.name));
                }
            }
        }

        let formats: Vec<LogicalFormat> = inputs.iter().map(|i| i.format).collect();
        let plan = plan_merge(&formats, options.output_format)?;

        let ids = inputs.iter().map(|i| i.id).collect();
        let mut job = ProcessingJob::new(ids, options, &plan);
        job.warnings = skipped;
        Ok((job, plan, inputs))
    }

    /// Run a merge job to completion.
    ///
    /// Processing failures do not surface as `Err`: the job is returned in
    /// the `failed` status with a classified error and no output.
    ///
    /// # Errors
    ///
    /// [`DocMergeError::JobAlreadyActive`] while another job runs, any
    /// error from [`create_job`](Self::create_job), and
    /// [`DocMergeError::Cancelled`] when `cancel` fires; the job is
    /// discarded in that case.
    pub async fn merge(
        &self,
        documents: &DocumentList,
        options: MergeOptions,
        observer: &dyn MergeObserver,
        cancel: &CancelToken,
    ) -> Result<ProcessingJob> {
        let _guard = ActiveJobGuard::acquire(&self.active)?;
        let (mut job, plan, inputs) = self.prepare(documents, options)?;
        job.transition(JobStatus::Processing)?;

        info!(
            job = %job.id,
            documents = inputs.len(),
            format = %plan.output,
            reason = %plan.reason,
            "Starting merge"
        );

        let tracker = ProgressTracker::new(observer);
        match self.run(&mut job, &plan, &inputs, &tracker, cancel).await {
            Ok(output) => {
                info!(
                    job = %job.id,
                    file = %output.file_name,
                    bytes = output.size,
                    degraded = output.degraded,
                    "Merge completed"
                );
                job.complete(output)?;
                tracker.advance(COMPLETE);
            }
            Err(DocMergeError::Cancelled) => {
                info!(job = %job.id, "Merge cancelled");
                return Err(DocMergeError::Cancelled);
            }
            Err(err) => {
                warn!(job = %job.id, error = %err, "Merge failed");
                job.fail(err.classify(Some(ErrorContext::Merge)))?;
            }
        }

        Ok(job)
    }

    async fn run(
        &self,
        job: &mut ProcessingJob,
        plan: &MergePlan,
        inputs: &[MergeInput],
        tracker: &ProgressTracker<'_>,
        cancel: &CancelToken,
    ) -> Result<MergeOutput> {
        for input in inputs {
            if let Some(problem) = &input.problem {
                job.warnings.push(format!("{}: {problem}", input.source.name));
            }
        }
        checkpoint(job, tracker, VALIDATED, cancel).await?;

        let pages: u32 = inputs
            .iter()
            .filter_map(|i| i.metadata.as_ref()?.page_count)
            .sum();
        let words: u64 = inputs
            .iter()
            .filter_map(|i| i.metadata.as_ref()?.word_count)
            .sum();
        debug!(job = %job.id, pages, words, "Analysis totals");
        checkpoint(job, tracker, ANALYZED, cancel).await?;

        let (data, content_format) = match plan.strategy {
            MergeStrategy::Bridge => self.bridge_merge(job, inputs, tracker, cancel).await?,
            MergeStrategy::Native(format) => {
                let sources: Vec<SourceDocument> = inputs.iter().map(|i| i.source.clone()).collect();
                let mut result = adapter_for(format).merge_same_format(&sources, &job.options);
                job.warnings.append(&mut result.warnings);
                let content_format = result.content_format.unwrap_or(format);
                (result.into_data()?, content_format)
            }
        };
        checkpoint(job, tracker, MERGED, cancel).await?;

        let degraded = content_format != plan.output;
        if degraded {
            job.warnings.push(format!(
                "{} output is not supported; produced {} instead",
                plan.output.display_name(),
                content_format.display_name()
            ));
        }

        Ok(MergeOutput {
            size: data.len(),
            media_type: content_format.media_type().to_string(),
            file_name: job.options.file_name_for(content_format),
            format: content_format,
            requested_format: plan.output,
            degraded,
            data,
        })
    }

    async fn bridge_merge(
        &self,
        job: &mut ProcessingJob,
        inputs: &[MergeInput],
        tracker: &ProgressTracker<'_>,
        cancel: &CancelToken,
    ) -> Result<(Bytes, LogicalFormat)> {
        let total = inputs.len();
        let done = AtomicUsize::new(0);
        let done = &done;
        let bridge = &self.bridge;
        let include_headers = job.options.include_headers;

        let converted = self
            .chunks
            .process_files(inputs.iter().collect(), move |input| async move {
                if cancel.is_cancelled() {
                    return Converted::Cancelled;
                }
                let name = &input.source.name;
                let outcome = match bridge.to_pdf(&input.source, input.format, include_headers) {
                    Ok(pdf) => Converted::Pdf(SourceDocument::new(name.clone(), pdf)),
                    Err(err) => {
                        warn!(file = %name, error = %err, "Conversion failed, using placeholder");
                        let warning = format!("{name}: {err}");
                        match bridge.placeholder(name, &err.to_string()) {
                            Ok(pdf) => {
                                Converted::Placeholder(SourceDocument::new(name.clone(), pdf), warning)
                            }
                            Err(_) => Converted::Skipped(warning),
                        }
                    }
                };
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                tracker.advance_within(ANALYZED, CONVERTED, finished, total);
                outcome
            })
            .await;

        let mut pdfs = Vec::with_capacity(total);
        let mut placeholders = 0;
        for outcome in converted {
            match outcome {
                Converted::Pdf(pdf) => pdfs.push(pdf),
                Converted::Placeholder(pdf, warning) => {
                    placeholders += 1;
                    job.warnings.push(warning);
                    pdfs.push(pdf);
                }
                Converted::Skipped(warning) => job.warnings.push(warning),
                Converted::Cancelled => return Err(DocMergeError::Cancelled),
            }
        }
        checkpoint(job, tracker, CONVERTED, cancel).await?;

        let outcome = merge_pdf_buffers(&pdfs, &job.options)?;
        job.warnings.extend(outcome.warnings);
        if outcome.documents_merged <= placeholders {
            return Err(DocMergeError::merge_failed(
                "none of the documents could be converted",
            ));
        }
        debug!(
            pages = outcome.page_count,
            documents = outcome.documents_merged,
            "Bridge merge finished"
        );

        Ok((Bytes::from(outcome.data), LogicalFormat::Pdf))
    }
}

/// Record progress, hand control back to the runtime, then honor
/// cancellation.
async fn checkpoint(
    job: &mut ProcessingJob,
    tracker: &ProgressTracker<'_>,
    percent: f32,
    cancel: &CancelToken,
) -> Result<()> {
    cancel.check()?;
    job.set_progress(tracker.advance(percent));
    tokio::task::yield_now().await;
    cancel.check()
}
