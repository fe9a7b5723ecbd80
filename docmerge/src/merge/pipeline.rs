//! Per-document pipeline: validate, analyze, preview.

use super::progress::MergeObserver;
use crate::adapters::{TextAdapter, adapter_for};
use crate::chunk::ChunkProcessor;
use crate::classify::ErrorContext;
use crate::document::{DocumentHandle, PipelineStage};
use crate::format::{FormatValidator, LogicalFormat};
use tracing::debug;

/// Run one document through the pipeline, touching only its own handle.
///
/// Failing the size, emptiness or format checks marks the document as
/// failed and excluded from merges. Failing the structural check marks it
/// failed but keeps it eligible; the adapters absorb it at merge time.
/// Analysis and previews never fail. Returns the final stage.
pub async fn process_document(
    handle: &mut DocumentHandle,
    validator: &FormatValidator,
    chunks: &ChunkProcessor,
    observer: &dyn MergeObserver,
) -> PipelineStage {
    let id = handle.id;
    let enter = |handle: &mut DocumentHandle, stage: PipelineStage, progress: f32| {
        handle.advance(stage, progress);
        observer.on_document_stage(id, stage);
        debug!(document = %handle.name, ?stage, "Pipeline stage");
    };

    enter(handle, PipelineStage::Validating, 0.1);
    let format = match validator.validate(&handle.source) {
        Ok(format) => format,
        Err(err) => {
            handle.excluded = true;
            handle.fail(err.classify(Some(ErrorContext::Upload)));
            observer.on_document_stage(id, PipelineStage::Error);
            return PipelineStage::Error;
        }
    };
    handle.format = Some(format);

    if let Err(err) = validator.validate_structure(&handle.source.data, format) {
        debug!(document = %handle.name, error = %err, "Structural validation failed");
        handle.fail(err.classify(Some(ErrorContext::Validation)));
        observer.on_document_stage(id, PipelineStage::Error);
        return PipelineStage::Error;
    }
    tokio::task::yield_now().await;

    enter(handle, PipelineStage::Analyzing, 0.4);
    let data = handle.source.data.clone();
    let large_text = matches!(format, LogicalFormat::Txt | LogicalFormat::Csv)
        && data.len() > chunks.config().chunk_size;
    let metadata = if large_text {
        let text = match format {
            LogicalFormat::Csv => TextAdapter::CSV,
            _ => TextAdapter::PLAIN,
        };
        text.analyze_chunked(&data, chunks, |done, total| {
            observer.on_chunk_processed(done, total)
        })
        .await
    } else {
        adapter_for(format).analyze(&data)
    };
    handle.metadata = Some(metadata);
    tokio::task::yield_now().await;

    enter(handle, PipelineStage::Previewing, 0.7);
    handle.preview = Some(adapter_for(format).preview(&data));

    enter(handle, PipelineStage::Processed, 1.0);
    PipelineStage::Processed
}
