//! Progress reporting for merge jobs.

use crate::document::{DocumentId, PipelineStage};
use std::sync::Mutex;

/// Percent reached when validation is done.
pub const VALIDATED: f32 = 20.0;
/// Percent reached when analysis is done.
pub const ANALYZED: f32 = 60.0;
/// Percent reached when conversion and merging are done.
pub const MERGED: f32 = 90.0;
/// Percent reached when the output is assembled.
pub const COMPLETE: f32 = 100.0;

/// Receives progress callbacks. Every method has an empty default.
pub trait MergeObserver: Send + Sync {
    /// Job progress as a fraction in `0.0..=1.0`, never decreasing.
    fn on_progress(&self, _fraction: f32) {}

    /// A slice of a chunked operation finished (`index` is 1-based).
    fn on_chunk_processed(&self, _index: usize, _total: usize) {}

    /// A document moved to a new pipeline stage.
    fn on_document_stage(&self, _id: DocumentId, _stage: PipelineStage) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MergeObserver for NoopObserver {}

/// Monotonic percent counter that forwards fractions to an observer.
///
/// Safe to share between the concurrent futures of one job.
pub struct ProgressTracker<'a> {
    observer: &'a dyn MergeObserver,
    percent: Mutex<f32>,
}

impl<'a> ProgressTracker<'a> {
    /// Tracker starting at 0%.
    pub fn new(observer: &'a dyn MergeObserver) -> Self {
        Self {
            observer,
            percent: Mutex::new(0.0),
        }
    }

    /// Move to `percent` if that is forward; returns the current value.
    pub fn advance(&self, percent: f32) -> f32 {
        let mut current = match self.percent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let target = percent.clamp(0.0, COMPLETE);
        if target > *current {
            *current = target;
            self.observer.on_progress(target / COMPLETE);
        }
        *current
    }

    /// Advance to the point `done / total` of the way from `from` to `to`.
    pub fn advance_within(&self, from: f32, to: f32, done: usize, total: usize) -> f32 {
        let share = if total == 0 {
            1.0
        } else {
            done.min(total) as f32 / total as f32
        };
        self.advance(from + (to - from) * share)
    }

    /// Current percent.
    pub fn percent(&self) -> f32 {
        match self.percent.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// The observer progress is forwarded to.
    pub fn observer(&self) -> &'a dyn MergeObserver {
        self.observer
    }
}
