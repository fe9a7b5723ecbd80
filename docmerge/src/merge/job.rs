//! Merge jobs and the single-active-job rule.

use super::decision::{FormatReason, MergePlan};
use super::orchestrator::MergeOutput;
use crate::classify::ClassifiedError;
use crate::config::MergeOptions;
use crate::document::DocumentId;
use crate::error::{DocMergeError, Result};
use crate::format::LogicalFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Job lifecycle: `queued -> processing -> completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, not started.
    Queued,
    /// Running.
    Processing,
    /// Finished with output.
    Completed,
    /// Finished without output.
    Failed,
}

impl JobStatus {
    /// Whether the status is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving to `next` is allowed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Processing)
                | (Self::Queued, Self::Failed)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// One merge request and its outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingJob {
    /// Job id.
    pub id: Uuid,
    /// Documents in merge order.
    pub document_ids: Vec<DocumentId>,
    /// Options captured at creation.
    pub options: MergeOptions,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Percent complete, 0 to 100, never decreasing.
    pub progress: f32,
    /// Decided output format.
    pub output_format: LogicalFormat,
    /// Why that format.
    pub format_reason: FormatReason,
    /// Output, once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MergeOutput>,
    /// Failure, once failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ClassifiedError>,
    /// Problems absorbed along the way.
    pub warnings: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time the job reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProcessingJob {
    /// A queued job for `plan`.
    pub fn new(document_ids: Vec<DocumentId>, options: MergeOptions, plan: &MergePlan) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_ids,
            options,
            status: JobStatus::Queued,
            progress: 0.0,
            output_format: plan.output,
            format_reason: plan.reason,
            result: None,
            error: None,
            warnings: Vec::new(),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// [`DocMergeError::InvalidTransition`] for anything outside the
    /// lifecycle, including leaving a terminal status.
    pub fn transition(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DocMergeError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Raise progress to `percent`; lower values are ignored.
    pub fn set_progress(&mut self, percent: f32) {
        self.progress = self.progress.max(percent.clamp(0.0, 100.0));
    }

    /// Record the output and finish.
    pub fn complete(&mut self, output: MergeOutput) -> Result<()> {
        self.transition(JobStatus::Completed)?;
        self.set_progress(100.0);
        self.result = Some(output);
        Ok(())
    }

    /// Record the failure and finish.
    pub fn fail(&mut self, error: ClassifiedError) -> Result<()> {
        self.transition(JobStatus::Failed)?;
        self.result = None;
        self.error = Some(error);
        Ok(())
    }

    /// The output, or the recorded failure as an error.
    pub fn into_output(self) -> Result<MergeOutput> {
        match (self.result, self.error) {
            (Some(output), _) => Ok(output),
            (None, Some(error)) => Err(DocMergeError::merge_failed(error.to_string())),
            (None, None) => Err(DocMergeError::merge_failed(format!(
                "job is {}",
                self.status
            ))),
        }
    }
}

/// Holds the single active-job slot until dropped.
#[derive(Debug)]
pub struct ActiveJobGuard {
    slot: Arc<AtomicBool>,
}

impl ActiveJobGuard {
    /// Claim `slot`.
    ///
    /// # Errors
    ///
    /// [`DocMergeError::JobAlreadyActive`] if another guard holds it.
    pub fn acquire(slot: &Arc<AtomicBool>) -> Result<Self> {
        slot.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DocMergeError::JobAlreadyActive)?;
        Ok(Self {
            slot: Arc::clone(slot),
        })
    }
}

impl Drop for ActiveJobGuard {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorCode;
    use crate::merge::decision::{MergeStrategy, plan_merge};
    use rstest::rstest;

    fn job() -> ProcessingJob {
        let plan = plan_merge(&[LogicalFormat::Pdf], None).unwrap();
        ProcessingJob::new(vec![DocumentId::new()], MergeOptions::default(), &plan)
    }

    #[rstest]
    #[case(JobStatus::Queued, JobStatus::Processing, true)]
    #[case(JobStatus::Queued, JobStatus::Failed, true)]
    #[case(JobStatus::Queued, JobStatus::Completed, false)]
    #[case(JobStatus::Processing, JobStatus::Completed, true)]
    #[case(JobStatus::Processing, JobStatus::Queued, false)]
    #[case(JobStatus::Completed, JobStatus::Failed, false)]
    #[case(JobStatus::Failed, JobStatus::Processing, false)]
    fn test_transitions(#[case] from: JobStatus, #[case] to: JobStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_job_reaches_exactly_one_terminal_status() {
        let mut job = job();
        assert_eq!(job.status, JobStatus::Queued);
        job.transition(JobStatus::Processing).unwrap();
        job.fail(ClassifiedError::new(ErrorCode::MergeFailed)).unwrap();
        assert!(job.finished_at.is_some());

        let err = job.transition(JobStatus::Completed).unwrap_err();
        assert!(matches!(err, DocMergeError::InvalidTransition { .. }));
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut job = job();
        job.set_progress(60.0);
        job.set_progress(20.0);
        assert_eq!(job.progress, 60.0);
        job.set_progress(250.0);
        assert_eq!(job.progress, 100.0);
    }

    #[test]
    fn test_job_records_plan() {
        let plan = plan_merge(&[LogicalFormat::Docx, LogicalFormat::Docx], None).unwrap();
        assert_eq!(plan.strategy, MergeStrategy::Bridge);
        let job = ProcessingJob::new(Vec::new(), MergeOptions::default(), &plan);
        assert_eq!(job.output_format, LogicalFormat::Pdf);
        assert_eq!(job.format_reason, FormatReason::MultiWordRedirect);
    }

    #[test]
    fn test_guard_allows_one_holder() {
        let slot = Arc::new(AtomicBool::new(false));
        let guard = ActiveJobGuard::acquire(&slot).unwrap();
        assert!(matches!(
            ActiveJobGuard::acquire(&slot),
            Err(DocMergeError::JobAlreadyActive)
        ));
        drop(guard);
        assert!(ActiveJobGuard::acquire(&slot).is_ok());
    }
}
