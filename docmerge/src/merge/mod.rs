//! Merge orchestration.
//!
//! Documents move through [`pipeline::process_document`] independently. Once
//! all of them have settled, the [`Orchestrator`] decides the output format
//! ([`decision`]), runs a [`ProcessingJob`] and reports progress to a
//! [`MergeObserver`]. [`MergeSession`] ties the pieces together and owns the
//! live output.
//!
//! # Examples
//!
//! ```no_run
//! use docmerge::format::FileInput;
//! use docmerge::merge::{MergeSession, NoopObserver};
//! use docmerge::MergeOptions;
//!
//! # async fn example() -> docmerge::Result<()> {
//! let mut session = MergeSession::default();
//! session.add_files(vec![
//!     FileInput::from_name("a.pdf", std::fs::read("a.pdf")?),
//!     FileInput::from_name("notes.txt", std::fs::read("notes.txt")?),
//! ])?;
//! session.process_pending(&NoopObserver).await;
//!
//! let job = session.merge(MergeOptions::default(), &NoopObserver).await?;
//! println!("{} ({})", job.status, job.format_reason);
//! # Ok(())
//! # }
//! ```

pub mod decision;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod session;

pub use decision::{
    FormatReason, MergePlan, MergeStrategy, OutputDecision, decide_output_format, plan_merge,
};
pub use job::{ActiveJobGuard, JobStatus, ProcessingJob};
pub use orchestrator::{CancelToken, MergeOutput, Orchestrator};
pub use pipeline::process_document;
pub use progress::{MergeObserver, NoopObserver, ProgressTracker};
pub use session::{MergeSession, PipelineSummary};
