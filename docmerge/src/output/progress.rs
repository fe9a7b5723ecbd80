//! Terminal progress display.
//!
//! [`ProgressBar`] draws on stderr so stdout stays usable for `--json`.
//! [`ProgressReporter`] adapts it to [`MergeObserver`].
//!
//! # Examples
//!
//! ```
//! use docmerge::output::progress::{ProgressBar, ProgressStyle};
//!
//! let mut bar = ProgressBar::hidden(100, ProgressStyle::Bar);
//! bar.set_message("Merging");
//! bar.set_position(60);
//! assert_eq!(bar.percent(), 60.0);
//! ```

use crate::document::{DocumentId, PipelineStage};
use crate::merge::MergeObserver;
use crate::utils::format_duration;
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Look of the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStyle {
    /// `[=====>    ] 50%`
    Bar,
    /// Rotating frame, for work of unknown length.
    Spinner,
    /// `3/10`
    Counter,
}

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const BAR_WIDTH: usize = 30;

/// Single-line progress indicator.
#[derive(Debug)]
pub struct ProgressBar {
    total: usize,
    position: usize,
    style: ProgressStyle,
    message: Option<String>,
    started: Instant,
    last_draw: Option<Instant>,
    interval: Duration,
    enabled: bool,
    frame: usize,
}

impl ProgressBar {
    /// Indicator drawn only when stderr is a terminal.
    pub fn new(total: usize, style: ProgressStyle) -> Self {
        Self {
            total,
            position: 0,
            style,
            message: None,
            started: Instant::now(),
            last_draw: None,
            interval: Duration::from_millis(80),
            enabled: io::stderr().is_terminal(),
            frame: 0,
        }
    }

    /// Indicator that never draws.
    pub fn hidden(total: usize, style: ProgressStyle) -> Self {
        Self {
            enabled: false,
            ..Self::new(total, style)
        }
    }

    /// Text shown before the indicator.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.draw(false);
    }

    /// Move to `position` (clamped to the total). Redraws are rate limited.
    pub fn set_position(&mut self, position: usize) {
        self.position = if self.total > 0 {
            position.min(self.total)
        } else {
            position
        };
        self.draw(false);
    }

    /// Advance by one.
    pub fn inc(&mut self) {
        self.set_position(self.position + 1);
    }

    /// Current position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Percent of the total, 0 when the total is 0.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.position.min(self.total) as f64 / self.total as f64 * 100.0
        }
    }

    /// Jump to the end, draw once more and end the line.
    pub fn finish_with_message(&mut self, message: impl Into<String>) {
        self.position = self.total;
        self.message = Some(message.into());
        if self.enabled {
            self.draw(true);
            eprintln!();
            self.enabled = false;
        }
    }

    /// Erase the line without finishing.
    pub fn clear(&mut self) {
        if self.enabled {
            eprint!("\r\x1b[K");
            io::stderr().flush().ok();
        }
    }

    /// The line as it would be drawn now.
    pub fn line(&self) -> String {
        let indicator = match self.style {
            ProgressStyle::Bar => {
                let filled = BAR_WIDTH * self.position.min(self.total) / self.total.max(1);
                let head = if filled > 0 && filled < BAR_WIDTH { ">" } else { "" };
                let body = "=".repeat(filled.saturating_sub(head.len()));
                format!(
                    "[{body}{head}{}] {:>3.0}%",
                    " ".repeat(BAR_WIDTH - filled),
                    self.percent()
                )
            }
            ProgressStyle::Spinner => SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()].to_string(),
            ProgressStyle::Counter => format!("{}/{}", self.position, self.total),
        };

        let elapsed = format_duration(self.started.elapsed());
        match &self.message {
            Some(message) => format!("{message} {indicator} {elapsed}"),
            None => format!("{indicator} {elapsed}"),
        }
    }

    fn draw(&mut self, force: bool) {
        if !self.enabled {
            return;
        }
        let due = self
            .last_draw
            .is_none_or(|last| last.elapsed() >= self.interval);
        if !force && !due {
            return;
        }
        self.last_draw = Some(Instant::now());
        self.frame += 1;
        eprint!("\r\x1b[K{}", self.line());
        io::stderr().flush().ok();
    }
}

/// [`MergeObserver`] that drives a [`ProgressBar`] counting to 100.
#[derive(Debug)]
pub struct ProgressReporter {
    bar: Mutex<ProgressBar>,
}

impl ProgressReporter {
    /// Reporter drawing when `enabled` and stderr is a terminal.
    pub fn new(message: &str, enabled: bool) -> Self {
        let mut bar = if enabled {
            ProgressBar::new(100, ProgressStyle::Bar)
        } else {
            ProgressBar::hidden(100, ProgressStyle::Bar)
        };
        bar.set_message(message);
        Self {
            bar: Mutex::new(bar),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&mut ProgressBar)) {
        let mut bar = match self.bar.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut bar);
    }

    /// Change the message.
    pub fn set_message(&self, message: &str) {
        self.with_bar(|bar| bar.set_message(message));
    }

    /// Current percent.
    pub fn percent(&self) -> f64 {
        let mut percent = 0.0;
        self.with_bar(|bar| percent = bar.percent());
        percent
    }

    /// Finish the bar with `message`.
    pub fn finish(&self, message: &str) {
        self.with_bar(|bar| bar.finish_with_message(message));
    }

    /// Erase the bar.
    pub fn clear(&self) {
        self.with_bar(|bar| bar.clear());
    }
}

impl MergeObserver for ProgressReporter {
    fn on_progress(&self, fraction: f32) {
        let position = (fraction.clamp(0.0, 1.0) * 100.0).round() as usize;
        self.with_bar(|bar| {
            if position > bar.position() {
                bar.set_position(position);
            }
        });
    }

    fn on_chunk_processed(&self, index: usize, total: usize) {
        tracing::trace!(index, total, "Chunk processed");
    }

    fn on_document_stage(&self, id: DocumentId, stage: PipelineStage) {
        tracing::trace!(document = %id, ?stage, "Document stage");
    }
}
