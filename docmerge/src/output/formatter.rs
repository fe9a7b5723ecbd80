//! Terminal messages for the CLI.
//!
//! # Examples
//!
//! ```
//! use docmerge::output::formatter::OutputFormatter;
//!
//! let formatter = OutputFormatter::new(false, false);
//! formatter.info("Reading 3 files");
//! formatter.success("Wrote merged.pdf");
//! ```

use crate::document::{DocumentHandle, DocumentStatus};
use crate::utils::format_file_size;
use std::io::{self, IsTerminal};

/// Kind of message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    /// Plain information.
    Info,
    /// Something finished.
    Success,
    /// Absorbed problem.
    Warning,
    /// Failure.
    Error,
    /// Verbose detail.
    Debug,
}

impl MessageLevel {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Info => "",
            Self::Success => "✓ ",
            Self::Warning => "⚠ ",
            Self::Error => "✗ ",
            Self::Debug => "→ ",
        }
    }

    fn color(&self) -> Option<&'static str> {
        match self {
            Self::Info => None,
            Self::Success => Some("\x1b[32m"),
            Self::Warning => Some("\x1b[33m"),
            Self::Error => Some("\x1b[31m"),
            Self::Debug => Some("\x1b[36m"),
        }
    }

    fn to_stderr(&self) -> bool {
        matches!(self, Self::Warning | Self::Error)
    }
}

/// Writes user-facing messages honoring quiet and verbose modes.
///
/// Warnings and errors go to stderr and are never suppressed.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    quiet: bool,
    verbose: bool,
    colored: bool,
}

impl OutputFormatter {
    /// Formatter with explicit modes. Color is used on a terminal only.
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose,
            colored: io::stdout().is_terminal() && std::env::var_os("TERM").is_some(),
        }
    }

    /// Only warnings and errors.
    pub fn quiet() -> Self {
        Self::new(true, false)
    }

    /// Everything, including details.
    pub fn verbose() -> Self {
        Self::new(false, true)
    }

    /// Whether quiet mode is on.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Whether verbose mode is on.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Informational message.
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.emit(MessageLevel::Info, message);
        }
    }

    /// Success message.
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.emit(MessageLevel::Success, message);
        }
    }

    /// Warning, shown even in quiet mode.
    pub fn warning(&self, message: &str) {
        self.emit(MessageLevel::Warning, message);
    }

    /// Error, always shown.
    pub fn error(&self, message: &str) {
        self.emit(MessageLevel::Error, message);
    }

    /// Verbose-only message.
    pub fn debug(&self, message: &str) {
        if self.verbose {
            self.emit(MessageLevel::Debug, message);
        }
    }

    /// Blank line followed by a title.
    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n{title}");
        }
    }

    /// Indented `label: value`, verbose only.
    pub fn detail(&self, label: &str, value: &str) {
        if self.verbose {
            println!("  {label}: {value}");
        }
    }

    /// Numbered list entry.
    pub fn list_item(&self, index: usize, message: &str) {
        if !self.quiet {
            println!("  {index}. {message}");
        }
    }

    /// The text [`emit`](Self::emit) would print, without color.
    pub fn render(&self, level: MessageLevel, message: &str) -> String {
        format!("{}{message}", level.prefix())
    }

    fn emit(&self, level: MessageLevel, message: &str) {
        let text = self.render(level, message);
        let line = match level.color() {
            Some(color) if self.colored => format!("{color}{text}\x1b[0m"),
            _ => text,
        };
        if level.to_stderr() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(false, false)
    }
}

/// One-line description of a document: name, format, size and state.
pub fn document_line(handle: &DocumentHandle) -> String {
    let format = handle
        .format
        .map_or_else(|| "unknown".to_string(), |f| f.to_string());
    let size = format_file_size(handle.size);

    match (handle.status(), &handle.error) {
        (DocumentStatus::Error, Some(error)) if handle.excluded => {
            format!("{} [{format}, {size}] excluded: {}", handle.name, error.title)
        }
        (DocumentStatus::Error, Some(error)) => {
            format!("{} [{format}, {size}] problem: {}", handle.name, error.title)
        }
        (status, _) => format!("{} [{format}, {size}] {status}", handle.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ClassifiedError, ErrorCode};
    use crate::document::PipelineStage;
    use crate::format::{FileInput, LogicalFormat};

    #[test]
    fn test_modes() {
        let formatter = OutputFormatter::quiet();
        assert!(formatter.is_quiet());
        assert!(!formatter.is_verbose());

        let formatter = OutputFormatter::verbose();
        assert!(!formatter.is_quiet());
        assert!(formatter.is_verbose());
    }

    #[test]
    fn test_render_prefixes() {
        let formatter = OutputFormatter::default();
        assert_eq!(formatter.render(MessageLevel::Info, "hi"), "hi");
        assert_eq!(formatter.render(MessageLevel::Success, "done"), "✓ done");
        assert_eq!(formatter.render(MessageLevel::Error, "bad"), "✗ bad");
    }

    #[test]
    fn test_document_line_states() {
        let mut handle = DocumentHandle::new(FileInput::from_name("a.txt", vec![b'x'; 2048]));
        handle.format = Some(LogicalFormat::Txt);
        handle.advance(PipelineStage::Processed, 1.0);
        assert_eq!(document_line(&handle), "a.txt [txt, 2.00 KB] processed");

        handle.fail(ClassifiedError::new(ErrorCode::FileCorrupted));
        assert!(document_line(&handle).contains("problem:"));

        handle.excluded = true;
        assert!(document_line(&handle).contains("excluded:"));
    }
}
