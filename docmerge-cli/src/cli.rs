//! Command-line arguments.
//!
//! Also compiled by `build.rs` to render the man page, so this module only
//! depends on `clap` and the library.

use clap::Parser;
use std::path::PathBuf;

use docmerge::config::{DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILES};
use docmerge::{
    ChunkConfig, DocMergeError, LogicalFormat, MergeOptions, ProcessingLimits, Quality, Result,
    TextSeparator,
};

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteMode {
    /// Ask on the terminal.
    Prompt,
    /// Overwrite silently.
    Force,
    /// Refuse.
    NoClobber,
}

/// Merge PDF, Word, Excel, PowerPoint, text and CSV files into one document.
///
/// The output format is chosen from the inputs: a single format merges
/// natively, several Word documents or mixed formats are converted and
/// merged as PDF.
#[derive(Parser, Debug)]
#[command(name = "docmerge")]
#[command(version)]
#[command(about = "Merge documents of different formats into a single file", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input files, directories or glob patterns, merged in the order given
    ///
    /// Examples:
    ///   docmerge report.pdf notes.txt
    ///   docmerge "chapters/*.docx" -o book.pdf
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Output file or directory
    ///
    /// Defaults to the output name plus the extension of the decided
    /// format, in the current directory.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Base name of the merged document
    #[arg(long, value_name = "NAME", default_value = "merged")]
    pub name: String,

    /// Force an output format instead of deciding from the inputs
    #[arg(long, value_name = "FORMAT", value_parser = parse_format)]
    pub format: Option<LogicalFormat>,

    /// Read additional inputs from a file, one per line
    ///
    /// Empty lines and lines starting with '#' are skipped.
    #[arg(long, value_name = "FILE")]
    pub input_list: Option<PathBuf>,

    /// Descend into subdirectories of directory inputs
    #[arg(short, long)]
    pub recursive: bool,

    /// Analyze the inputs and show the merge plan without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print a JSON report instead of messages
    #[arg(long, conflicts_with = "verbose")]
    pub json: bool,

    /// Show details and debug logs
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite an existing output file without asking
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite an existing output file
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Output quality: low, medium or high
    #[arg(long, value_name = "LEVEL", default_value = "high", value_parser = parse_quality)]
    pub quality: Quality,

    /// Separator between text documents: default, page-break, file-header or custom text
    #[arg(long, value_name = "SEP", default_value = "default", value_parser = parse_separator)]
    pub separator: TextSeparator,

    /// Add a heading naming each source document
    #[arg(long)]
    pub headers: bool,

    /// Add a closing line after each source document
    #[arg(long)]
    pub footers: bool,

    /// Do not start each document on a new page
    #[arg(long)]
    pub no_page_breaks: bool,

    /// Do not copy title, author and dates into the output
    #[arg(long)]
    pub no_metadata: bool,

    /// Drop headings and styles from Word output
    #[arg(long)]
    pub no_formatting: bool,

    /// Keep repeated CSV header rows
    #[arg(long)]
    pub keep_duplicate_headers: bool,

    /// Keep spreadsheet formulas instead of cached values
    #[arg(long)]
    pub formulas: bool,

    /// Largest accepted input, in bytes
    #[arg(long, value_name = "BYTES", env = "DOCMERGE_MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Most inputs accepted in one run
    #[arg(long, value_name = "N", env = "DOCMERGE_MAX_FILES", default_value_t = DEFAULT_MAX_FILES)]
    pub max_files: usize,

    /// Documents processed at the same time
    #[arg(short, long, value_name = "N", env = "DOCMERGE_JOBS")]
    pub jobs: Option<usize>,
}

fn parse_format(value: &str) -> std::result::Result<LogicalFormat, String> {
    value.parse().map_err(|err: DocMergeError| err.to_string())
}

fn parse_quality(value: &str) -> std::result::Result<Quality, String> {
    value.parse().map_err(|err: DocMergeError| err.to_string())
}

fn parse_separator(value: &str) -> std::result::Result<TextSeparator, String> {
    value.parse().map_err(|err: DocMergeError| err.to_string())
}

impl Cli {
    /// Checks that need no file access.
    ///
    /// # Errors
    ///
    /// No inputs at all, zero jobs, a blank name, or a zero file limit.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() && self.input_list.is_none() {
            return Err(DocMergeError::invalid_options("No input files specified"));
        }

        if self.jobs == Some(0) {
            return Err(DocMergeError::invalid_options(
                "Number of jobs must be at least 1",
            ));
        }

        if self.max_files == 0 {
            return Err(DocMergeError::invalid_options(
                "Maximum number of files must be at least 1",
            ));
        }

        self.merge_options().validate()
    }

    /// Merge options from the flags.
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            output_format: self.format,
            output_name: self.name.clone(),
            preserve_metadata: !self.no_metadata,
            preserve_formatting: !self.no_formatting,
            quality: self.quality,
            page_breaks: !self.no_page_breaks,
            include_headers: self.headers,
            include_footers: self.footers,
            separator: self.separator.clone(),
            skip_duplicate_headers: !self.keep_duplicate_headers,
            preserve_formulas: self.formulas,
            ..Default::default()
        }
    }

    /// Upload limits from the flags and environment.
    pub fn limits(&self) -> ProcessingLimits {
        ProcessingLimits {
            max_file_size: self.max_file_size,
            max_files: self.max_files,
        }
    }

    /// Chunking settings; `--jobs` sets the file concurrency.
    pub fn chunk_config(&self) -> ChunkConfig {
        let defaults = ChunkConfig::default();
        ChunkConfig {
            max_concurrent_files: self.jobs.unwrap_or(defaults.max_concurrent_files),
            ..defaults
        }
    }

    /// Overwrite behaviour from `--force` and `--no-clobber`.
    pub fn overwrite_mode(&self) -> OverwriteMode {
        if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        }
    }
}
