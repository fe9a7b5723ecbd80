//! docmerge - merge documents of different formats into a single file.

mod cli;
mod inputs;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, OverwriteMode};
use docmerge::output::{OutputFormatter, ProgressReporter, display_documents, display_job};
use docmerge::utils::format_file_size;
use docmerge::{DocMergeError, DocumentHandle, JobStatus, MergeOutput, MergeSession, ProcessingJob};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err
            .downcast_ref::<DocMergeError>()
            .map_or(1, DocMergeError::exit_code);
        process::exit(code);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "docmerge=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

/// Machine-readable summary printed with `--json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    dry_run: bool,
    documents: Vec<DocumentReport<'a>>,
    job: &'a ProcessingJob,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a MergeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a Path>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentReport<'a> {
    name: &'a str,
    size: u64,
    format: Option<docmerge::LogicalFormat>,
    status: String,
    eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a docmerge::DocumentMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a docmerge::ClassifiedError>,
}

impl<'a> From<&'a DocumentHandle> for DocumentReport<'a> {
    fn from(handle: &'a DocumentHandle) -> Self {
        Self {
            name: &handle.name,
            size: handle.size,
            format: handle.format,
            status: handle.status().to_string(),
            eligible: handle.is_eligible(),
            metadata: handle.metadata.as_ref(),
            error: handle.error.as_ref(),
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    cli.validate()?;

    let formatter = OutputFormatter::new(cli.quiet || cli.json, cli.verbose);
    formatter.section(&format!("{} v{}", docmerge::NAME, docmerge::VERSION));

    let paths =
        inputs::collect_inputs(&cli.inputs, cli.input_list.as_deref(), cli.recursive).await?;
    let files = inputs::read_files(&paths).await?;
    debug!(count = files.len(), "Read input files");

    let mut session = MergeSession::new(cli.limits(), cli.chunk_config());
    session.add_files(files)?;

    formatter.info("Analyzing documents...");
    let reporter = ProgressReporter::new("Analyzing", !cli.quiet && !cli.json);
    let summary = session.process_pending(&reporter).await;
    reporter.clear();
    info!(
        processed = summary.processed,
        failed = summary.failed,
        "Analysis finished"
    );
    display_documents(&formatter, session.documents());

    let options = cli.merge_options();

    if cli.dry_run {
        let job = session.orchestrator().create_job(session.documents(), options)?;
        if cli.json {
            print_report(&session, &job, None, None, true)?;
        } else {
            formatter.section("Merge plan");
            formatter.detail("Output format", &job.output_format.to_string());
            formatter.detail("Reason", &job.format_reason.to_string());
            formatter.detail("Documents", &job.document_ids.len().to_string());
            for warning in &job.warnings {
                formatter.warning(warning);
            }
            formatter.success("Dry run completed successfully");
        }
        return Ok(());
    }

    let reporter = ProgressReporter::new("Merging", !cli.quiet && !cli.json);
    let job = session.merge(options, &reporter).await?.clone();
    reporter.finish("Merged");

    let output = session.output().and_then(|handle| handle.output());
    display_job(&formatter, &job, output.as_ref());

    let output = match (job.status, output) {
        (JobStatus::Completed, Some(output)) => output,
        _ => {
            if cli.json {
                print_report(&session, &job, None, None, false)?;
            }
            let reason = job
                .error
                .as_ref()
                .map_or_else(|| format!("job ended as {}", job.status), |e| e.message.clone());
            return Err(DocMergeError::merge_failed(reason).into());
        }
    };

    let path = resolve_output_path(cli.output.as_deref(), &output.file_name);
    handle_output_overwrite(&path, cli.overwrite_mode(), &formatter)?;

    tokio::fs::write(&path, &output.data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = output.size, "Wrote output");

    if cli.json {
        print_report(&session, &job, Some(&output), Some(&path), false)?;
    } else {
        formatter.success(&format!(
            "Successfully created {} ({})",
            path.display(),
            format_file_size(output.size as u64)
        ));
    }

    session.teardown();
    Ok(())
}

fn print_report(
    session: &MergeSession,
    job: &ProcessingJob,
    output: Option<&MergeOutput>,
    path: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let report = Report {
        dry_run,
        documents: session.documents().iter().map(DocumentReport::from).collect(),
        job,
        output,
        path,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Where the output goes: `output` itself, `output/<file_name>` when it is a
/// directory, or `<file_name>` in the working directory.
fn resolve_output_path(output: Option<&Path>, file_name: &str) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(file_name),
    }
}

fn handle_output_overwrite(
    path: &Path,
    mode: OverwriteMode,
    formatter: &OutputFormatter,
) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let exists = || {
        DocMergeError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("Output file already exists: {}", path.display()),
        ))
    };

    match mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(exists().into()),
        OverwriteMode::Prompt => {
            if formatter.is_quiet() {
                return Err(exists().into());
            }

            formatter.warning(&format!("Output file already exists: {}", path.display()));
            eprint!("Overwrite? [y/N]: ");
            io::stderr().flush().ok();

            let mut response = String::new();
            io::stdin()
                .read_line(&mut response)
                .context("Failed to read answer")?;

            match response.trim().to_lowercase().as_str() {
                "y" | "yes" => Ok(()),
                _ => Err(DocMergeError::Cancelled.into()),
            }
        }
    }
}
