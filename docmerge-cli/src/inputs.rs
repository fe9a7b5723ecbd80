//! Resolving command-line inputs into files.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use walkdir::WalkDir;

use docmerge::utils::collect_paths_for_patterns;
use docmerge::{FileInput, LogicalFormat};

/// All input paths, in command-line order followed by the input list.
///
/// Glob patterns are expanded, directories contribute the supported files
/// they contain in name order. Explicit files are kept even when their
/// extension is unknown, so the validator can report them.
///
/// # Errors
///
/// Unreadable input lists, bad patterns, missing paths, or no files at all.
pub async fn collect_inputs(
    inputs: &[String],
    input_list: Option<&Path>,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    let mut patterns = inputs.to_vec();
    if let Some(list) = input_list {
        patterns.extend(read_input_list(list).await?);
    }

    let mut paths = Vec::new();
    for pattern in &patterns {
        let matched = collect_paths_for_patterns([pattern.as_str()])?;
        if matched.is_empty() {
            bail!("No such file or directory: {pattern}");
        }
        for path in matched {
            if path.is_dir() {
                paths.extend(scan_directory(&path, recursive)?);
            } else {
                paths.push(path);
            }
        }
    }

    if paths.is_empty() {
        bail!("No input files found");
    }
    debug!(count = paths.len(), "Resolved inputs");
    Ok(paths)
}

/// Supported files under `dir`, sorted by path.
fn scan_directory(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut found = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to read directory {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if LogicalFormat::from_file_name(&name).is_some() {
            found.push(entry.into_path());
        }
    }

    debug!(dir = %dir.display(), count = found.len(), "Scanned directory");
    Ok(found)
}

/// One entry per line; blank lines and `#` comments are skipped.
async fn read_input_list(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("Failed to open input list {}", path.display()))?;

    let mut lines = BufReader::new(file).lines();
    let mut entries = Vec::new();
    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| format!("Failed to read input list {}", path.display()))?
    {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        entries.push(line.to_string());
    }
    Ok(entries)
}

/// Read every path into memory.
///
/// # Errors
///
/// The first file that cannot be read.
pub async fn read_files(paths: &[PathBuf]) -> Result<Vec<FileInput>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(FileInput::from_name(name, data));
    }
    Ok(files)
}
