//! Small helpers shared by the library and the CLI.

use crate::error::{DocMergeError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Expand glob patterns into paths, in pattern order.
///
/// Accepts anything iterable over string-like items, e.g. `&[&str]` or
/// `Vec<String>`. A pattern without wildcards yields the path itself when it
/// exists.
///
/// # Errors
///
/// Invalid patterns and unreadable directory entries.
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved = Vec::new();
    for pattern in patterns {
        resolved.extend(collect_paths_for_pattern(pattern.as_ref())?);
    }
    Ok(resolved)
}

fn collect_paths_for_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|err| DocMergeError::other(format!("Invalid pattern '{pattern}': {err}")))?;

    paths
        .map(|entry| entry.map_err(|err| DocMergeError::other(err.to_string())))
        .collect()
}

/// Human-readable byte count.
///
/// # Examples
///
/// ```
/// use docmerge::utils::format_file_size;
///
/// assert_eq!(format_file_size(512), "512 bytes");
/// assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
/// ```
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match size {
        s if s >= GB => format!("{:.2} GB", s as f64 / GB as f64),
        s if s >= MB => format!("{:.2} MB", s as f64 / MB as f64),
        s if s >= KB => format!("{:.2} KB", s as f64 / KB as f64),
        s => format!("{s} bytes"),
    }
}

/// Short duration such as `42s`, `1m 30s` or `1h 1m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0 bytes")]
    #[case(1023, "1023 bytes")]
    #[case(1536, "1.50 KB")]
    #[case(50 * 1024 * 1024, "50.00 MB")]
    #[case(3 * 1024 * 1024 * 1024, "3.00 GB")]
    fn test_format_file_size(#[case] size: u64, #[case] expected: &str) {
        assert_eq!(format_file_size(size), expected);
    }

    #[rstest]
    #[case(30, "30s")]
    #[case(90, "1m 30s")]
    #[case(3661, "1h 1m")]
    fn test_format_duration(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_duration(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(collect_paths_for_patterns(["[unclosed"]).is_err());
    }

    #[test]
    fn test_missing_literal_path_yields_nothing() {
        let paths = collect_paths_for_patterns(["definitely/not/here.pdf"]).unwrap();
        assert!(paths.is_empty());
    }
}
