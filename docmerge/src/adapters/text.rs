//! Plain text and CSV adapter.
//!
//! Both formats are decoded as UTF-8 through a [`ChunkReader`], so a
//! multi-byte sequence split across two slices is reassembled rather than
//! replaced. A leading byte-order mark is dropped and invalid sequences
//! become U+FFFD.
//!
//! CSV handling is deliberately simple: rows are split on commas and a pair
//! of surrounding quotes is stripped from each field. Quoted commas and
//! embedded newlines are not understood.

use super::{FormatAdapter, bounded_preview, count_words};
use crate::chunk::{ChunkProcessor, ChunkReader};
use crate::config::{ChunkConfig, MergeOptions, TextSeparator};
use crate::convert::text_grid;
use crate::document::{DocumentMetadata, ProcessorResult, SourceDocument};
use crate::error::{DocMergeError, Result};
use crate::format::LogicalFormat;
use bytes::Bytes;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Lines shown in a text preview.
const PREVIEW_LINES: usize = 10;

/// Rows shown in a CSV preview, header included.
const PREVIEW_ROWS: usize = 6;

/// Adapter for `text/plain` and `text/csv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextAdapter {
    kind: LogicalFormat,
}

impl TextAdapter {
    /// Plain text.
    pub const PLAIN: TextAdapter = TextAdapter {
        kind: LogicalFormat::Txt,
    };

    /// Comma-separated values.
    pub const CSV: TextAdapter = TextAdapter {
        kind: LogicalFormat::Csv,
    };

    /// Word count computed slice by slice with `processor`.
    ///
    /// Slices are counted concurrently; a word cut by a slice boundary is
    /// counted once. The result equals [`FormatAdapter::analyze`] on the
    /// same bytes. `on_chunk(completed, total)` is called per slice.
    pub async fn analyze_chunked(
        &self,
        data: &Bytes,
        processor: &ChunkProcessor,
        on_chunk: impl FnMut(usize, usize),
    ) -> DocumentMetadata {
        let body = strip_bom(data);
        let counts = processor
            .process_chunks(
                &body,
                |chunk| {
                    let body = body.clone();
                    async move { count_slice(&body, chunk.offset, chunk.data.len()) }
                },
                on_chunk,
            )
            .await;

        let mut words = 0u64;
        let mut previous_ends_in_word = false;
        for count in counts.into_iter().filter(|c| !c.empty) {
            words += count.words;
            if previous_ends_in_word && count.starts_in_word {
                words -= 1;
            }
            previous_ends_in_word = count.ends_in_word;
        }

        debug!(format = %self.kind, words, "Chunked text analysis finished");
        DocumentMetadata {
            word_count: Some(words),
            ..Default::default()
        }
    }

    fn merge_text(&self, sources: &[SourceDocument], options: &MergeOptions) -> ProcessorResult {
        let mut out = String::new();
        let mut warnings = Vec::new();
        let mut merged = 0usize;

        for source in sources {
            let text = decode_text(&source.data);
            let body = text.trim_end();
            if body.trim().is_empty() {
                warn!(file = %source.name, "Skipping text file without content");
                warnings.push(format!("{}: no text content", source.name));
                continue;
            }

            if merged > 0 {
                out.push_str(&options.separator.render(&source.name));
            } else if options.separator == TextSeparator::FileHeader {
                out.push_str(options.separator.render(&source.name).trim_start());
            }
            out.push_str(body);
            merged += 1;
        }

        if merged == 0 {
            return ProcessorResult::failed("no text content could be read from any input");
        }

        out.push('\n');
        let metadata = DocumentMetadata {
            word_count: Some(count_words(&out)),
            ..Default::default()
        };
        ProcessorResult::ok(out, LogicalFormat::Txt)
            .with_warnings(warnings)
            .with_metadata(metadata)
    }

    fn merge_csv(&self, sources: &[SourceDocument], options: &MergeOptions) -> ProcessorResult {
        let mut lines: Vec<String> = Vec::new();
        let mut warnings = Vec::new();
        let mut merged = 0usize;
        let drop_repeated_header = options.include_headers && options.skip_duplicate_headers;

        for source in sources {
            let rows = parse_rows(&decode_text(&source.data));
            if rows.is_empty() {
                warn!(file = %source.name, "Skipping CSV file without rows");
                warnings.push(format!("{}: no rows", source.name));
                continue;
            }

            let skip = usize::from(drop_repeated_header && merged > 0);
            lines.extend(rows.iter().skip(skip).map(|row| write_row(row)));
            merged += 1;
        }

        if merged == 0 {
            return ProcessorResult::failed("no rows could be read from any input CSV");
        }

        let mut out = lines.join("\n");
        out.push('\n');
        ProcessorResult::ok(out, LogicalFormat::Csv).with_warnings(warnings)
    }
}

impl FormatAdapter for TextAdapter {
    fn format(&self) -> LogicalFormat {
        self.kind
    }

    fn analyze(&self, data: &Bytes) -> DocumentMetadata {
        DocumentMetadata {
            word_count: Some(count_words(&decode_text(data))),
            ..Default::default()
        }
    }

    fn preview(&self, data: &Bytes) -> String {
        let text = decode_text(data);
        let preview = match self.kind {
            LogicalFormat::Csv => {
                let rows = parse_rows(&text);
                let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
                let head: Vec<Vec<String>> = rows.iter().take(PREVIEW_ROWS).cloned().collect();
                format!(
                    "CSV data, {} row(s), {columns} column(s)\n\n{}",
                    rows.len(),
                    text_grid(&head)
                )
            }
            _ => {
                let head: Vec<&str> = text
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .take(PREVIEW_LINES)
                    .collect();
                format!(
                    "Text document, {} line(s), {} word(s)\n\n{}",
                    text.lines().count(),
                    count_words(&text),
                    head.join("\n")
                )
            }
        };
        bounded_preview(&preview)
    }

    fn extract_text(&self, data: &Bytes) -> Result<String> {
        Ok(decode_text(data))
    }

    fn validate_structure(&self, data: &Bytes) -> Result<()> {
        if data.contains(&0) {
            return Err(DocMergeError::corrupted(
                self.kind,
                "binary content in a text file",
            ));
        }
        Ok(())
    }

    fn merge_same_format(
        &self,
        sources: &[SourceDocument],
        options: &MergeOptions,
    ) -> ProcessorResult {
        match self.kind {
            LogicalFormat::Csv => self.merge_csv(sources, options),
            _ => self.merge_text(sources, options),
        }
    }

    fn bridge_text(&self, data: &Bytes) -> Result<String> {
        let text = decode_text(data);
        match self.kind {
            LogicalFormat::Csv => Ok(text_grid(&parse_rows(&text))),
            _ => Ok(text),
        }
    }
}

/// Decode UTF-8 slice by slice with the default chunk size.
pub fn decode_text(data: &Bytes) -> String {
    decode_text_chunked(data, ChunkConfig::default().chunk_size)
}

/// Decode UTF-8 slice by slice.
///
/// A sequence cut by a slice boundary is carried into the next slice; one
/// left incomplete at the very end is replaced.
pub fn decode_text_chunked(data: &Bytes, chunk_size: usize) -> String {
    let body = strip_bom(data);
    let mut out = String::with_capacity(body.len());
    let mut pending: Vec<u8> = Vec::new();

    for chunk in ChunkReader::new(body, chunk_size) {
        pending.extend_from_slice(&chunk.data);
        let keep = decode_into(&pending, chunk.is_last, &mut out);
        pending.drain(..pending.len() - keep);
    }

    out
}

/// Decode as much of `buf` as possible into `out`, returning how many
/// trailing bytes form an incomplete sequence to retry with more input.
fn decode_into(buf: &[u8], flush: bool, out: &mut String) -> usize {
    let mut rest = buf;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return 0;
            }
            Err(err) => {
                let (valid, after) = rest.split_at(err.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                match err.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    }
                    None if flush => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        return 0;
                    }
                    None => return after.len(),
                }
            }
        }
    }
}

fn strip_bom(data: &Bytes) -> Bytes {
    if data.starts_with(UTF8_BOM) {
        data.slice(UTF8_BOM.len()..)
    } else {
        data.clone()
    }
}

#[derive(Debug, Clone, Copy)]
struct SliceWords {
    words: u64,
    starts_in_word: bool,
    ends_in_word: bool,
    empty: bool,
}

/// Count words in `data[offset..offset + len]`, with both ends moved forward
/// to character boundaries so no character is split between slices.
fn count_slice(data: &[u8], offset: usize, len: usize) -> SliceWords {
    let is_continuation = |b: u8| b & 0xC0 == 0x80;
    let mut start = offset;
    let mut end = (offset + len).min(data.len());
    while start < end && is_continuation(data[start]) {
        start += 1;
    }
    while end < data.len() && is_continuation(data[end]) {
        end += 1;
    }

    let text = String::from_utf8_lossy(&data[start..end]);
    SliceWords {
        words: count_words(&text),
        starts_in_word: text.chars().next().is_some_and(|c| !c.is_whitespace()),
        ends_in_word: text.chars().next_back().is_some_and(|c| !c.is_whitespace()),
        empty: text.is_empty(),
    }
}

/// Split CSV text into rows of fields, skipping blank lines.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(',').map(unquote).collect())
        .collect()
}

fn unquote(field: &str) -> String {
    let field = field.trim();
    match field
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => field.to_string(),
    }
}

fn write_row(row: &[String]) -> String {
    row.iter()
        .map(|field| {
            if field.contains([',', '"', '\n']) {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
