//! Chunked processing of large inputs.
//!
//! Large buffers are split into fixed-size slices that are processed with a
//! bounded number in flight; whole files are processed in small batches with
//! a cooperative yield between batches so a single runtime thread stays
//! responsive. Slices are zero-copy views of the original [`Bytes`].

use crate::config::ChunkConfig;
use bytes::Bytes;
use futures::StreamExt;
use futures::future::join_all;
use std::future::Future;

const MB: usize = 1024 * 1024;

/// One slice of a larger buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position.
    pub index: usize,
    /// Byte offset in the original buffer.
    pub offset: usize,
    /// The slice.
    pub data: Bytes,
    /// Whether this is the last slice.
    pub is_last: bool,
}

/// Lazy, forward-only iterator over the slices of a buffer.
///
/// Once exhausted it stays exhausted; create a new reader to start over.
#[derive(Debug, Clone)]
pub struct ChunkReader {
    data: Bytes,
    chunk_size: usize,
    offset: usize,
    index: usize,
}

impl ChunkReader {
    /// Reader over `data` with slices of `chunk_size` bytes.
    pub fn new(data: Bytes, chunk_size: usize) -> Self {
        Self {
            data,
            chunk_size: chunk_size.max(1),
            offset: 0,
            index: 0,
        }
    }

    /// Total number of slices the reader yields from the start.
    pub fn total_chunks(&self) -> usize {
        self.data.len().div_ceil(self.chunk_size)
    }

    /// Bytes not yet yielded.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}

impl Iterator for ChunkReader {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let end = (self.offset + self.chunk_size).min(self.data.len());
        let chunk = Chunk {
            index: self.index,
            offset: self.offset,
            data: self.data.slice(self.offset..end),
            is_last: end == self.data.len(),
        };
        self.offset = end;
        self.index += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.remaining().div_ceil(self.chunk_size);
        (left, Some(left))
    }
}

impl ExactSizeIterator for ChunkReader {}

/// Outcome of [`ChunkProcessor::validate_chunks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkValidation {
    /// Whether every slice was accepted.
    pub valid: bool,
    /// 1-based index of the first rejected slice.
    pub failed_chunk: Option<usize>,
}

/// Splits buffers and runs work over them with bounded concurrency.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkProcessor {
    config: ChunkConfig,
}

impl ChunkProcessor {
    /// Create a processor.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Number of slices `len` bytes split into.
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.config.chunk_size.max(1))
    }

    /// Lazy reader over `data`.
    pub fn reader(&self, data: Bytes) -> ChunkReader {
        ChunkReader::new(data, self.config.chunk_size)
    }

    /// Split `data` into slices of the configured size.
    ///
    /// Every slice but the last has exactly `chunk_size` bytes; the slices
    /// concatenate back to `data`.
    pub fn split(&self, data: &Bytes) -> Vec<Bytes> {
        self.reader(data.clone()).map(|chunk| chunk.data).collect()
    }

    /// Run `process` over every slice, at most `max_concurrent_chunks` at a
    /// time, calling `on_chunk(completed, total)` as results arrive.
    ///
    /// Results are returned in slice order.
    pub async fn process_chunks<T, F, Fut>(
        &self,
        data: &Bytes,
        mut process: F,
        mut on_chunk: impl FnMut(usize, usize),
    ) -> Vec<T>
    where
        F: FnMut(Chunk) -> Fut,
        Fut: Future<Output = T>,
    {
        let reader = self.reader(data.clone());
        let total = reader.total_chunks();
        let mut results = Vec::with_capacity(total);

        let mut stream = futures::stream::iter(reader.map(&mut process))
            .buffered(self.config.max_concurrent_chunks.max(1));

        while let Some(result) = stream.next().await {
            results.push(result);
            on_chunk(results.len(), total);
        }

        results
    }

    /// Run `process` over whole items in batches of
    /// `max_concurrent_files`, yielding to the runtime between batches.
    ///
    /// Results are returned in input order.
    pub async fn process_files<I, T, F, Fut>(&self, items: Vec<I>, mut process: F) -> Vec<T>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = T>,
    {
        let batch_size = self.config.max_concurrent_files.max(1);
        let mut results = Vec::with_capacity(items.len());
        let mut items = items.into_iter().peekable();

        while items.peek().is_some() {
            let batch: Vec<Fut> = items.by_ref().take(batch_size).map(&mut process).collect();
            results.extend(join_all(batch).await);
            tokio::task::yield_now().await;
        }

        results
    }

    /// Walk the slices of `data` until `accept(slice, is_first, is_last)`
    /// rejects one.
    ///
    /// An empty buffer is presented as a single empty slice.
    pub fn validate_chunks<F>(&self, data: &[u8], mut accept: F) -> ChunkValidation
    where
        F: FnMut(&[u8], bool, bool) -> bool,
    {
        if data.is_empty() {
            let valid = accept(data, true, true);
            return ChunkValidation {
                valid,
                failed_chunk: (!valid).then_some(1),
            };
        }

        let size = self.config.chunk_size.max(1);
        let total = data.len().div_ceil(size);
        for (index, slice) in data.chunks(size).enumerate() {
            if !accept(slice, index == 0, index + 1 == total) {
                return ChunkValidation {
                    valid: false,
                    failed_chunk: Some(index + 1),
                };
            }
        }

        ChunkValidation {
            valid: true,
            failed_chunk: None,
        }
    }
}

/// Slice size suggested for a buffer of `total_size` bytes.
pub fn recommended_chunk_size(total_size: u64) -> usize {
    let total = total_size as usize;
    if total < 10 * MB {
        MB
    } else if total < 50 * MB {
        5 * MB
    } else {
        10 * MB
    }
}
