//! Fixed-size sliding-window text chunker.
//!
//! Splits extracted document text into overlapping windows of a configurable
//! character size. Windows are language-agnostic: no sentence or token
//! boundary detection, at the cost of occasionally splitting mid-sentence.
//! The overlap keeps context that would otherwise be lost at a split.
//!
//! Each chunk receives a UUID, a contiguous zero-based index, and a SHA-256
//! hash of its text for staleness detection. The same `(text, size, overlap)`
//! always yields the same window sequence, so re-chunking is idempotent.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Window size substituted when the configured size is not positive.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Overlap substituted (capped at size/5) when the configured overlap is
/// negative or at least the window size.
pub const DEFAULT_OVERLAP: usize = 200;

/// Hard cap on windows produced for a single document. Bounds pathological
/// inputs such as a huge text with a tiny window size.
const MAX_WINDOWS: usize = 10_000;

/// Validated chunking parameters. Construct via [`ChunkParams::normalized`],
/// which guarantees `size > 0` and `0 <= overlap < size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub size: usize,
    pub overlap: usize,
}

impl ChunkParams {
    /// Coerce raw configuration values into a valid parameter set rather
    /// than failing: a non-positive size becomes [`DEFAULT_CHUNK_SIZE`], and
    /// an overlap outside `[0, size)` becomes `min(DEFAULT_OVERLAP, size/5)`.
    pub fn normalized(size: i64, overlap: i64) -> ChunkParams {
        let size = if size <= 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            size as usize
        };
        let overlap = if overlap < 0 || overlap as usize >= size {
            DEFAULT_OVERLAP.min(size / 5)
        } else {
            overlap as usize
        };
        ChunkParams { size, overlap }
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        ChunkParams {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Split text into overlapping windows of at most `params.size` characters.
///
/// The cursor starts at 0; each window covers `[cursor, cursor+size)` clamped
/// to the text length, and the next cursor is `end - overlap`. The loop stops
/// when the cursor fails to advance, when the next cursor reaches the end of
/// the text, or at the [`MAX_WINDOWS`] iteration cap. Empty text yields an
/// empty sequence. If a non-empty text somehow produces no windows, a single
/// window of the first `min(size, len)` characters is emitted so no input is
/// silently dropped.
///
/// Sizes are measured in characters, not bytes, so multi-byte input is never
/// split inside a code point.
pub fn split_windows(text: &str, params: &ChunkParams) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the text.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let char_len = bounds.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0usize;
    let mut iterations = 0usize;

    while start < char_len && iterations < MAX_WINDOWS {
        let end = (start + params.size).min(char_len);
        let window = &text[bounds[start]..bounds[end]];
        if !window.is_empty() {
            windows.push(window.to_string());
        }

        // The next cursor counts back from the clamped end, matching the
        // original stepping: a short tail window still overlaps its
        // predecessor by `overlap` characters.
        let next = end.saturating_sub(params.overlap);
        if next <= start || next >= char_len {
            break;
        }
        start = next;
        iterations += 1;
    }

    // Degenerate configurations must not lose non-empty input.
    if windows.is_empty() {
        let end = params.size.min(char_len);
        windows.push(text[..bounds[end]].to_string());
    }

    windows
}

/// Chunk a document body into stored [`Chunk`] records with contiguous
/// indices starting at 0.
pub fn chunk_text(document_id: &str, text: &str, params: &ChunkParams) -> Vec<Chunk> {
    split_windows(text, params)
        .into_iter()
        .enumerate()
        .map(|(i, window)| make_chunk(document_id, i as i64, window))
        .collect()
}

fn make_chunk(document_id: &str, index: i64, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text,
        hash,
    }
}
