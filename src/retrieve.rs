//! Keyword-based chunk retrieval for prompt grounding.
//!
//! Given a user query and a document's stored chunks, selects a bounded
//! subset of chunks likely to be relevant. The policy is deliberately naive:
//! small documents pass through whole, otherwise up to three search terms are
//! derived from the query and matched as case-insensitive substrings against
//! every chunk. This component never fails on its own account; an empty
//! selection simply means no grounding is available and the chat falls back
//! to ungrounded conversation.

use std::collections::HashSet;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::models::Chunk;
use crate::store;

/// Documents with at most this many chunks skip term matching entirely:
/// the full context fits in the prompt.
pub const SMALL_DOC_THRESHOLD: usize = 10;

/// Maximum number of search terms derived from a query.
pub const MAX_TERMS: usize = 3;

/// Maximum matches contributed by a single term, in index order.
pub const PER_TERM_LIMIT: usize = 3;

/// Query tokens must be longer than this many characters to qualify.
const MIN_TERM_CHARS: usize = 3;

/// Derive up to [`MAX_TERMS`] search terms from a query: lowercase,
/// whitespace-split, tokens longer than [`MIN_TERM_CHARS`] characters,
/// first three in original order.
pub fn derive_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > MIN_TERM_CHARS)
        .take(MAX_TERMS)
        .map(str::to_string)
        .collect()
}

/// Select at most `cap` chunks relevant to `query`, except that small
/// documents bypass the cap entirely (step 1 below).
///
/// Policy:
/// 1. At or below [`SMALL_DOC_THRESHOLD`] chunks: return everything
///    unchanged, even when `cap` is smaller.
/// 2. No qualifying query terms: first `cap` chunks in index order (earliest
///    content is assumed most definitional).
/// 3. Otherwise each term matches case-insensitively against every chunk,
///    contributing at most [`PER_TERM_LIMIT`] hits in index order; the merged
///    hits are de-duplicated by chunk id, truncated to `cap`, and re-sorted
///    by original chunk index. Index order was chosen over match-discovery
///    order for reproducibility.
/// 4. No term matched anything: same positional fallback as 2.
pub fn select_chunks(all: &[Chunk], query: &str, cap: usize) -> Vec<Chunk> {
    if all.len() <= SMALL_DOC_THRESHOLD {
        return all.to_vec();
    }

    let terms = derive_terms(query);
    if terms.is_empty() {
        return all.iter().take(cap).cloned().collect();
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut picked: Vec<&Chunk> = Vec::new();

    for term in &terms {
        let mut hits = 0usize;
        for chunk in all {
            if hits == PER_TERM_LIMIT {
                break;
            }
            if chunk.text.to_lowercase().contains(term.as_str()) {
                hits += 1;
                if seen.insert(chunk.id.as_str()) {
                    picked.push(chunk);
                }
            }
        }
    }

    if picked.is_empty() {
        return all.iter().take(cap).cloned().collect();
    }

    picked.truncate(cap);
    picked.sort_by_key(|c| c.chunk_index);
    picked.into_iter().cloned().collect()
}

/// Load a document's chunks and return the selected subset's text, joined
/// with blank lines, ready for prompt assembly. Returns `None` when the
/// document has no chunks at all.
pub async fn grounding_for(
    pool: &SqlitePool,
    document_id: &str,
    query: &str,
    cap: usize,
) -> Result<Option<String>> {
    let all = store::get_chunks(pool, document_id).await?;
    if all.is_empty() {
        return Ok(None);
    }

    let selected = select_chunks(&all, query, cap);
    if selected.is_empty() {
        return Ok(None);
    }

    let joined = selected
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    Ok(Some(joined))
}
