//! Upload pipeline: validate → extract → persist → re-chunk.
//!
//! Re-uploading a filename updates the document's size and atomically
//! replaces its chunk sequence, so a session bound to that document picks up
//! the new content on its next turn.

use std::path::Path;

use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;

use crate::chunk;
use crate::config::Config;
use crate::extract;
use crate::store;

/// Result of a successful upload.
#[derive(Debug)]
pub struct UploadReport {
    pub document_id: String,
    pub filename: String,
    pub chunk_count: usize,
}

/// Ingest one uploaded PDF.
///
/// Validation failures (wrong content type, unreadable or empty PDF) are
/// caller errors; storage failures are dependency errors. The caller maps
/// them to response codes by message, as the HTTP layer does.
pub async fn ingest_pdf(
    pool: &SqlitePool,
    config: &Config,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<UploadReport> {
    // Strip any path components a client might smuggle into the filename.
    let safe_name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if safe_name.is_empty() {
        bail!("no file provided");
    }

    let text = extract::extract_text(bytes, content_type)?;
    if text.trim().is_empty() {
        bail!("PDF appears to be empty or unreadable");
    }

    std::fs::create_dir_all(&config.uploads.dir)
        .with_context(|| format!("Failed to create {}", config.uploads.dir.display()))?;
    std::fs::write(config.uploads.dir.join(safe_name), bytes)
        .with_context(|| format!("Failed to store upload {}", safe_name))?;

    let document_id = store::upsert_document(pool, safe_name, bytes.len() as i64).await?;
    let chunks = chunk::chunk_text(&document_id, &text, &config.chunking.params());
    let chunk_count = chunks.len();
    store::replace_chunks(pool, &document_id, &chunks).await?;

    Ok(UploadReport {
        document_id,
        filename: safe_name.to_string(),
        chunk_count,
    })
}
