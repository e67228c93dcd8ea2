//! SQLite accessors for documents, chunks, sessions, and messages.
//!
//! All functions take the pool by handle; nothing here owns global state.
//! Chunk replacement and session deletion are transactional.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Chunk, Document, Message, Role, Session};

/// Insert a document, or update its size when the filename already exists.
/// Returns the document's id, which is stable across re-uploads.
pub async fn upsert_document(pool: &SqlitePool, filename: &str, file_size: i64) -> Result<String> {
    let existing_id: Option<String> =
        sqlx::query_scalar("SELECT id FROM documents WHERE filename = ?")
            .bind(filename)
            .fetch_optional(pool)
            .await?;

    let doc_id = existing_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO documents (id, filename, file_size, uploaded_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(filename) DO UPDATE SET
            file_size = excluded.file_size,
            uploaded_at = excluded.uploaded_at
        "#,
    )
    .bind(&doc_id)
    .bind(filename)
    .bind(file_size)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(doc_id)
}

pub async fn get_document_by_filename(
    pool: &SqlitePool,
    filename: &str,
) -> Result<Option<Document>> {
    let row = sqlx::query(
        "SELECT id, filename, file_size, uploaded_at FROM documents WHERE filename = ?",
    )
    .bind(filename)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Document {
        id: r.get("id"),
        filename: r.get("filename"),
        file_size: r.get("file_size"),
        uploaded_at: r.get("uploaded_at"),
    }))
}

pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<Document>> {
    let rows = sqlx::query(
        "SELECT id, filename, file_size, uploaded_at FROM documents ORDER BY uploaded_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Document {
            id: r.get("id"),
            filename: r.get("filename"),
            file_size: r.get("file_size"),
            uploaded_at: r.get("uploaded_at"),
        })
        .collect())
}

/// Atomically discard a document's old chunks and insert the new ordered
/// sequence. Indices are expected contiguous from 0; the unique
/// `(document_id, chunk_index)` constraint enforces it.
pub async fn replace_chunks(pool: &SqlitePool, document_id: &str, chunks: &[Chunk]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

    for chunk in chunks {
        sqlx::query(
            "INSERT INTO chunks (id, document_id, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// All chunks for a document, sorted ascending by sequence index.
pub async fn get_chunks(pool: &SqlitePool, document_id: &str) -> Result<Vec<Chunk>> {
    let rows = sqlx::query(
        r#"
        SELECT id, document_id, chunk_index, text, hash
        FROM chunks
        WHERE document_id = ?
        ORDER BY chunk_index ASC
        "#,
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Chunk {
            id: r.get("id"),
            document_id: r.get("document_id"),
            chunk_index: r.get("chunk_index"),
            text: r.get("text"),
            hash: r.get("hash"),
        })
        .collect())
}

pub async fn create_session(pool: &SqlitePool, document_id: Option<&str>) -> Result<Session> {
    let session = Session {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.map(str::to_string),
        created_at: chrono::Utc::now().timestamp(),
    };

    sqlx::query("INSERT INTO sessions (id, document_id, created_at) VALUES (?, ?, ?)")
        .bind(&session.id)
        .bind(&session.document_id)
        .bind(session.created_at)
        .execute(pool)
        .await?;

    Ok(session)
}

pub async fn get_session(pool: &SqlitePool, session_id: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, document_id, created_at FROM sessions WHERE id = ?")
        .bind(session_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| Session {
        id: r.get("id"),
        document_id: r.get("document_id"),
        created_at: r.get("created_at"),
    }))
}

pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<Session>> {
    let rows =
        sqlx::query("SELECT id, document_id, created_at FROM sessions ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .iter()
        .map(|r| Session {
            id: r.get("id"),
            document_id: r.get("document_id"),
            created_at: r.get("created_at"),
        })
        .collect())
}

/// Rebind a session's active document (or unbind with `None`).
pub async fn update_session_document(
    pool: &SqlitePool,
    session_id: &str,
    document_id: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE sessions SET document_id = ? WHERE id = ?")
        .bind(document_id)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a session and, in the same transaction, all of its messages.
/// Returns false when the session does not exist.
pub async fn delete_session(pool: &SqlitePool, session_id: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM messages WHERE session_id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

/// Append one conversation turn, recording the document active at creation.
pub async fn save_message(
    pool: &SqlitePool,
    session_id: &str,
    role: Role,
    content: &str,
    document_id: Option<&str>,
) -> Result<Message> {
    let message = Message {
        id: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        role,
        content: content.to_string(),
        document_id: document_id.map(str::to_string),
        created_at: chrono::Utc::now().timestamp(),
    };

    sqlx::query(
        r#"
        INSERT INTO messages (id, session_id, role, content, document_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&message.id)
    .bind(&message.session_id)
    .bind(message.role.as_str())
    .bind(&message.content)
    .bind(&message.document_id)
    .bind(message.created_at)
    .execute(pool)
    .await?;

    Ok(message)
}

/// Every turn of a session, oldest first.
pub async fn get_messages(pool: &SqlitePool, session_id: &str) -> Result<Vec<Message>> {
    let rows = sqlx::query(
        r#"
        SELECT id, session_id, role, content, document_id, created_at
        FROM messages
        WHERE session_id = ?
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| {
            let role_str: String = r.get("role");
            Message {
                id: r.get("id"),
                session_id: r.get("session_id"),
                role: Role::parse(&role_str).unwrap_or(Role::User),
                content: r.get("content"),
                document_id: r.get("document_id"),
                created_at: r.get("created_at"),
            }
        })
        .collect())
}

/// The most recent `limit` turns of a session, returned oldest first.
/// Ties on `created_at` (user and assistant turns landing in the same
/// second) are broken by insertion order.
pub async fn get_history(
    pool: &SqlitePool,
    session_id: &str,
    limit: usize,
) -> Result<Vec<Message>> {
    let rows = sqlx::query(
        r#"
        SELECT id, session_id, role, content, document_id, created_at
        FROM messages
        WHERE session_id = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?
        "#,
    )
    .bind(session_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    let mut messages: Vec<Message> = rows
        .iter()
        .map(|r| {
            let role_str: String = r.get("role");
            Message {
                id: r.get("id"),
                session_id: r.get("session_id"),
                // The CHECK constraint guarantees the role column is valid.
                role: Role::parse(&role_str).unwrap_or(Role::User),
                content: r.get("content"),
                document_id: r.get("document_id"),
                created_at: r.get("created_at"),
            }
        })
        .collect();

    messages.reverse();
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{chunk_text, ChunkParams};
    use crate::migrate;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("test.sqlite");
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        (tmp, pool)
    }

    #[tokio::test]
    async fn upsert_document_keeps_id_stable_across_reuploads() {
        let (_tmp, pool) = test_pool().await;

        let id1 = upsert_document(&pool, "report.pdf", 100).await.unwrap();
        let id2 = upsert_document(&pool, "report.pdf", 250).await.unwrap();
        assert_eq!(id1, id2);

        let doc = get_document_by_filename(&pool, "report.pdf")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.file_size, 250);

        assert_eq!(list_documents(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_chunks_discards_the_old_sequence() {
        let (_tmp, pool) = test_pool().await;
        let doc_id = upsert_document(&pool, "a.pdf", 10).await.unwrap();
        let params = ChunkParams::normalized(4, 0);

        replace_chunks(&pool, &doc_id, &chunk_text(&doc_id, "aaaabbbbcccc", &params))
            .await
            .unwrap();
        assert_eq!(get_chunks(&pool, &doc_id).await.unwrap().len(), 3);

        replace_chunks(&pool, &doc_id, &chunk_text(&doc_id, "dddd", &params))
            .await
            .unwrap();
        let chunks = get_chunks(&pool, &doc_id).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "dddd");
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[tokio::test]
    async fn get_chunks_returns_index_order() {
        let (_tmp, pool) = test_pool().await;
        let doc_id = upsert_document(&pool, "a.pdf", 10).await.unwrap();
        let params = ChunkParams::normalized(3, 0);

        let chunks = chunk_text(&doc_id, "abcdefghij", &params);
        replace_chunks(&pool, &doc_id, &chunks).await.unwrap();

        let loaded = get_chunks(&pool, &doc_id).await.unwrap();
        for (i, c) in loaded.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
        }
    }

    #[tokio::test]
    async fn session_document_binding_can_change() {
        let (_tmp, pool) = test_pool().await;
        let doc_a = upsert_document(&pool, "a.pdf", 1).await.unwrap();
        let doc_b = upsert_document(&pool, "b.pdf", 2).await.unwrap();

        let session = create_session(&pool, Some(&doc_a)).await.unwrap();
        update_session_document(&pool, &session.id, Some(&doc_b))
            .await
            .unwrap();

        let reloaded = get_session(&pool, &session.id).await.unwrap().unwrap();
        assert_eq!(reloaded.document_id.as_deref(), Some(doc_b.as_str()));
    }

    #[tokio::test]
    async fn delete_session_cascades_to_messages() {
        let (_tmp, pool) = test_pool().await;
        let session = create_session(&pool, None).await.unwrap();

        save_message(&pool, &session.id, Role::User, "hello", None)
            .await
            .unwrap();
        save_message(&pool, &session.id, Role::Assistant, "hi", None)
            .await
            .unwrap();
        assert_eq!(get_messages(&pool, &session.id).await.unwrap().len(), 2);

        assert!(delete_session(&pool, &session.id).await.unwrap());
        assert!(get_session(&pool, &session.id).await.unwrap().is_none());
        assert!(get_messages(&pool, &session.id).await.unwrap().is_empty());

        // Deleting again reports not-found.
        assert!(!delete_session(&pool, &session.id).await.unwrap());
    }

    #[tokio::test]
    async fn history_returns_most_recent_turns_oldest_first() {
        let (_tmp, pool) = test_pool().await;
        let session = create_session(&pool, None).await.unwrap();

        for i in 0..6 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            save_message(&pool, &session.id, role, &format!("turn {}", i), None)
                .await
                .unwrap();
        }

        let history = get_history(&pool, &session.id, 4).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["turn 2", "turn 3", "turn 4", "turn 5"]);
    }

    #[tokio::test]
    async fn each_message_records_its_active_document() {
        let (_tmp, pool) = test_pool().await;
        let doc_a = upsert_document(&pool, "a.pdf", 1).await.unwrap();
        let doc_b = upsert_document(&pool, "b.pdf", 2).await.unwrap();
        let session = create_session(&pool, Some(&doc_a)).await.unwrap();

        save_message(&pool, &session.id, Role::User, "about a", Some(&doc_a))
            .await
            .unwrap();
        update_session_document(&pool, &session.id, Some(&doc_b))
            .await
            .unwrap();
        save_message(&pool, &session.id, Role::User, "about b", Some(&doc_b))
            .await
            .unwrap();

        let messages = get_messages(&pool, &session.id).await.unwrap();
        assert_eq!(messages[0].document_id.as_deref(), Some(doc_a.as_str()));
        assert_eq!(messages[1].document_id.as_deref(), Some(doc_b.as_str()));
    }
}
