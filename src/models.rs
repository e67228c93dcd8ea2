//! Core data models used throughout paperchat.
//!
//! These types represent the documents, chunks, sessions, and conversation
//! turns that flow through the upload and chat pipelines.

use serde::Serialize;

/// An uploaded PDF document. One row per unique filename; re-uploading the
/// same filename updates the size in place.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub file_size: i64,
    pub uploaded_at: i64,
}

/// A bounded-length contiguous piece of a document's extracted text,
/// tagged with its zero-based position in the originating document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A conversation thread, optionally bound to one document at a time.
/// The binding may change over the session's lifetime (re-upload into the
/// same session); each turn records the document active when it was created.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub document_id: Option<String>,
    pub created_at: i64,
}

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// One turn of a conversation, append-only within its session.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub document_id: Option<String>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!(Role::parse(Role::User.as_str()), Some(Role::User));
        assert_eq!(Role::parse(Role::Assistant.as_str()), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
    }
}
