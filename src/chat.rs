//! Chat-turn orchestration.
//!
//! One turn: resolve the session and its document binding, append the user
//! message, assemble the prompt (persona + retrieved grounding + replayed
//! history), call the model, append and return the reply.

use anyhow::{bail, Result};
use sqlx::SqlitePool;
use tracing::debug;

use crate::config::Config;
use crate::llm::{ChatClient, ChatMessage};
use crate::models::Role;
use crate::prompt;
use crate::retrieve;
use crate::store;

/// Result of one completed chat turn.
#[derive(Debug)]
pub struct TurnOutcome {
    pub session_id: String,
    pub reply: String,
}

/// Run a single chat turn.
///
/// With no `session_id`, a fresh session is created. A `document_filename`
/// rebinds the session to that document for this and subsequent turns;
/// otherwise the session's current binding is used. An unbound session
/// chats ungrounded.
pub async fn run_turn(
    pool: &SqlitePool,
    config: &Config,
    client: &ChatClient,
    session_id: Option<&str>,
    message: &str,
    document_filename: Option<&str>,
) -> Result<TurnOutcome> {
    if message.trim().is_empty() {
        bail!("message must not be empty");
    }

    let session = match session_id {
        Some(id) => match store::get_session(pool, id).await? {
            Some(s) => s,
            None => bail!("session not found: {}", id),
        },
        None => store::create_session(pool, None).await?,
    };

    // Resolve the active document: an explicit filename wins and rebinds
    // the session; otherwise keep the session's current binding.
    let active_document_id = match document_filename {
        Some(filename) => match store::get_document_by_filename(pool, filename).await? {
            Some(doc) => {
                if session.document_id.as_deref() != Some(doc.id.as_str()) {
                    store::update_session_document(pool, &session.id, Some(&doc.id)).await?;
                }
                Some(doc.id)
            }
            None => bail!("document not found: {}", filename),
        },
        None => session.document_id.clone(),
    };

    // History is captured before this turn is appended so the new message
    // appears exactly once in the prompt.
    let history = store::get_history(pool, &session.id, config.chat.history_limit).await?;

    store::save_message(
        pool,
        &session.id,
        Role::User,
        message,
        active_document_id.as_deref(),
    )
    .await?;

    let grounding = match active_document_id.as_deref() {
        Some(doc_id) => {
            retrieve::grounding_for(pool, doc_id, message, config.retrieval.context_chunks).await?
        }
        None => None,
    };

    let mut messages = Vec::with_capacity(history.len() + 2);
    match &grounding {
        Some(text) => {
            debug!(
                session = %session.id,
                grounding_chars = text.len(),
                "assembling grounded prompt"
            );
            messages.push(ChatMessage::system(prompt::pdf_system()));
        }
        None => {
            messages.push(ChatMessage::system(prompt::default_system()));
        }
    }

    for turn in &history {
        messages.push(match turn.role {
            Role::User => ChatMessage::user(turn.content.clone()),
            Role::Assistant => ChatMessage::assistant(turn.content.clone()),
        });
    }

    messages.push(match &grounding {
        Some(text) => ChatMessage::user(prompt::format_grounded_question(text, message)),
        None => ChatMessage::user(message),
    });

    let reply = client.complete(&messages).await?;

    store::save_message(
        pool,
        &session.id,
        Role::Assistant,
        &reply,
        active_document_id.as_deref(),
    )
    .await?;

    Ok(TurnOutcome {
        session_id: session.id,
        reply,
    })
}
