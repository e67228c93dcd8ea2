//! HTTP API for the chat assistant.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/upload` | Multipart PDF upload |
//! | `POST` | `/chat` | Run one chat turn |
//! | `GET`  | `/documents` | List uploaded documents |
//! | `GET`  | `/sessions` | List sessions |
//! | `POST` | `/sessions` | Create a session |
//! | `DELETE` | `/sessions/{id}` | Delete a session and its messages |
//! | `GET`  | `/sessions/{id}/messages` | Conversation history, oldest first |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `too_large` (413),
//! `upstream` (502), `internal` (500). Validation problems surface as 400s;
//! uploads beyond `[uploads].max_bytes` surface as 413; model-API and
//! storage failures surface as 5xx with the underlying message, not retried
//! here (the model client carries its own backoff).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::chat;
use crate::config::Config;
use crate::extract;
use crate::llm::ChatClient;
use crate::models::{Document, Message, Session};
use crate::store;
use crate::upload;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    client: Arc<ChatClient>,
}

/// Starts the HTTP server.
///
/// Binds to `[server].bind`, serves until ctrl-c, then closes the pool.
/// Fails at startup when `OPENAI_API_KEY` is missing so a half-working
/// deployment never accepts chat traffic it cannot answer.
pub async fn run_server(config: &Config, pool: SqlitePool) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let client = Arc::new(ChatClient::new(&config.model)?);

    let state = AppState {
        config: Arc::new(config.clone()),
        pool: pool.clone(),
        client,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        // Axum caps request bodies at 2 MiB by default, far below a typical
        // scanned PDF; uploads get their own configured ceiling.
        .route(
            "/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(config.uploads.max_bytes)),
        )
        .route("/chat", post(handle_chat))
        .route("/documents", get(handle_list_documents))
        .route(
            "/sessions",
            get(handle_list_sessions).post(handle_create_session),
        )
        .route("/sessions/{id}", delete(handle_delete_session))
        .route("/sessions/{id}/messages", get(handle_get_messages))
        .layer(cors)
        .with_state(state);

    info!("listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps pipeline errors to the most appropriate status code. Caller errors
/// (bad input, unknown names) become 4xx; model-API failures become 502;
/// everything else is a 500.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("not found") {
        not_found(msg)
    } else if msg.contains("must not be empty")
        || msg.contains("no file provided")
        || msg.contains("unsupported content-type")
        || msg.contains("empty or unreadable")
        || msg.contains("extraction failed")
    {
        bad_request(msg)
    } else if msg.contains("chat completion") {
        AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "upstream".to_string(),
            message: msg,
        }
    } else {
        internal(msg)
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    document_id: String,
    filename: String,
    chunk_count: usize,
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;

    let limit = state.config.uploads.max_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(&filename));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, limit))?;
        file = Some((filename, content_type, bytes.to_vec()));
        break;
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| bad_request("no file provided"))?;

    let report = upload::ingest_pdf(&state.pool, &state.config, &filename, &content_type, &bytes)
        .await
        .map_err(classify_error)?;

    info!(
        filename = %report.filename,
        chunks = report.chunk_count,
        "document ingested"
    );

    Ok(Json(UploadResponse {
        document_id: report.document_id,
        filename: report.filename,
        chunk_count: report.chunk_count,
    }))
}

/// An oversized body surfaces from the multipart reader as a length-limit
/// error; everything else is a malformed request.
fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            code: "too_large".to_string(),
            message: format!("file too large: uploads are limited to {} bytes", limit),
        }
    } else {
        bad_request(format!("invalid multipart body: {}", err))
    }
}

/// Browsers sometimes omit the part's content type; fall back to the
/// extension so a plain `.pdf` upload still works.
fn guess_content_type(filename: &str) -> String {
    if filename.to_lowercase().ends_with(".pdf") {
        extract::MIME_PDF.to_string()
    } else {
        "application/octet-stream".to_string()
    }
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    reply: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let outcome = chat::run_turn(
        &state.pool,
        &state.config,
        &state.client,
        req.session_id.as_deref(),
        &req.message,
        req.filename.as_deref(),
    )
    .await
    .map_err(classify_error)?;

    info!(session = %outcome.session_id, "chat turn completed");

    Ok(Json(ChatResponse {
        session_id: outcome.session_id,
        reply: outcome.reply,
    }))
}

// ============ Documents and sessions ============

async fn handle_list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<Document>>, AppError> {
    let docs = store::list_documents(&state.pool)
        .await
        .map_err(classify_error)?;
    Ok(Json(docs))
}

async fn handle_list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Session>>, AppError> {
    let sessions = store::list_sessions(&state.pool)
        .await
        .map_err(classify_error)?;
    Ok(Json(sessions))
}

#[derive(Deserialize)]
struct CreateSessionRequest {
    #[serde(default)]
    filename: Option<String>,
}

async fn handle_create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<Session>, AppError> {
    let document_id = match req.filename.as_deref() {
        Some(filename) => match store::get_document_by_filename(&state.pool, filename)
            .await
            .map_err(classify_error)?
        {
            Some(doc) => Some(doc.id),
            None => return Err(not_found(format!("document not found: {}", filename))),
        },
        None => None,
    };

    let session = store::create_session(&state.pool, document_id.as_deref())
        .await
        .map_err(classify_error)?;
    Ok(Json(session))
}

async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let deleted = store::delete_session(&state.pool, &id)
        .await
        .map_err(classify_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("session not found: {}", id)))
    }
}

#[derive(Serialize)]
struct MessageView {
    id: String,
    role: &'static str,
    content: String,
    document_id: Option<String>,
    created_at: i64,
}

impl From<Message> for MessageView {
    fn from(m: Message) -> Self {
        MessageView {
            id: m.id,
            role: m.role.as_str(),
            content: m.content,
            document_id: m.document_id,
            created_at: m.created_at,
        }
    }
}

async fn handle_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageView>>, AppError> {
    if store::get_session(&state.pool, &id)
        .await
        .map_err(classify_error)?
        .is_none()
    {
        return Err(not_found(format!("session not found: {}", id)));
    }

    let messages = store::get_messages(&state.pool, &id)
        .await
        .map_err(classify_error)?;
    Ok(Json(messages.into_iter().map(MessageView::from).collect()))
}
