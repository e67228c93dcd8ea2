//! # paperchat CLI
//!
//! The `paperchat` binary drives the assistant: database initialization,
//! PDF ingestion, one-shot chat turns, session management, and the HTTP
//! server.
//!
//! ## Usage
//!
//! ```bash
//! paperchat --config ./config/paperchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `paperchat init` | Create the SQLite database and run schema migrations |
//! | `paperchat upload <file.pdf>` | Extract, chunk, and store a PDF |
//! | `paperchat chat "<message>"` | Run one chat turn (requires `OPENAI_API_KEY`) |
//! | `paperchat documents` | List uploaded documents |
//! | `paperchat sessions list` | List sessions |
//! | `paperchat sessions delete <id>` | Delete a session and its messages |
//! | `paperchat serve` | Start the HTTP API |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use paperchat::llm::ChatClient;
use paperchat::{chat, config, db, extract, migrate, store, upload};

/// paperchat — chat with your PDFs through a grounded persona.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/paperchat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "paperchat",
    about = "A PDF-grounded chat assistant",
    version,
    long_about = "paperchat extracts and chunks uploaded PDFs into SQLite, then answers chat \
    messages with a persona prompt grounded in keyword-retrieved chunks, via the OpenAI \
    chat-completions API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/paperchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (documents,
    /// chunks, sessions, messages). Idempotent — safe to run repeatedly.
    Init,

    /// Extract, chunk, and store a PDF.
    ///
    /// Re-uploading the same filename updates the document's size and
    /// replaces its chunks.
    Upload {
        /// Path to the PDF file.
        file: PathBuf,
    },

    /// Run one chat turn and print the reply.
    ///
    /// Requires the OPENAI_API_KEY environment variable. Without --session
    /// a fresh session is created and its id printed.
    Chat {
        /// The user message.
        message: String,

        /// Continue an existing session.
        #[arg(long)]
        session: Option<String>,

        /// Ground the turn in an uploaded document (by filename). Rebinds
        /// the session to that document.
        #[arg(long)]
        document: Option<String>,
    },

    /// List uploaded documents.
    Documents,

    /// Manage chat sessions.
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum SessionAction {
    /// List all sessions, newest first.
    List,
    /// Delete a session and all of its messages.
    Delete {
        /// Session id.
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Upload { file } => {
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("invalid file path: {}", file.display()))?
                .to_string();
            let bytes = std::fs::read(&file)?;
            let content_type = if filename.to_lowercase().ends_with(".pdf") {
                extract::MIME_PDF
            } else {
                "application/octet-stream"
            };

            let pool = db::connect(&cfg).await?;
            let report = upload::ingest_pdf(&pool, &cfg, &filename, content_type, &bytes).await?;
            pool.close().await;

            println!("uploaded {}", report.filename);
            println!("  document id: {}", report.document_id);
            println!("  chunks written: {}", report.chunk_count);
        }
        Commands::Chat {
            message,
            session,
            document,
        } => {
            let client = ChatClient::new(&cfg.model)?;
            let pool = db::connect(&cfg).await?;
            let outcome = chat::run_turn(
                &pool,
                &cfg,
                &client,
                session.as_deref(),
                &message,
                document.as_deref(),
            )
            .await?;
            pool.close().await;

            println!("session: {}", outcome.session_id);
            println!();
            println!("{}", outcome.reply);
        }
        Commands::Documents => {
            let pool = db::connect(&cfg).await?;
            let docs = store::list_documents(&pool).await?;
            pool.close().await;

            if docs.is_empty() {
                println!("No documents.");
            }
            for doc in docs {
                println!("{}  {} bytes  {}", doc.id, doc.file_size, doc.filename);
            }
        }
        Commands::Sessions { action } => {
            let pool = db::connect(&cfg).await?;
            match action {
                SessionAction::List => {
                    let sessions = store::list_sessions(&pool).await?;
                    if sessions.is_empty() {
                        println!("No sessions.");
                    }
                    for s in sessions {
                        let doc = s.document_id.as_deref().unwrap_or("-");
                        println!("{}  document: {}", s.id, doc);
                    }
                }
                SessionAction::Delete { id } => {
                    if store::delete_session(&pool, &id).await? {
                        println!("deleted session {}", id);
                    } else {
                        pool.close().await;
                        anyhow::bail!("session not found: {}", id);
                    }
                }
            }
            pool.close().await;
        }
        Commands::Serve => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "info".into()),
                )
                .init();

            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            paperchat::server::run_server(&cfg, pool).await?;
        }
    }

    Ok(())
}
