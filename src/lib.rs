//! # paperchat
//!
//! A PDF-grounded chat assistant: upload a PDF, then chat with a persona
//! that answers with opinions grounded in the document's content.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌───────────────┐   ┌──────────┐
//! │ Upload  │──▶│ Extract+Chunk │──▶│  SQLite   │
//! │ (PDF)   │   │ (windows)     │   │ chunks    │
//! └─────────┘   └───────────────┘   └────┬─────┘
//!                                        │
//!              ┌─────────────────────────┤
//!              ▼                         ▼
//!         ┌──────────┐            ┌──────────────┐
//!         │ Retrieve │───prompt──▶│ Chat model    │
//!         │ (terms)  │            │ (completions) │
//!         └──────────┘            └──────────────┘
//! ```
//!
//! On each chat turn the retriever selects a bounded subset of the bound
//! document's chunks by naive keyword matching; the selection, the persona
//! system prompt, and the recent conversation history are assembled into a
//! single completion request.
//!
//! ## Quick Start
//!
//! ```bash
//! paperchat init                        # create database
//! paperchat upload ./report.pdf         # extract, chunk, and store
//! paperchat chat "what is the total?" --document report.pdf
//! paperchat serve                       # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Sliding-window text chunking |
//! | [`retrieve`] | Keyword chunk retrieval |
//! | [`extract`] | PDF text extraction |
//! | [`store`] | SQLite accessors |
//! | [`prompt`] | Persona prompts and grounding templates |
//! | [`llm`] | Chat-completions client |
//! | [`upload`] | Upload pipeline |
//! | [`chat`] | Chat-turn orchestration |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod extract;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod retrieve;
pub mod server;
pub mod store;
pub mod upload;
