//! Tubechat - Chat with YouTube videos
//!
//! Answers questions about a YouTube video using retrieval-augmented
//! generation over the video's caption transcript.
//!
//! # Overview
//!
//! For each video Tubechat:
//! - Fetches the caption transcript (manual tracks preferred over generated)
//! - Splits it into overlapping chunks
//! - Embeds the chunks and keeps an in-memory vector index per video
//! - Answers each question from the chunks nearest to it
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `transcript` - Caption retrieval from YouTube
//! - `chunking` - Recursive character text splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - In-memory vector index
//! - `cache` - Per-video index cache
//! - `rag` - Retrieval and answer generation
//! - `orchestrator` - Pipeline coordination
//! - `server` - HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use tubechat::config::Settings;
//! use tubechat::server::AppState;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let state = AppState::from_settings(&settings)?;
//!
//!     let index = state.orchestrator.build_index("dQw4w9WgXcQ").await?;
//!     let response = state.engine.ask(index.into(), "What is this video about?").await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod server;
pub mod transcript;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, TubechatError};
