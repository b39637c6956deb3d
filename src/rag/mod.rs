//! RAG (Retrieval-Augmented Generation) for answering questions about a video.

pub mod context;
mod response;

pub use context::{format_context, Retriever, DEFAULT_TOP_K};
pub use response::{ChatModel, OpenAICompatibleChat, RagEngine, RagResponse};
