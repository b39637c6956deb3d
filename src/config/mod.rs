//! Configuration module for Tubechat.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    CacheSettings, ChunkingSettings, DistanceMetric, EmbeddingProvider, EmbeddingSettings,
    GeneralSettings, LlmSettings, PromptSettings, RetrievalSettings, ServerSettings, Settings,
    TranscriptSettings,
};
