//! Embedding generation for semantic search and retrieval.

mod huggingface;
mod openai;

pub use huggingface::HuggingFaceEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, Settings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Create the embedder selected in settings.
pub fn create_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let api_key = settings.embedding_api_key();
    let embedder: Arc<dyn Embedder> = match settings.embedding.provider {
        EmbeddingProvider::HuggingFace => {
            Arc::new(HuggingFaceEmbedder::from_settings(&settings.embedding, api_key)?)
        }
        EmbeddingProvider::OpenAI => {
            Arc::new(OpenAIEmbedder::from_settings(&settings.embedding, api_key)?)
        }
    };
    Ok(embedder)
}
