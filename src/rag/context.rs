//! Context retrieval for RAG responses.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{SearchResult, VectorIndex};
use std::sync::Arc;
use tracing::debug;

/// Chunks retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 2;

/// Retrieves the chunks of one video's index closest to a question.
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    /// Create a new retriever.
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            index,
            embedder,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set the number of chunks to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Embed the question and return the nearest chunks, best first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(question).await?;
        let results = self.index.search(&query_embedding, self.top_k)?;
        debug!(
            "Retrieved chunks {:?}",
            results.iter().map(|r| r.chunk.order).collect::<Vec<_>>()
        );
        Ok(results)
    }
}

/// Join retrieved chunk texts into the context block of the prompt.
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
