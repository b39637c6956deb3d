//! In-memory exact nearest-neighbor index.

use super::{similarity, IndexedChunk, SearchResult};
use crate::config::DistanceMetric;
use crate::embedding::Embedder;
use crate::error::{Result, TubechatError};
use tracing::{debug, instrument};

/// Brute-force vector index over the chunks of one transcript.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    chunks: Vec<IndexedChunk>,
    metric: DistanceMetric,
    dimensions: usize,
}

impl VectorIndex {
    /// Pair each chunk with the embedding at the same position.
    pub fn from_embeddings(
        chunks: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        metric: DistanceMetric,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(TubechatError::VectorStore(
                "cannot build an index without chunks".to_string(),
            ));
        }
        if chunks.len() != embeddings.len() {
            return Err(TubechatError::VectorStore(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let dimensions = embeddings[0].len();
        if dimensions == 0 || embeddings.iter().any(|e| e.len() != dimensions) {
            return Err(TubechatError::VectorStore(
                "embeddings have inconsistent dimensions".to_string(),
            ));
        }

        let chunks = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(order, (content, embedding))| IndexedChunk {
                order,
                content,
                embedding,
            })
            .collect();

        Ok(Self {
            chunks,
            metric,
            dimensions,
        })
    }

    /// Embed `chunks` and index them.
    #[instrument(skip(chunks, embedder), fields(count = chunks.len(), model = embedder.model()))]
    pub async fn build(
        chunks: Vec<String>,
        embedder: &dyn Embedder,
        metric: DistanceMetric,
    ) -> Result<Self> {
        let embeddings = embedder.embed_batch(&chunks).await?;
        let index = Self::from_embeddings(chunks, embeddings, metric)?;
        debug!("Indexed {} chunks ({} dimensions)", index.len(), index.dimensions);
        Ok(index)
    }

    /// Return the `k` chunks closest to `query`, best first.
    ///
    /// Equal scores are ordered by position in the transcript so results are
    /// deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimensions {
            return Err(TubechatError::VectorStore(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let score = similarity(self.metric, query, &chunk.embedding);
                // Undefined scores rank last.
                (if score.is_nan() { f32::NEG_INFINITY } else { score }, chunk)
            })
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b.total_cmp(score_a).then(a.order.cmp(&b.order))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, chunk)| SearchResult {
                chunk: chunk.clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Indexed chunks in transcript order.
    pub fn chunks(&self) -> &[IndexedChunk] {
        &self.chunks
    }
}
