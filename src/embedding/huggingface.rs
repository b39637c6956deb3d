//! Hugging Face inference embeddings.
//!
//! Calls the feature-extraction pipeline of a sentence-transformers model,
//! which returns one pooled vector per input text.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{Result, TubechatError};
use crate::openai::{create_http_client, DEFAULT_TIMEOUT_SECS};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Embedder backed by a Hugging Face feature-extraction endpoint.
pub struct HuggingFaceEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

impl HuggingFaceEmbedder {
    /// Create an embedder from settings.
    pub fn from_settings(settings: &EmbeddingSettings, api_key: Option<String>) -> Result<Self> {
        let client = create_http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?;
        Ok(Self::with_client(
            client,
            &settings.base_url,
            &settings.model,
            api_key,
            settings.batch_size,
        ))
    }

    /// Create an embedder with a custom HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        batch_size: usize,
    ) -> Self {
        let endpoint = format!(
            "{}/models/{}/pipeline/feature-extraction",
            base_url.trim_end_matches('/'),
            model
        );

        Self {
            client,
            endpoint,
            model: model.to_string(),
            api_key,
            batch_size: batch_size.max(1),
        }
    }

    async fn request_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&FeatureExtractionRequest { inputs: batch });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TubechatError::Embedding(format!(
                "{} returned {}: {}",
                self.model,
                status,
                body.trim()
            )));
        }

        let vectors: Vec<Vec<f32>> = response.json().await.map_err(|e| {
            TubechatError::Embedding(format!("Unexpected response from {}: {}", self.model, e))
        })?;

        if vectors.len() != batch.len() {
            return Err(TubechatError::Embedding(format!(
                "Expected {} embeddings from {}, got {}",
                batch.len(),
                self.model,
                vectors.len()
            )));
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TubechatError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.request_batch(batch).await?);
        }

        debug!("Generated {} embeddings with {}", all_embeddings.len(), self.model);
        Ok(all_embeddings)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
