//! Pipeline orchestrator for Tubechat.
//!
//! Turns a video ID into a searchable index: fetch transcript, split into
//! chunks, embed, and index. Built indices are cached for the life of the
//! process.

use crate::cache::IndexCache;
use crate::chunking::RecursiveTextSplitter;
use crate::config::{DistanceMetric, Settings};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{Result, TubechatError};
use crate::transcript::{Transcript, TranscriptSource, YoutubeTranscriptFetcher};
use crate::vector_store::VectorIndex;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// The main orchestrator for the Tubechat pipeline.
pub struct Orchestrator {
    transcripts: Arc<dyn TranscriptSource>,
    splitter: RecursiveTextSplitter,
    embedder: Arc<dyn Embedder>,
    cache: IndexCache,
    languages: Vec<String>,
    metric: DistanceMetric,
}

impl Orchestrator {
    /// Create an orchestrator wired to YouTube and the configured embedder.
    pub fn new(settings: &Settings) -> Result<Self> {
        let transcripts: Arc<dyn TranscriptSource> =
            Arc::new(YoutubeTranscriptFetcher::new(&settings.transcript)?);
        let embedder = create_embedder(settings)?;
        info!(
            "Using {} embeddings, cache holds {} videos",
            embedder.model(),
            match settings.cache.max_entries {
                0 => "unlimited".to_string(),
                n => n.to_string(),
            }
        );

        Ok(Self::with_components(
            transcripts,
            RecursiveTextSplitter::from_settings(&settings.chunking)?,
            embedder,
            IndexCache::new(settings.cache.max_entries),
            settings.transcript.languages.clone(),
            settings.retrieval.metric,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        transcripts: Arc<dyn TranscriptSource>,
        splitter: RecursiveTextSplitter,
        embedder: Arc<dyn Embedder>,
        cache: IndexCache,
        languages: Vec<String>,
        metric: DistanceMetric,
    ) -> Self {
        Self {
            transcripts,
            splitter,
            embedder,
            cache,
            languages,
            metric,
        }
    }

    /// Get a reference to the index cache.
    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Fetch the transcript for a video in the preferred languages.
    pub async fn fetch_transcript(&self, video_id: &str) -> Result<Transcript> {
        self.transcripts.fetch(video_id, &self.languages).await
    }

    /// Run the full pipeline for a video without touching the cache.
    #[instrument(skip(self))]
    pub async fn build_index(&self, video_id: &str) -> Result<VectorIndex> {
        let transcript = self.fetch_transcript(video_id).await?;
        info!(
            "Fetched {} transcript ({} segments, {:.0}s)",
            transcript.language_code,
            transcript.segments.len(),
            transcript.duration_seconds()
        );

        let chunks = self.splitter.split_text(&transcript.full_text);
        if chunks.is_empty() {
            return Err(TubechatError::EmptyTranscript(video_id.to_string()));
        }
        info!("Split transcript into {} chunks", chunks.len());

        VectorIndex::build(chunks, self.embedder.as_ref(), self.metric).await
    }

    /// Return the index for a video, building and caching it on first use.
    ///
    /// Failures are logged and reported as `None`; nothing is cached for
    /// them, so a later request tries again.
    pub async fn get_or_create(&self, video_id: &str) -> Option<Arc<VectorIndex>> {
        match self
            .cache
            .get_or_try_build(video_id, || self.build_index(video_id))
            .await
        {
            Ok(index) => Some(index),
            Err(e) if e.is_captions_disabled() => {
                warn!("No captions available for this video: {}", video_id);
                None
            }
            Err(e) => {
                error!("Error fetching transcript for {}: {}", video_id, error_chain(&e));
                None
            }
        }
    }
}

/// Render an error with its source chain, outermost first.
fn error_chain(err: &TubechatError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
