//! In-process stand-ins for the remote services, shared by unit tests.

use crate::embedding::Embedder;
use crate::error::{Result, TubechatError};
use crate::rag::ChatModel;
use crate::transcript::{Transcript, TranscriptSegment, TranscriptSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves fixed transcripts; unknown videos have captions disabled.
#[derive(Default)]
pub struct MockTranscripts {
    videos: HashMap<String, String>,
    calls: AtomicUsize,
}

impl MockTranscripts {
    pub fn with_video(mut self, video_id: &str, text: &str) -> Self {
        self.videos.insert(video_id.to_string(), text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptSource for MockTranscripts {
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = self
            .videos
            .get(video_id)
            .ok_or_else(|| TubechatError::CaptionsDisabled(video_id.to_string()))?;

        Ok(Transcript::new(
            video_id.to_string(),
            languages.first().cloned().unwrap_or_default(),
            false,
            vec![TranscriptSegment::new(text.as_str(), 0.0, 1.0)],
        ))
    }
}

/// Returns a configured vector per exact text, or a fallback vector.
pub struct MockEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    batch_calls: AtomicUsize,
    fail: bool,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: vec![1.0; dimensions],
            batch_calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(TubechatError::Embedding("embedding endpoint unavailable".to_string()));
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vector_for(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|t| self.vector_for(t)).collect()
    }

    fn model(&self) -> &str {
        "mock-embedder"
    }
}

/// Answers with the prompt it was given, or fails with a fixed message.
#[derive(Default)]
pub struct EchoChat {
    prompts: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl EchoChat {
    pub fn failing(message: &str) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ChatModel for EchoChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        match &self.failure {
            Some(message) => Err(TubechatError::Generation(message.clone())),
            None => Ok(prompt.to_string()),
        }
    }
}
