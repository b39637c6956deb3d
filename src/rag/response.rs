//! RAG response generation.

use super::context::{format_context, Retriever, DEFAULT_TOP_K};
use crate::config::{LlmSettings, Prompts};
use crate::embedding::Embedder;
use crate::error::{Result, TubechatError};
use crate::openai::{create_client, DEFAULT_TIMEOUT_SECS};
use crate::vector_store::{SearchResult, VectorIndex};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// A chat-capable language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a filled prompt and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat model reached through an OpenAI-compatible completion endpoint.
pub struct OpenAICompatibleChat {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
}

impl OpenAICompatibleChat {
    /// Create a chat model from settings.
    pub fn from_settings(settings: &LlmSettings, api_key: Option<String>) -> Result<Self> {
        let client = create_client(
            &settings.base_url,
            api_key.as_deref(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )?;
        Ok(Self::with_client(client, &settings.model, settings.temperature))
    }

    /// Create a chat model with a custom client.
    pub fn with_client(
        client: async_openai::Client<OpenAIConfig>,
        model: &str,
        temperature: Option<f32>,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAICompatibleChat {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| TubechatError::Generation(e.to_string()))?
                .into(),
        ];

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(&self.model).messages(messages);
        if let Some(temperature) = self.temperature {
            request.temperature(temperature);
        }
        let request = request
            .build()
            .map_err(|e| TubechatError::Generation(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            TubechatError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| TubechatError::Generation("Empty response from LLM".to_string()))
    }
}

/// RAG engine for question answering over one video's index.
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
    top_k: usize,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(embedder: Arc<dyn Embedder>, chat: Arc<dyn ChatModel>) -> Self {
        Self {
            embedder,
            chat,
            prompts: Prompts::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Answer `question` from the chunks of `index`.
    #[instrument(skip(self, index))]
    pub async fn ask(&self, index: Arc<VectorIndex>, question: &str) -> Result<RagResponse> {
        info!("Processing question: {}", question);

        let retriever = Retriever::new(index, self.embedder.clone()).with_top_k(self.top_k);
        let sources = retriever.retrieve(question).await?;

        let context = format_context(&sources);
        let prompt = self.prompts.render_answer(&context, question);

        let answer = self.chat.complete(&prompt).await?;
        debug!("Generated response from {} sources", sources.len());

        Ok(RagResponse { answer, sources })
    }
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Chunks the answer was generated from, best first.
    pub sources: Vec<SearchResult>,
}
