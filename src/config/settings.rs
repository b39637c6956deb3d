//! Configuration settings for Tubechat.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub transcript: TranscriptSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub cache: CacheSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Caption retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Acceptable caption languages, preferred first.
    pub languages: Vec<String>,
    /// YouTube origin (overridable for testing or proxies).
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            languages: vec!["en-US".to_string(), "en".to_string()],
            base_url: "https://www.youtube.com".to_string(),
            timeout_secs: crate::openai::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Text splitting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Hugging Face inference feature-extraction pipeline.
    #[default]
    HuggingFace,
    /// OpenAI embeddings API.
    OpenAI,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(EmbeddingProvider::HuggingFace),
            "openai" => Ok(EmbeddingProvider::OpenAI),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::HuggingFace => write!(f, "huggingface"),
            EmbeddingProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (huggingface, openai).
    pub provider: EmbeddingProvider,
    /// Embedding model to use.
    pub model: String,
    /// Provider API base URL.
    pub base_url: String,
    /// Embedding dimensions (OpenAI only; Hugging Face models fix their own).
    pub dimensions: u32,
    /// Texts per embedding request.
    pub batch_size: usize,
    /// Environment variable holding the provider credential.
    pub api_key_env: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::HuggingFace,
            model: "sentence-transformers/all-mpnet-base-v2".to_string(),
            base_url: "https://router.huggingface.co/hf-inference".to_string(),
            dimensions: 768,
            batch_size: 32,
            api_key_env: "HF_TOKEN".to_string(),
        }
    }
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Model identifier sent with every completion request.
    pub model: String,
    /// OpenAI-compatible API base URL.
    pub base_url: String,
    /// Sampling temperature (provider default when unset).
    pub temperature: Option<f32>,
    /// Environment variable holding the provider credential.
    pub api_key_env: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "deepseek-ai/DeepSeek-V3.2".to_string(),
            base_url: "https://router.huggingface.co/v1".to_string(),
            temperature: None,
            api_key_env: "HF_TOKEN".to_string(),
        }
    }
}

/// Similarity metric used by the vector index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity (higher is closer).
    #[default]
    Cosine,
    /// Euclidean distance, scored as its negation.
    Euclidean,
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Similarity metric for nearest-neighbor search.
    pub metric: DistanceMetric,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 2,
            metric: DistanceMetric::Cosine,
        }
    }
}

/// Index cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of cached video indices (0 = unbounded).
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { max_entries: 128 }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

/// Hugging Face tokens are commonly exported under either name.
const HF_TOKEN_FALLBACK: &str = "HUGGINGFACEHUB_API_TOKEN";

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TubechatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubechat")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::TubechatError;

        if self.transcript.languages.is_empty() {
            return Err(TubechatError::Config(
                "transcript.languages must list at least one language".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(TubechatError::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(TubechatError::Config(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        crate::chunking::ChunkingConfig::new(self.chunking.chunk_size, self.chunking.chunk_overlap)
            .map(|_| ())
    }

    /// Credential for the embedding provider, read from the environment.
    pub fn embedding_api_key(&self) -> Option<String> {
        Self::credential(&self.embedding.api_key_env)
    }

    /// Credential for the chat model provider, read from the environment.
    pub fn llm_api_key(&self) -> Option<String> {
        Self::credential(&self.llm.api_key_env)
    }

    fn credential(var: &str) -> Option<String> {
        if var == "HF_TOKEN" {
            crate::openai::api_key_from_env(&[var, HF_TOKEN_FALLBACK])
        } else {
            crate::openai::api_key_from_env(&[var])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let settings = Settings::default();
        assert_eq!(settings.chunking.chunk_size, 1000);
        assert_eq!(settings.chunking.chunk_overlap, 200);
        assert_eq!(settings.retrieval.top_k, 2);
        assert_eq!(settings.transcript.languages, vec!["en-US", "en"]);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::HuggingFace);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8080

[embedding]
provider = "openai"
model = "text-embedding-3-small"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.embedding.provider, EmbeddingProvider::OpenAI);
        assert_eq!(settings.chunking.chunk_size, 1000);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.server.port, 5000);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[chunking]\nchunk_size = 100\nchunk_overlap = 500\n").unwrap();

        assert!(Settings::load_from(Some(&path)).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut settings = Settings::default();
        settings.cache.max_entries = 7;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.cache.max_entries, 7);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("hf".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::HuggingFace);
        assert_eq!("OpenAI".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::OpenAI);
        assert!("cohere".parse::<EmbeddingProvider>().is_err());
    }
}
