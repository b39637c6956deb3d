//! Error types for Tubechat.

use thiserror::Error;

/// Library-level error type for Tubechat operations.
#[derive(Error, Debug)]
pub enum TubechatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Captions are disabled for video {0}")]
    CaptionsDisabled(String),

    #[error("No transcript found for video {video_id} in languages {requested:?} (available: {available:?})")]
    NoTranscriptFound {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("YouTube blocked the request for video {0}")]
    RequestBlocked(String),

    #[error("Transcript retrieval failed: {0}")]
    Transcript(String),

    #[error("Transcript for video {0} produced no text chunks")]
    EmptyTranscript(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl TubechatError {
    /// Whether the failure is the video owner having turned captions off.
    pub fn is_captions_disabled(&self) -> bool {
        matches!(self, TubechatError::CaptionsDisabled(_))
    }
}

/// Result type alias for Tubechat operations.
pub type Result<T> = std::result::Result<T, TubechatError>;
