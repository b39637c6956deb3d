//! HTTP client construction shared by the remote services.

use crate::error::{Result, TubechatError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for remote API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Build a reqwest client with the given timeout.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(TubechatError::Http)
}

/// Create an OpenAI-compatible client pointed at `base_url`.
///
/// Works against api.openai.com as well as any server speaking the same
/// protocol (the Hugging Face router, vLLM, Ollama's `/v1`).
pub fn create_client(
    base_url: &str,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let mut config = OpenAIConfig::new().with_api_base(base_url.trim_end_matches('/'));
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }

    Ok(Client::with_config(config).with_http_client(create_http_client(timeout)?))
}

/// Read a credential from the first non-empty environment variable in `names`.
pub fn api_key_from_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter(|name| !name.is_empty())
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
}
