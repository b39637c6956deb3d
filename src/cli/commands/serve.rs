//! Serve command: run the HTTP API.

use crate::cli::Output;
use crate::config::Settings;
use crate::server::{router, AppState};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    for var in missing_credentials(&settings) {
        Output::warning(&format!(
            "{} is not set; remote model requests will be unauthenticated.",
            var
        ));
    }

    let state = Arc::new(AppState::from_settings(&settings)?);
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("Tubechat API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Chat", "POST /chat");
    Output::kv("Health", "GET  /health");
    Output::kv("Cached videos", "GET  /videos");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Output::info("Server stopped.");
    Ok(())
}

/// Credential variables the configured services need but the environment lacks.
fn missing_credentials(settings: &Settings) -> Vec<String> {
    let mut missing = Vec::new();
    if settings.embedding_api_key().is_none() {
        missing.push(settings.embedding.api_key_env.clone());
    }
    if settings.llm_api_key().is_none() && !missing.contains(&settings.llm.api_key_env) {
        missing.push(settings.llm.api_key_env.clone());
    }
    missing
}
