//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::server::AppState;
use crate::transcript::normalize_video_id;
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(video: &str, question: &str, settings: Settings) -> Result<()> {
    let video_id = normalize_video_id(video)?;
    let state = AppState::from_settings(&settings)?;

    let spinner = Output::spinner(&format!("Indexing transcript for {}...", video_id));
    let index = match state.orchestrator.build_index(&video_id).await {
        Ok(index) => Arc::new(index),
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Could not process video transcript: {}", e));
            return Err(e.into());
        }
    };

    spinner.set_message(format!("Answering from {} chunks...", index.len()));

    match state.engine.ask(index, question).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.answer);

            if !response.sources.is_empty() {
                Output::header("Sources");
                for source in &response.sources {
                    Output::source(source.chunk.order + 1, source.score, &source.chunk.content);
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
