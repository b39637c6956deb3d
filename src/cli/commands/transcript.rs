//! Transcript command: print a video's captions.

use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::{normalize_video_id, TranscriptSource, YoutubeTranscriptFetcher};
use anyhow::Result;

/// Run the transcript command.
pub async fn run_transcript(
    video: &str,
    languages: Vec<String>,
    timestamps: bool,
    settings: Settings,
) -> Result<()> {
    let video_id = normalize_video_id(video)?;
    let languages = if languages.is_empty() {
        settings.transcript.languages.clone()
    } else {
        languages
    };

    let fetcher = YoutubeTranscriptFetcher::new(&settings.transcript)?;

    let spinner = Output::spinner(&format!("Fetching transcript for {}...", video_id));
    let result = fetcher.fetch(&video_id, &languages).await;
    spinner.finish_and_clear();

    let transcript = match result {
        Ok(transcript) => transcript,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    Output::kv("Language", &transcript.language_code);
    Output::kv(
        "Kind",
        if transcript.is_generated {
            "auto-generated"
        } else {
            "manual"
        },
    );
    Output::kv("Segments", &transcript.segments.len().to_string());
    println!();

    if timestamps {
        println!("{}", transcript.format_with_timestamps());
    } else {
        println!("{}", transcript.full_text);
    }

    Ok(())
}
