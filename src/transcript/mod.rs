//! Transcript retrieval for YouTube videos.
//!
//! Provides a trait-based interface so the pipeline can run against the live
//! caption service or an in-process stand-in.

mod youtube;

pub use youtube::YoutubeTranscriptFetcher;

use crate::error::{Result, TubechatError};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A complete caption transcript for one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Video ID this transcript belongs to.
    pub video_id: String,
    /// Language code of the caption track that was used.
    pub language_code: String,
    /// Whether the track was generated by speech recognition.
    pub is_generated: bool,
    /// Caption segments in original order.
    pub segments: Vec<TranscriptSegment>,
    /// All segment texts joined with a single space.
    pub full_text: String,
}

impl Transcript {
    /// Create a new transcript from segments.
    pub fn new(
        video_id: String,
        language_code: String,
        is_generated: bool,
        segments: Vec<TranscriptSegment>,
    ) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            video_id,
            language_code,
            is_generated,
            segments,
            full_text,
        }
    }

    /// End of the last segment, in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.segments.last().map(|s| s.end_seconds()).unwrap_or(0.0)
    }

    /// Format the transcript with timestamps for display.
    pub fn format_with_timestamps(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("[{}] {}", format_timestamp(s.start_seconds), s.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A single caption line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text.
    pub text: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// Display duration in seconds.
    pub duration_seconds: f64,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(text: impl Into<String>, start_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            text: text.into(),
            start_seconds,
            duration_seconds,
        }
    }

    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// Source of caption transcripts.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript for `video_id` in the first available language of
    /// `languages` (preferred first).
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<Transcript>;
}

// Matches various YouTube URL formats; bare IDs are handled by the caller.
static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:https?://)?
        (?:www\.|m\.)?
        (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
        ([a-zA-Z0-9_-]{11})
        ",
    )
    .expect("video URL pattern is valid")
});

/// Normalize user input to a video ID.
///
/// Full YouTube URLs are reduced to their 11-character ID; anything else is
/// treated as an opaque ID and returned trimmed.
pub fn normalize_video_id(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TubechatError::InvalidInput("video id is empty".to_string()));
    }

    Ok(VIDEO_URL
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| input.to_string()))
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_joins_segments_in_order() {
        let segments = vec![
            TranscriptSegment::new("Hello world", 0.0, 2.5),
            TranscriptSegment::new("this is a test", 2.5, 3.0),
        ];

        let transcript = Transcript::new("abc".to_string(), "en".to_string(), false, segments);

        assert_eq!(transcript.full_text, "Hello world this is a test");
        assert_eq!(transcript.duration_seconds(), 5.5);
    }

    #[test]
    fn test_normalize_video_id() {
        assert_eq!(
            normalize_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            normalize_video_id("https://www.youtube.com/watch?list=PL1&v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(normalize_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
        assert_eq!(
            normalize_video_id("https://youtube.com/shorts/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(normalize_video_id("  dQw4w9WgXcQ ").unwrap(), "dQw4w9WgXcQ");
        assert_eq!(normalize_video_id("X").unwrap(), "X");
        assert!(normalize_video_id("   ").is_err());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.0), "01:05");
        assert_eq!(format_timestamp(3665.0), "01:01:05");
    }
}
