//! Transcript chunking for embedding and retrieval.
//!
//! Splits long text into overlapping, size-bounded chunks, preferring
//! paragraph, line and word boundaries before falling back to characters.

use crate::config::ChunkingSettings;
use crate::error::{Result, TubechatError};
use std::collections::VecDeque;
use tracing::warn;

/// Separators tried in order: paragraphs, lines, words, characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Configuration for chunking. Sizes are measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Maximum characters shared with the previous chunk.
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Create a validated chunking configuration.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(TubechatError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap > chunk_size {
            return Err(TubechatError::Config(format!(
                "chunk_overlap ({}) is larger than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Recursive character text splitter.
#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    /// Create a splitter with the default separators.
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a splitter from settings.
    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Ok(Self::new(ChunkingConfig::new(
            settings.chunk_size,
            settings.chunk_overlap,
        )?))
    }

    /// Replace the separator hierarchy.
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Split text into ordered, overlapping chunks.
    ///
    /// Empty or whitespace-only input yields no chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = "";
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_pieces(&pending));
                pending.clear();
            }
            if remaining.is_empty() {
                push_trimmed(&mut chunks, piece);
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_pieces(&pending));
        }

        chunks
    }

    /// Greedily merge small pieces into chunks, carrying an overlapping tail
    /// from each emitted chunk into the next.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let ChunkingConfig {
            chunk_size,
            chunk_overlap,
        } = self.config;

        let mut merged = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > chunk_size && !current.is_empty() {
                if total > chunk_size {
                    warn!(
                        "Created a chunk of {} characters, longer than the limit of {}",
                        total, chunk_size
                    );
                }
                push_joined(&mut merged, &current);

                while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, front_len)) => total -= front_len,
                        None => break,
                    }
                }
            }

            current.push_back((piece, len));
            total += len;
        }

        push_joined(&mut merged, &current);
        merged
    }
}

impl Default for RecursiveTextSplitter {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

/// Split on `separator`, attaching each separator to the piece that follows
/// it. The empty separator splits into single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn push_joined(out: &mut Vec<String>, pieces: &VecDeque<(&str, usize)>) {
    let joined: String = pieces.iter().map(|(p, _)| *p).collect();
    push_trimmed(out, &joined);
}

fn push_trimmed(out: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Text without any whitespace so only the character separator applies.
    fn letters(len: usize) -> String {
        (0..len)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect()
    }

    fn expected_count(len: usize, size: usize, overlap: usize) -> usize {
        (len - overlap).div_ceil(size - overlap)
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        let splitter = RecursiveTextSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text(" \n\n \t ").is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = RecursiveTextSplitter::default();
        assert_eq!(splitter.split_text("A B C"), vec!["A B C".to_string()]);
    }

    #[test]
    fn test_boundary_law_and_reconstruction() {
        let splitter = RecursiveTextSplitter::default();

        for len in [1001, 1500, 1800, 1801, 2600, 5000, 12345] {
            let text = letters(len);
            let chunks = splitter.split_text(&text);

            assert_eq!(chunks.len(), expected_count(len, 1000, 200), "length {}", len);

            let mut rebuilt = chunks[0].clone();
            for (i, chunk) in chunks.iter().enumerate() {
                assert!(chunk.chars().count() <= 1000);
                let start = 800 * i;
                assert_eq!(&text[start..start + chunk.len()], chunk.as_str());
                if i > 0 {
                    rebuilt.extend(chunk.chars().skip(200));
                }
            }
            assert_eq!(rebuilt, text, "length {}", len);
        }
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        let splitter = RecursiveTextSplitter::new(ChunkingConfig::new(10, 2).unwrap());
        let text = "ü".repeat(25);
        let chunks = splitter.split_text(&text);

        assert_eq!(chunks.len(), expected_count(25, 10, 2));
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_prefers_word_boundaries_and_overlaps() {
        let splitter = RecursiveTextSplitter::new(ChunkingConfig::new(40, 12).unwrap());
        let text = (0..30)
            .map(|i| format!("word{:02}", i))
            .collect::<Vec<_>>()
            .join(" ");

        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 1);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40);
            // Never cut inside a word.
            for word in chunk.split(' ') {
                assert_eq!(word.len(), 6, "partial word {:?} in {:?}", word, chunk);
            }
        }
        for pair in chunks.windows(2) {
            let first_word = pair[1].split(' ').next().unwrap();
            assert!(pair[0].contains(first_word), "no overlap between {:?}", pair);
        }

        let words: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
        assert_eq!(words.first(), Some(&"word00"));
        assert_eq!(words.last(), Some(&"word29"));
    }

    #[test]
    fn test_paragraphs_stay_together_when_they_fit() {
        let splitter = RecursiveTextSplitter::new(ChunkingConfig::new(30, 0).unwrap());
        let text = "first paragraph here\n\nsecond paragraph here";

        let chunks = splitter.split_text(text);
        assert_eq!(
            chunks,
            vec!["first paragraph here".to_string(), "second paragraph here".to_string()]
        );
    }

    #[test]
    fn test_invalid_config() {
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(100, 101).is_err());
        assert!(ChunkingConfig::new(100, 100).is_ok());
    }
}
