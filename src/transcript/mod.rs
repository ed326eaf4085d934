//! Transcript acquisition for Svar.
//!
//! Fetches a video's caption track, preferring English and falling back to
//! the first available language. "No captions" is an expected outcome, not
//! an error: acquisition returns a tri-state result and reserves `Err` for
//! genuinely unexpected faults (missing tools, I/O failures).

mod youtube;

pub use youtube::YoutubeTranscriptSource;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One caption snippet as delivered by the caption source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    /// Caption text.
    pub text: String,
    /// Start time in the video (seconds).
    pub start_seconds: f64,
    /// Display duration (seconds).
    pub duration_seconds: f64,
}

/// A full transcript for one video in one language.
///
/// Transcripts are never persisted; only the chunks derived from them are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Video ID the transcript belongs to.
    pub video_id: String,
    /// BCP-47 language code of the track (e.g. "en", "es").
    pub language_code: String,
    /// Whether the track was auto-generated rather than human-authored.
    pub is_generated: bool,
    /// Whether the pipeline can translate this track to English.
    pub is_translatable: bool,
    /// Ordered caption snippets.
    pub snippets: Vec<TranscriptSnippet>,
}

impl Transcript {
    /// Reduce the snippets to a single text blob with normalized whitespace.
    pub fn full_text(&self) -> String {
        let mut parts = Vec::with_capacity(self.snippets.len());
        for snippet in &self.snippets {
            let trimmed = snippet.text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
        parts.join(" ")
    }

    /// Whether the track is in English (no translation needed).
    pub fn is_english(&self) -> bool {
        is_english(&self.language_code)
    }
}

/// Whether a language code denotes English ("en" or a regional variant).
pub fn is_english(language_code: &str) -> bool {
    language_code == "en" || language_code.starts_with("en-")
}

/// Summary of one available caption track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// BCP-47 language code.
    pub language_code: String,
    /// Human-readable language name, when the provider supplies one.
    pub language_name: Option<String>,
    /// Whether the track is auto-generated.
    pub is_generated: bool,
    /// Whether the pipeline can translate this track to English.
    pub is_translatable: bool,
}

/// Outcome of a transcript acquisition attempt.
///
/// `NotAvailable` covers disabled captions and videos without any caption
/// track. It is terminal for the current attempt: retrying will not change
/// the outcome unless a transcript appears later.
#[derive(Debug, Clone)]
pub enum TranscriptOutcome {
    /// A caption track was found and fetched.
    Found(Transcript),
    /// No usable caption track exists; carries a human-readable reason.
    NotAvailable(String),
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the best available transcript for a video.
    async fn acquire(&self, video_id: &str) -> Result<TranscriptOutcome>;

    /// List the caption tracks available for a video.
    ///
    /// Returns `None` when the video has no caption tracks at all.
    async fn list_languages(&self, video_id: &str) -> Result<Option<Vec<LanguageInfo>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(text: &str, start: f64, duration: f64) -> TranscriptSnippet {
        TranscriptSnippet {
            text: text.to_string(),
            start_seconds: start,
            duration_seconds: duration,
        }
    }

    #[test]
    fn test_full_text_joins_and_normalizes() {
        let transcript = Transcript {
            video_id: "abc123def45".to_string(),
            language_code: "en".to_string(),
            is_generated: true,
            is_translatable: true,
            snippets: vec![
                snippet("The sky is blue.", 0.0, 2.0),
                snippet("  ", 2.0, 0.5),
                snippet(" Grass is green. ", 2.5, 2.0),
            ],
        };

        assert_eq!(transcript.full_text(), "The sky is blue. Grass is green.");
    }

    #[test]
    fn test_is_english() {
        assert!(is_english("en"));
        assert!(is_english("en-US"));
        assert!(!is_english("es"));
        assert!(!is_english("enx"));
    }
}
