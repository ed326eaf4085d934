//! Transcript translation via the chat model.
//!
//! Non-English transcripts are translated to English before chunking. The
//! text is split on word boundaries into pieces that fit the model's input
//! budget and each piece is translated with its own call. A failed piece
//! keeps its original-language text instead of aborting the whole
//! translation: a partly translated transcript still indexes and retrieves
//! better than no transcript at all.

use crate::config::{Prompts, TranslationSettings};
use crate::error::{Result, SvarError};
use crate::llm;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Chat-model-backed translator.
pub struct Translator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_chunk_chars: usize,
    throttle: Duration,
    prompts: Prompts,
}

impl Translator {
    /// Create a translator around an injected chat client.
    pub fn new(
        client: async_openai::Client<async_openai::config::OpenAIConfig>,
        settings: &TranslationSettings,
        prompts: Prompts,
    ) -> Self {
        Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_chunk_chars: settings.max_chunk_chars,
            throttle: Duration::from_millis(settings.throttle_ms),
            prompts,
        }
    }

    /// Translate text to English. Identity for English input.
    #[instrument(skip(self, text), fields(source_language = %source_language, chars = text.len()))]
    pub async fn translate(&self, text: &str, source_language: &str) -> Result<String> {
        if crate::transcript::is_english(source_language) {
            return Ok(text.to_string());
        }

        let pieces = split_for_translation(text, self.max_chunk_chars);
        debug!("Translating {} pieces from {}", pieces.len(), source_language);

        let mut translated = Vec::with_capacity(pieces.len());
        for (i, piece) in pieces.iter().enumerate() {
            match self.translate_piece(piece, source_language).await {
                Ok(english) => translated.push(english),
                Err(e) => {
                    // Degrade, don't abort: keep the original-language piece
                    warn!("Translation of piece {}/{} failed: {}", i + 1, pieces.len(), e);
                    translated.push(piece.clone());
                }
            }

            if i + 1 < pieces.len() {
                tokio::time::sleep(self.throttle).await;
            }
        }

        Ok(translated.join(" "))
    }

    async fn translate_piece(&self, piece: &str, source_language: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("text".to_string(), piece.to_string());
        vars.insert("source_language".to_string(), source_language.to_string());

        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.translation.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.translation.system.clone())
                .build()
                .map_err(|e| SvarError::Translation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| SvarError::Translation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| SvarError::Translation(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            if llm::is_auth_error(&e) {
                SvarError::InvalidApiKey
            } else {
                SvarError::LlmApi(format!("Translation request failed: {}", e))
            }
        })?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| SvarError::Translation("Empty response from model".to_string()))?;

        Ok(answer.trim().to_string())
    }
}

/// Split text into word-bounded pieces of at most `max_chars` characters.
///
/// A single word longer than the budget becomes its own piece rather than
/// being cut mid-word.
pub fn split_for_translation(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed > max_chars && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmSettings, TranslationSettings};

    fn translator() -> Translator {
        Translator::new(
            llm::chat_client(&LlmSettings::default()),
            &TranslationSettings::default(),
            Prompts::default(),
        )
    }

    #[tokio::test]
    async fn test_english_is_identity() {
        // No model call happens for English input, so this runs offline
        let translator = translator();
        let text = "The sky is blue. Grass is green.";
        assert_eq!(translator.translate(text, "en").await.unwrap(), text);
        assert_eq!(translator.translate(text, "en-US").await.unwrap(), text);
    }

    #[test]
    fn test_split_respects_word_boundaries() {
        let pieces = split_for_translation("uno dos tres cuatro cinco", 10);
        assert_eq!(pieces, vec!["uno dos".to_string(), "tres".to_string(), "cuatro".to_string(), "cinco".to_string()]);
        for piece in &pieces {
            assert!(piece.chars().count() <= 10);
        }
    }

    #[test]
    fn test_split_keeps_all_words() {
        let text = "a bb ccc dddd eeeee ffffff";
        let pieces = split_for_translation(text, 8);
        let rejoined = pieces.join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_split_oversized_word_is_own_piece() {
        let pieces = split_for_translation("short uebergrosseswort end", 10);
        assert!(pieces.contains(&"uebergrosseswort".to_string()));
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_for_translation("", 10).is_empty());
        assert!(split_for_translation("   ", 10).is_empty());
    }

    #[tokio::test]
    async fn test_failed_pieces_degrade_to_original_text() {
        // Point the client at a dead endpoint so every piece fails; the
        // output must still carry every piece, untranslated
        let settings = LlmSettings {
            api_base: "http://127.0.0.1:1/v1".to_string(),
            ..LlmSettings::default()
        };
        let translation = TranslationSettings {
            max_chunk_chars: 12,
            throttle_ms: 0,
            ..TranslationSettings::default()
        };
        let translator = Translator::new(
            llm::chat_client(&settings),
            &translation,
            Prompts::default(),
        );

        let text = "el cielo es azul y la hierba es verde";
        let result = translator.translate(text, "es").await.unwrap();
        assert_eq!(result, text);
    }
}
