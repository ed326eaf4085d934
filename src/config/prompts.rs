//! Prompt templates for Svar.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub translation: TranslationPrompts,
    pub rag: RagPrompts,
    pub compression: CompressionPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// Prompts for transcript translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationPrompts {
    pub system: String,
    pub user: String,
}

impl Default for TranslationPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a professional translator. Translate the text you are given into English.

Rules:
- Produce a literal, faithful translation of the entire text
- Preserve the original meaning; do not summarize, expand, or omit anything
- Output only the translated text with no commentary, headers, or notes"#
                .to_string(),

            user: r#"Translate the following text from {{source_language}} to English:

{{text}}"#
                .to_string(),
        }
    }
}

/// Prompts for grounded answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant that answers questions about a YouTube video using only its transcript.

Guidelines:
- Answer strictly from the transcript excerpts provided in the context
- Never use outside knowledge, even when you are confident you know the answer
- If the context does not contain the answer, say explicitly that the information is not available in the video's transcript
- No conversational filler: answer directly, without greetings or sign-offs"#
                .to_string(),

            user: r#"Transcript excerpts:

{{context}}

Question: {{question}}

Answer the question using only the transcript excerpts above."#
                .to_string(),
        }
    }
}

/// Prompts for compressing retrieved chunks down to question-relevant spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionPrompts {
    pub system: String,
    pub user: String,
}

impl Default for CompressionPrompts {
    fn default() -> Self {
        Self {
            system: r#"You extract the parts of a transcript excerpt that are relevant to a question.

Rules:
- Return only sentences copied verbatim from the excerpt
- Do not rephrase, answer the question, or add anything
- If nothing in the excerpt relates to the question, return exactly: NO_RELEVANT_CONTENT"#
                .to_string(),

            user: r#"Question: {{question}}

Excerpt:
{{chunk}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        // Store custom variables
        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            // Load translation prompts if file exists
            let translation_path = custom_path.join("translation.toml");
            if translation_path.exists() {
                let content = std::fs::read_to_string(&translation_path)?;
                prompts.translation = toml::from_str(&content)?;
            }

            // Load RAG prompts if file exists
            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }

            // Load compression prompts if file exists
            let compression_path = custom_path.join("compression.toml");
            if compression_path.exists() {
                let content = std::fs::read_to_string(&compression_path)?;
                prompts.compression = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        // Start with custom variables, then override with provided vars
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.translation.system.is_empty());
        assert!(!prompts.rag.system.is_empty());
        assert!(!prompts.compression.system.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Question: {{question}}\nContext: {{context}}";
        let mut vars = std::collections::HashMap::new();
        vars.insert("question".to_string(), "why".to_string());
        vars.insert("context".to_string(), "because".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Question: why\nContext: because");
    }

    #[test]
    fn test_custom_variables_are_overridden() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("question".to_string(), "stale".to_string());

        let mut vars = std::collections::HashMap::new();
        vars.insert("question".to_string(), "fresh".to_string());

        let result = prompts.render_with_custom("{{question}}", &vars);
        assert_eq!(result, "fresh");
    }
}
