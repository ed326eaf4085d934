//! Configuration management for Svar.

mod prompts;
mod settings;

pub use prompts::{CompressionPrompts, Prompts, RagPrompts, TranslationPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings,
    RetrievalSettings, Settings, TranslationSettings, VectorStoreSettings,
};
