//! Grounded answer generation.

use super::context::format_context_for_prompt;
use super::{ContextBuilder, ContextCompressor, ContextPassage};
use crate::config::{Prompts, Settings};
use crate::embedding::Embedder;
use crate::error::{Result, SvarError};
use crate::llm;
use crate::vector_store::VectorStore;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// RAG engine for answering questions about one processed video.
pub struct RagEngine {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    context_builder: ContextBuilder,
    compressor: Option<ContextCompressor>,
    prompts: Prompts,
}

impl RagEngine {
    /// Create a RAG engine from settings and shared components.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        settings: &Settings,
        prompts: Prompts,
    ) -> Self {
        let client = llm::chat_client(&settings.llm);

        let context_builder = ContextBuilder::new(vector_store, embedder)
            .with_top_k(settings.retrieval.top_k)
            .with_min_score(settings.retrieval.min_score);

        let compressor = settings.retrieval.compression.then(|| {
            ContextCompressor::new(client.clone(), &settings.llm.model, prompts.clone())
        });

        Self {
            client,
            model: settings.llm.model.clone(),
            temperature: settings.llm.temperature,
            context_builder,
            compressor,
            prompts,
        }
    }

    /// Answer a question about a video from its indexed transcript.
    ///
    /// Fails with `VideoNotProcessed` when the video has no index and with
    /// `InvalidApiKey` on credential failures; both must stay
    /// distinguishable from generic faults for the caller.
    #[instrument(skip(self, question), fields(video_id = %video_id))]
    pub async fn ask(&self, video_id: &str, question: &str) -> Result<RagAnswer> {
        info!("Answering question about {}", video_id);

        let passages = self.context_builder.build(video_id, question).await?;

        let passages = match &self.compressor {
            Some(compressor) => compressor.compress(question, passages).await,
            None => passages,
        };

        if passages.is_empty() {
            return Ok(RagAnswer {
                answer: "The transcript of this video does not contain information relevant to that question.".to_string(),
                sources: Vec::new(),
            });
        }

        let context_text = format_context_for_prompt(&passages);

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context_text);

        let user_prompt = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.rag.system.clone())
                .build()
                .map_err(|e| SvarError::Rag(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| SvarError::Rag(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| SvarError::Rag(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            if llm::is_auth_error(&e) {
                SvarError::InvalidApiKey
            } else {
                SvarError::LlmApi(format!("Failed to generate answer: {}", e))
            }
        })?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| SvarError::Rag("Empty response from model".to_string()))?
            .clone();

        debug!("Generated answer from {} passages", passages.len());

        Ok(RagAnswer {
            answer,
            sources: passages,
        })
    }
}

/// An answer with the passages it was grounded on.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    /// The generated answer.
    pub answer: String,
    /// Passages used as grounding context.
    pub sources: Vec<ContextPassage>,
}
