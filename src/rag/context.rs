//! Context building for RAG responses.
//!
//! Retrieval is strictly scoped to one video's partition and fails fast
//! when the video has not been processed, before any embedding call is
//! made.

use super::ContextPassage;
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{Result, SvarError};
use crate::vector_store::VectorStore;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Marker reply the compression prompt uses for irrelevant chunks.
const NO_RELEVANT_CONTENT: &str = "NO_RELEVANT_CONTENT";

/// Builds context for a question from one video's partition.
pub struct ContextBuilder {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    min_score: f32,
}

impl ContextBuilder {
    /// Create a new context builder.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            top_k: 5,
            min_score: 0.0,
        }
    }

    /// Set the number of chunks to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the minimum similarity score threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Retrieve the passages most relevant to a question.
    ///
    /// Returns `VideoNotProcessed` before embedding the question when the
    /// video has no completion record.
    pub async fn build(&self, video_id: &str, question: &str) -> Result<Vec<ContextPassage>> {
        if !self.vector_store.is_video_processed(video_id).await? {
            return Err(SvarError::VideoNotProcessed(video_id.to_string()));
        }

        let query_embedding = self.embedder.embed(question).await?;

        let results = self
            .vector_store
            .search_video(video_id, &query_embedding, self.top_k)
            .await?;

        let passages: Vec<ContextPassage> = results
            .into_iter()
            .filter(|r| r.score >= self.min_score)
            .map(ContextPassage::from)
            .collect();

        debug!("Built context with {} passages for {}", passages.len(), video_id);
        Ok(passages)
    }
}

/// Compresses retrieved passages down to question-relevant spans with one
/// model call per passage.
///
/// A quality/cost trade-off, not required for correctness: a failed call
/// keeps the passage verbatim, and a passage the model marks irrelevant is
/// dropped.
pub struct ContextCompressor {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl ContextCompressor {
    pub fn new(
        client: async_openai::Client<async_openai::config::OpenAIConfig>,
        model: &str,
        prompts: Prompts,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
            prompts,
        }
    }

    /// Compress passages concurrently, preserving their order.
    pub async fn compress(
        &self,
        question: &str,
        passages: Vec<ContextPassage>,
    ) -> Vec<ContextPassage> {
        let tasks = passages.into_iter().map(|passage| async move {
            match self.compress_passage(question, &passage.content).await {
                Ok(Some(compressed)) => Some(ContextPassage {
                    content: compressed,
                    ..passage
                }),
                Ok(None) => None,
                Err(e) => {
                    warn!("Compression failed, keeping passage verbatim: {}", e);
                    Some(passage)
                }
            }
        });

        join_all(tasks).await.into_iter().flatten().collect()
    }

    /// Returns `Ok(None)` when the model reports no relevant content.
    async fn compress_passage(&self, question: &str, chunk: &str) -> Result<Option<String>> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("chunk".to_string(), chunk.to_string());

        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.compression.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.compression.system.clone())
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
            .temperature(0.0)
            .build()
            .map_err(|e| SvarError::Rag(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SvarError::LlmApi(format!("Compression request failed: {}", e)))?;

        let extracted = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        if extracted.is_empty() || extracted.contains(NO_RELEVANT_CONTENT) {
            return Ok(None);
        }

        Ok(Some(extracted))
    }
}

/// Format context passages for inclusion in a prompt.
pub fn format_context_for_prompt(passages: &[ContextPassage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, passage)| format!("---\n[{}]\n{}\n---", i + 1, passage.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::vector_store::{Document, MemoryVectorStore, ProcessedVideo, VectorStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder that counts calls and returns a fixed vector.
    struct CountingEmbedder {
        calls: AtomicUsize,
        vector: Vec<f32>,
    }

    impl CountingEmbedder {
        fn new(vector: Vec<f32>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                vector,
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, _text: &str) -> crate::error::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        }

        async fn embed_batch(&self, texts: &[String]) -> crate::error::Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }

        fn dimensions(&self) -> usize {
            self.vector.len()
        }
    }

    fn processed(video_id: &str) -> ProcessedVideo {
        ProcessedVideo {
            video_id: video_id.to_string(),
            language_code: "en".to_string(),
            translated: false,
            chunk_count: 1,
            processed_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unprocessed_video_fails_fast_without_embedding() {
        let store = Arc::new(MemoryVectorStore::new());
        let embedder = Arc::new(CountingEmbedder::new(vec![1.0, 0.0]));
        let builder = ContextBuilder::new(store, embedder.clone());

        let err = builder.build("unprocessed1", "anything?").await.unwrap_err();
        assert!(matches!(err, SvarError::VideoNotProcessed(_)));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_build_returns_scoped_passages() {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .index_video(
                &processed("abc123def45"),
                &[
                    Document::new("abc123def45".to_string(), "The sky is blue.".to_string(), 0, vec![1.0, 0.0]),
                    Document::new("abc123def45".to_string(), "Grass is green.".to_string(), 1, vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let embedder = Arc::new(CountingEmbedder::new(vec![1.0, 0.0]));
        let builder = ContextBuilder::new(store, embedder).with_top_k(1);

        let passages = builder.build("abc123def45", "What color is the sky?").await.unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].content, "The sky is blue.");
    }

    #[test]
    fn test_format_context_for_prompt() {
        let passages = vec![
            ContextPassage {
                video_id: "v".to_string(),
                content: "first".to_string(),
                chunk_order: 0,
                score: 0.9,
            },
            ContextPassage {
                video_id: "v".to_string(),
                content: "second".to_string(),
                chunk_order: 1,
                score: 0.8,
            },
        ];

        let formatted = format_context_for_prompt(&passages);
        assert!(formatted.contains("[1]\nfirst"));
        assert!(formatted.contains("[2]\nsecond"));
    }
}
