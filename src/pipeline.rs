//! Processing pipeline for Svar.
//!
//! Drives a video from caption track to queryable index: acquire the
//! transcript, translate it to English when needed, chunk, embed, and
//! persist the chunks under the video's partition. Processing is
//! idempotent: an already-processed video short-circuits before any
//! external call, and a failed run leaves nothing behind.

use crate::chunking::TextSplitter;
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::llm;
use crate::transcript::{TranscriptOutcome, TranscriptSource, YoutubeTranscriptSource};
use crate::translate::Translator;
use crate::vector_store::{Document, ProcessedVideo, SqliteVectorStore, VectorStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// Outcome of a process-video call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The video was fetched, indexed, and is now queryable.
    Processed,
    /// The video already had a completion record; nothing was done.
    AlreadyProcessed,
    /// Processing could not complete; the video remains unprocessed.
    Failed,
}

/// Result of processing a video. Computed per call, never persisted.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// Video ID.
    pub video_id: String,
    /// Outcome status.
    pub status: ProcessStatus,
    /// Human-readable detail (failure reason, language, chunk count).
    pub detail: String,
    /// Number of chunks indexed by this call.
    pub chunks_indexed: usize,
}

/// The main processing pipeline.
pub struct Pipeline {
    settings: Settings,
    source: Arc<dyn TranscriptSource>,
    translator: Translator,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    splitter: TextSplitter,
    /// Per-video locks serializing concurrent process calls for one id.
    video_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Pipeline {
    /// Create a pipeline with the default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let source = Arc::new(YoutubeTranscriptSource::new());
        let translator = Translator::new(
            llm::chat_client(&settings.llm),
            &settings.translation,
            prompts.clone(),
        );
        let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding));
        let vector_store = Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);

        Self::with_components(settings, source, translator, embedder, vector_store)
    }

    /// Create a pipeline from injected components (used by tests and by
    /// callers supplying their own clients).
    pub fn with_components(
        settings: Settings,
        source: Arc<dyn TranscriptSource>,
        translator: Translator,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        settings.validate()?;
        let splitter = TextSplitter::new(
            settings.chunking.chunk_size,
            settings.chunking.chunk_overlap,
        )?;

        Ok(Self {
            settings,
            source,
            translator,
            embedder,
            vector_store,
            splitter,
            video_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Get the vector store handle.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Get the embedder handle.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Get the transcript source handle.
    pub fn transcript_source(&self) -> Arc<dyn TranscriptSource> {
        self.source.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn video_lock(&self, video_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .video_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(video_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Process a video: acquire transcript, translate if needed, chunk,
    /// embed, and index.
    #[instrument(skip(self), fields(video_id = %video_id))]
    pub async fn process_video(&self, video_id: &str) -> Result<ProcessingResult> {
        // Serialize concurrent calls for the same video so only one of
        // them pays for embedding and translation.
        let lock = self.video_lock(video_id);
        let _guard = lock.lock().await;

        if self.vector_store.is_video_processed(video_id).await? {
            info!("Video {} is already processed, skipping", video_id);
            return Ok(ProcessingResult {
                video_id: video_id.to_string(),
                status: ProcessStatus::AlreadyProcessed,
                detail: format!("Video {} already processed", video_id),
                chunks_indexed: 0,
            });
        }

        let transcript = match self.source.acquire(video_id).await? {
            TranscriptOutcome::Found(transcript) => transcript,
            TranscriptOutcome::NotAvailable(reason) => {
                warn!("No transcript for {}: {}", video_id, reason);
                return Ok(ProcessingResult {
                    video_id: video_id.to_string(),
                    status: ProcessStatus::Failed,
                    detail: reason,
                    chunks_indexed: 0,
                });
            }
        };

        let language_code = transcript.language_code.clone();
        let needs_translation = !transcript.is_english();
        info!(
            "Acquired transcript for {} in '{}' ({} snippets)",
            video_id,
            language_code,
            transcript.snippets.len()
        );

        let text = transcript.full_text();
        if text.is_empty() {
            return Ok(ProcessingResult {
                video_id: video_id.to_string(),
                status: ProcessStatus::Failed,
                detail: "Transcript contains no text".to_string(),
                chunks_indexed: 0,
            });
        }

        let text = if needs_translation {
            info!("Translating transcript from '{}'", language_code);
            self.translator.translate(&text, &language_code).await?
        } else {
            text
        };

        let chunks = self.splitter.split(&text);
        info!("Split transcript into {} chunks", chunks.len());

        // Embedding failures abort indexing; nothing has been written yet,
        // so the video stays observably unprocessed.
        let embeddings = match self.embedder.embed_batch(&chunks).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("Embedding failed for {}: {}", video_id, e);
                return Ok(ProcessingResult {
                    video_id: video_id.to_string(),
                    status: ProcessStatus::Failed,
                    detail: format!("Embedding failed: {}", e),
                    chunks_indexed: 0,
                });
            }
        };

        if embeddings.len() != chunks.len() {
            return Ok(ProcessingResult {
                video_id: video_id.to_string(),
                status: ProcessStatus::Failed,
                detail: format!(
                    "Embedding count mismatch: {} chunks, {} embeddings",
                    chunks.len(),
                    embeddings.len()
                ),
                chunks_indexed: 0,
            });
        }

        let documents: Vec<Document> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(order, (content, embedding))| {
                Document::new(video_id.to_string(), content, order as i32, embedding)
            })
            .collect();

        let record = ProcessedVideo {
            video_id: video_id.to_string(),
            language_code: language_code.clone(),
            translated: needs_translation,
            chunk_count: documents.len() as u32,
            processed_at: Utc::now(),
        };

        let indexed = match self.vector_store.index_video(&record, &documents).await {
            Ok(indexed) => indexed,
            Err(e) => {
                warn!("Indexing failed for {}: {}", video_id, e);
                return Ok(ProcessingResult {
                    video_id: video_id.to_string(),
                    status: ProcessStatus::Failed,
                    detail: format!("Indexing failed: {}", e),
                    chunks_indexed: 0,
                });
            }
        };

        info!("Indexed {} chunks for video {}", indexed, video_id);

        Ok(ProcessingResult {
            video_id: video_id.to_string(),
            status: ProcessStatus::Processed,
            detail: format!(
                "Video {} processed successfully ({} chunks, language '{}')",
                video_id, indexed, language_code
            ),
            chunks_indexed: indexed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmSettings, TranslationSettings};
    use crate::error::SvarError;
    use crate::transcript::{LanguageInfo, Transcript, TranscriptSnippet};
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        outcome: TranscriptOutcome,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn found(language_code: &str, sentences: &[&str]) -> Self {
            let snippets = sentences
                .iter()
                .enumerate()
                .map(|(i, text)| TranscriptSnippet {
                    text: text.to_string(),
                    start_seconds: i as f64 * 2.0,
                    duration_seconds: 2.0,
                })
                .collect();

            Self {
                outcome: TranscriptOutcome::Found(Transcript {
                    video_id: "abc123def45".to_string(),
                    language_code: language_code.to_string(),
                    is_generated: true,
                    is_translatable: true,
                    snippets,
                }),
                calls: AtomicUsize::new(0),
            }
        }

        fn unavailable(reason: &str) -> Self {
            Self {
                outcome: TranscriptOutcome::NotAvailable(reason.to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeSource {
        async fn acquire(&self, _video_id: &str) -> crate::error::Result<TranscriptOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.outcome.clone())
        }

        async fn list_languages(
            &self,
            _video_id: &str,
        ) -> crate::error::Result<Option<Vec<LanguageInfo>>> {
            Ok(None)
        }
    }

    struct CountingEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> crate::error::Result<Vec<f32>> {
            let batch = self.embed_batch(&[text.to_string()]).await?;
            Ok(batch.into_iter().next().unwrap())
        }

        async fn embed_batch(&self, texts: &[String]) -> crate::error::Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(texts.len(), Ordering::SeqCst);
            if self.fail {
                return Err(SvarError::Embedding("simulated outage".to_string()));
            }
            // Deterministic per-text vectors keep searches meaningful
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn pipeline_with(
        source: Arc<FakeSource>,
        embedder: Arc<CountingEmbedder>,
        store: Arc<MemoryVectorStore>,
    ) -> Pipeline {
        let settings = Settings::default();
        let translator = Translator::new(
            llm::chat_client(&LlmSettings::default()),
            &TranslationSettings::default(),
            Prompts::default(),
        );

        Pipeline::with_components(settings, source, translator, embedder, store).unwrap()
    }

    #[tokio::test]
    async fn test_process_video_success() {
        let source = Arc::new(FakeSource::found("en", &["The sky is blue.", "Grass is green."]));
        let embedder = Arc::new(CountingEmbedder::new());
        let store = Arc::new(MemoryVectorStore::new());

        let pipeline = pipeline_with(source, embedder, store.clone());
        let result = pipeline.process_video("abc123def45").await.unwrap();

        assert_eq!(result.status, ProcessStatus::Processed);
        assert!(result.chunks_indexed > 0);
        assert!(store.is_video_processed("abc123def45").await.unwrap());
    }

    #[tokio::test]
    async fn test_process_video_is_idempotent() {
        let source = Arc::new(FakeSource::found("en", &["The sky is blue."]));
        let embedder = Arc::new(CountingEmbedder::new());
        let store = Arc::new(MemoryVectorStore::new());

        let pipeline = pipeline_with(source.clone(), embedder.clone(), store.clone());

        let first = pipeline.process_video("abc123def45").await.unwrap();
        assert_eq!(first.status, ProcessStatus::Processed);
        let chunks_after_first = store.document_count("abc123def45").await.unwrap();
        let embed_calls_after_first = embedder.calls.load(Ordering::SeqCst);

        let second = pipeline.process_video("abc123def45").await.unwrap();
        assert_eq!(second.status, ProcessStatus::AlreadyProcessed);
        assert_eq!(second.chunks_indexed, 0);

        // Second call performed no acquisition or embedding work and added
        // no chunks
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), embed_calls_after_first);
        assert_eq!(
            store.document_count("abc123def45").await.unwrap(),
            chunks_after_first
        );
    }

    #[tokio::test]
    async fn test_unavailable_transcript_fails_without_side_effects() {
        let source = Arc::new(FakeSource::unavailable("Captions are disabled"));
        let embedder = Arc::new(CountingEmbedder::new());
        let store = Arc::new(MemoryVectorStore::new());

        let pipeline = pipeline_with(source, embedder.clone(), store.clone());
        let result = pipeline.process_video("abc123def45").await.unwrap();

        assert_eq!(result.status, ProcessStatus::Failed);
        assert!(result.detail.contains("disabled"));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert!(!store.is_video_processed("abc123def45").await.unwrap());
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_video_unprocessed() {
        let source = Arc::new(FakeSource::found("en", &["The sky is blue."]));
        let embedder = Arc::new(CountingEmbedder::failing());
        let store = Arc::new(MemoryVectorStore::new());

        let pipeline = pipeline_with(source, embedder, store.clone());
        let result = pipeline.process_video("abc123def45").await.unwrap();

        assert_eq!(result.status, ProcessStatus::Failed);
        assert!(!store.is_video_processed("abc123def45").await.unwrap());
        assert_eq!(store.document_count("abc123def45").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_processing_same_video_indexes_once() {
        let source = Arc::new(FakeSource::found("en", &["The sky is blue."]));
        let embedder = Arc::new(CountingEmbedder::new());
        let store = Arc::new(MemoryVectorStore::new());

        let pipeline = Arc::new(pipeline_with(source, embedder, store.clone()));

        let a = {
            let p = pipeline.clone();
            tokio::spawn(async move { p.process_video("abc123def45").await.unwrap() })
        };
        let b = {
            let p = pipeline.clone();
            tokio::spawn(async move { p.process_video("abc123def45").await.unwrap() })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let statuses = [a.status, b.status];
        assert!(statuses.contains(&ProcessStatus::Processed));
        assert!(statuses.contains(&ProcessStatus::AlreadyProcessed));

        let chunk_count = store.document_count("abc123def45").await.unwrap();
        let record = store.get_processed("abc123def45").await.unwrap().unwrap();
        assert_eq!(record.chunk_count as usize, chunk_count);
    }

    #[tokio::test]
    async fn test_empty_transcript_fails() {
        let source = Arc::new(FakeSource::found("en", &["   "]));
        let embedder = Arc::new(CountingEmbedder::new());
        let store = Arc::new(MemoryVectorStore::new());

        let pipeline = pipeline_with(source, embedder, store.clone());
        let result = pipeline.process_video("abc123def45").await.unwrap();

        assert_eq!(result.status, ProcessStatus::Failed);
        assert!(!store.is_video_processed("abc123def45").await.unwrap());
    }
}
