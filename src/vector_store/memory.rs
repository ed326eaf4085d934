//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, Document, ProcessedVideo, SearchResult, VectorStore};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    /// Documents keyed by video partition.
    documents: HashMap<String, Vec<Document>>,
    /// Completion records keyed by video.
    processed: HashMap<String, ProcessedVideo>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Inner>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn index_video(&self, record: &ProcessedVideo, docs: &[Document]) -> Result<usize> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| SvarError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        // Single write-lock scope keeps chunks and completion record atomic
        inner
            .documents
            .entry(record.video_id.clone())
            .or_default()
            .extend(docs.iter().cloned());
        inner.processed.insert(record.video_id.clone(), record.clone());

        Ok(docs.len())
    }

    async fn is_video_processed(&self, video_id: &str) -> Result<bool> {
        let inner = self
            .inner
            .read()
            .map_err(|e| SvarError::VectorStore(format!("Failed to acquire lock: {}", e)))?;
        Ok(inner.processed.contains_key(video_id))
    }

    async fn get_processed(&self, video_id: &str) -> Result<Option<ProcessedVideo>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| SvarError::VectorStore(format!("Failed to acquire lock: {}", e)))?;
        Ok(inner.processed.get(video_id).cloned())
    }

    async fn search_video(
        &self,
        video_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| SvarError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut results: Vec<SearchResult> = inner
            .documents
            .get(video_id)
            .map(|docs| {
                docs.iter()
                    .map(|doc| SearchResult {
                        score: cosine_similarity(query_embedding, &doc.embedding),
                        document: doc.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn list_processed(&self) -> Result<Vec<ProcessedVideo>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| SvarError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut records: Vec<ProcessedVideo> = inner.processed.values().cloned().collect();
        records.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(records)
    }

    async fn document_count(&self, video_id: &str) -> Result<usize> {
        let inner = self
            .inner
            .read()
            .map_err(|e| SvarError::VectorStore(format!("Failed to acquire lock: {}", e)))?;
        Ok(inner.documents.get(video_id).map(|d| d.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(video_id: &str) -> ProcessedVideo {
        ProcessedVideo {
            video_id: video_id.to_string(),
            language_code: "en".to_string(),
            translated: false,
            chunk_count: 1,
            processed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_partition_isolation() {
        let store = MemoryVectorStore::new();

        let doc_a = Document::new("videoa".to_string(), "alpha".to_string(), 0, vec![1.0, 0.0]);
        let doc_b = Document::new("videob".to_string(), "beta".to_string(), 0, vec![1.0, 0.0]);
        store.index_video(&record("videoa"), &[doc_a]).await.unwrap();
        store.index_video(&record("videob"), &[doc_b]).await.unwrap();

        let results = store.search_video("videob", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.content, "beta");
    }

    #[tokio::test]
    async fn test_search_unknown_partition_is_empty() {
        let store = MemoryVectorStore::new();
        let results = store.search_video("missing", &[1.0], 10).await.unwrap();
        assert!(results.is_empty());
        assert!(!store.is_video_processed("missing").await.unwrap());
    }
}
