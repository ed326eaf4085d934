//! Vector store abstraction for Svar.
//!
//! Chunks are stored per video: every document belongs to exactly one
//! `video_id` partition, searches never cross partitions, and a video
//! counts as processed only once its completion record exists. The
//! completion record is written in the same transaction as the chunks, so
//! a partially-indexed video is never observable as processed.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An embedded chunk stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID.
    pub id: Uuid,
    /// Video ID this document belongs to.
    pub video_id: String,
    /// Text content of this chunk.
    pub content: String,
    /// Order of this chunk in the transcript.
    pub chunk_order: i32,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this document was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document.
    pub fn new(video_id: String, content: String, chunk_order: i32, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_id,
            content,
            chunk_order,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Completion record for one processed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedVideo {
    /// Video ID.
    pub video_id: String,
    /// Language code of the transcript the index was built from.
    pub language_code: String,
    /// Whether the transcript was translated to English before indexing.
    pub translated: bool,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// When processing completed.
    pub processed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Atomically persist a video's chunks together with its completion
    /// record. Either everything lands or nothing does.
    async fn index_video(&self, record: &ProcessedVideo, docs: &[Document]) -> Result<usize>;

    /// Check whether a video has a completion record.
    async fn is_video_processed(&self, video_id: &str) -> Result<bool>;

    /// Get a video's completion record, if any.
    async fn get_processed(&self, video_id: &str) -> Result<Option<ProcessedVideo>>;

    /// Search for similar documents within one video's partition.
    async fn search_video(
        &self,
        video_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>>;

    /// List all processed videos, most recent first.
    async fn list_processed(&self) -> Result<Vec<ProcessedVideo>>;

    /// Count the documents stored for a video.
    async fn document_count(&self, video_id: &str) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
