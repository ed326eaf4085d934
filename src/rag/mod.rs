//! RAG (Retrieval-Augmented Generation) for per-video question answering.
//!
//! Retrieves the chunks most similar to a question from one video's
//! partition and has a chat model compose an answer strictly from them.

pub mod context;
mod response;

pub use context::{ContextBuilder, ContextCompressor};
pub use response::{RagAnswer, RagEngine};

use crate::vector_store::SearchResult;

/// A retrieved passage ready for prompting.
#[derive(Debug, Clone)]
pub struct ContextPassage {
    /// Video ID the passage belongs to.
    pub video_id: String,
    /// Text content.
    pub content: String,
    /// Order of the originating chunk in the transcript.
    pub chunk_order: i32,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for ContextPassage {
    fn from(result: SearchResult) -> Self {
        Self {
            video_id: result.document.video_id,
            content: result.document.content,
            chunk_order: result.document.chunk_order,
            score: result.score,
        }
    }
}
