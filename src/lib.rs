//! Svar - YouTube Transcript Q&A
//!
//! Ask questions about YouTube videos, answered strictly from their
//! transcripts.
//!
//! The name "Svar" comes from the Norwegian word for "answer."
//!
//! # Overview
//!
//! Svar allows you to:
//! - Index a YouTube video's transcript into a local vector store
//! - Translate non-English transcripts to English before indexing
//! - Ask questions and get answers grounded only in the video's transcript
//! - Serve the whole pipeline as a small HTTP API
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `transcript` - Caption track acquisition
//! - `translate` - Transcript translation
//! - `chunking` - Overlapping text chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Partitioned vector database abstraction
//! - `rag` - Retrieval and grounded answer generation
//! - `pipeline` - Per-video processing state machine
//!
//! # Example
//!
//! ```rust,no_run
//! use svar::config::Settings;
//! use svar::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     // Index a YouTube video's transcript
//!     let result = pipeline.process_video("dQw4w9WgXcQ").await?;
//!     println!("Indexed {} chunks", result.chunks_indexed);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod rag;
pub mod transcript;
pub mod translate;
pub mod vector_store;

pub use error::{Result, SvarError};
