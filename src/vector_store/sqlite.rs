//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For production use cases with large datasets, consider using sqlite-vec
//! extension or a dedicated vector database.

use super::{cosine_similarity, Document, ProcessedVideo, SearchResult, VectorStore};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        video_id TEXT NOT NULL,
        content TEXT NOT NULL,
        chunk_order INTEGER NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_documents_video_id ON documents(video_id);

    CREATE TABLE IF NOT EXISTS processed_videos (
        video_id TEXT PRIMARY KEY,
        language_code TEXT NOT NULL,
        translated INTEGER NOT NULL,
        chunk_count INTEGER NOT NULL,
        processed_at TEXT NOT NULL
    );
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SvarError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProcessedVideo> {
        Ok(ProcessedVideo {
            video_id: row.get(0)?,
            language_code: row.get(1)?,
            translated: row.get::<_, i64>(2)? != 0,
            chunk_count: row.get::<_, i64>(3)? as u32,
            processed_at: Self::parse_timestamp(&row.get::<_, String>(4)?),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, record, docs), fields(video_id = %record.video_id))]
    async fn index_video(&self, record: &ProcessedVideo, docs: &[Document]) -> Result<usize> {
        let conn = self.lock_conn()?;
        let tx = conn.unchecked_transaction()?;

        for doc in docs {
            let embedding_bytes = Self::embedding_to_bytes(&doc.embedding);

            tx.execute(
                r#"
                INSERT INTO documents (id, video_id, content, chunk_order, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    doc.id.to_string(),
                    doc.video_id,
                    doc.content,
                    doc.chunk_order,
                    embedding_bytes,
                    doc.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        // Completion record lands in the same transaction as the chunks
        tx.execute(
            r#"
            INSERT INTO processed_videos (video_id, language_code, translated, chunk_count, processed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.video_id,
                record.language_code,
                record.translated as i64,
                record.chunk_count as i64,
                record.processed_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        info!("Indexed {} documents for video {}", docs.len(), record.video_id);

        Ok(docs.len())
    }

    async fn is_video_processed(&self, video_id: &str) -> Result<bool> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM processed_videos WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn get_processed(&self, video_id: &str) -> Result<Option<ProcessedVideo>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT video_id, language_code, translated, chunk_count, processed_at
            FROM processed_videos WHERE video_id = ?1
            "#,
        )?;

        let mut rows = stmt.query_map(params![video_id], Self::row_to_record)?;
        match rows.next() {
            Some(record) => Ok(Some(record?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_video(
        &self,
        video_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, video_id, content, chunk_order, embedding, indexed_at
            FROM documents WHERE video_id = ?1
            "#,
        )?;

        let documents = stmt.query_map(params![video_id], |row| {
            let id: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let indexed_at: String = row.get(5)?;

            Ok(Document {
                id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
                video_id: row.get(1)?,
                content: row.get(2)?,
                chunk_order: row.get(3)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
                indexed_at: Self::parse_timestamp(&indexed_at),
            })
        })?;

        let mut results: Vec<SearchResult> = Vec::new();
        for document in documents {
            let document = document?;
            let score = cosine_similarity(query_embedding, &document.embedding);
            results.push(SearchResult { document, score });
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        debug!("Found {} results in partition {}", results.len(), video_id);
        Ok(results)
    }

    async fn list_processed(&self) -> Result<Vec<ProcessedVideo>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT video_id, language_code, translated, chunk_count, processed_at
            FROM processed_videos ORDER BY processed_at DESC
            "#,
        )?;

        let rows = stmt.query_map([], Self::row_to_record)?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    async fn document_count(&self, video_id: &str) -> Result<usize> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
