//! Status command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::{SqliteVectorStore, VectorStore};
use anyhow::Result;

/// Run the status command.
pub async fn run_status(video: &str, settings: Settings) -> Result<()> {
    let store = SqliteVectorStore::new(&settings.sqlite_path())?;

    match store.get_processed(video).await? {
        Some(record) => {
            Output::success(&format!("Video {} is processed", record.video_id));
            Output::kv("Language", &record.language_code);
            Output::kv("Translated", if record.translated { "yes" } else { "no" });
            Output::kv("Chunks", &record.chunk_count.to_string());
            Output::kv("Processed at", &record.processed_at.to_rfc3339());
        }
        None => {
            Output::info(&format!("Video {} has not been processed", video));
        }
    }

    Ok(())
}
