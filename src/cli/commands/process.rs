//! Process command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{Pipeline, ProcessStatus};
use anyhow::Result;

/// Run the process command.
pub async fn run_process(video: &str, settings: Settings) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner("Processing video transcript...");
    let result = pipeline.process_video(video).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            match result.status {
                ProcessStatus::Processed => {
                    Output::success(&result.detail);
                    Output::kv("Chunks indexed", &result.chunks_indexed.to_string());
                }
                ProcessStatus::AlreadyProcessed => {
                    Output::info(&result.detail);
                }
                ProcessStatus::Failed => {
                    Output::error(&format!("Processing failed: {}", result.detail));
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Processing failed: {}", e));
            Err(e.into())
        }
    }
}
