//! Ask command implementation.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::error::SvarError;
use crate::pipeline::Pipeline;
use crate::rag::RagEngine;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    video: &str,
    question: &str,
    top_k: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(top_k) = top_k {
        settings.retrieval.top_k = top_k;
    }

    let pipeline = Pipeline::new(settings.clone())?;
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let engine = RagEngine::new(
        pipeline.vector_store(),
        pipeline.embedder(),
        &settings,
        prompts,
    );

    let spinner = Output::spinner("Searching transcript...");
    let result = engine.ask(video, question).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            println!("\n{}\n", answer.answer);

            if !answer.sources.is_empty() {
                Output::header("Sources");
                for source in &answer.sources {
                    Output::source(source.chunk_order, source.score, &source.content);
                }
            }
            Ok(())
        }
        Err(SvarError::VideoNotProcessed(video_id)) => {
            Output::error(&format!(
                "Video {} has not been processed yet. Run 'svar process {}' first.",
                video_id, video_id
            ));
            std::process::exit(1);
        }
        Err(e @ SvarError::InvalidApiKey) => {
            Output::error(&e.to_string());
            std::process::exit(1);
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            Err(e.into())
        }
    }
}
