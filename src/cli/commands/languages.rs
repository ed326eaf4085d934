//! Languages command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::{is_english, TranscriptSource, YoutubeTranscriptSource};
use anyhow::Result;

/// Run the languages command.
pub async fn run_languages(video: &str, _settings: Settings) -> Result<()> {
    let source = YoutubeTranscriptSource::new();

    let spinner = Output::spinner("Listing caption tracks...");
    let languages = source.list_languages(video).await;
    spinner.finish_and_clear();

    match languages? {
        Some(languages) => {
            let has_english = languages.iter().any(|l| is_english(&l.language_code));

            Output::header("Available caption tracks");
            for language in &languages {
                let name = language.language_name.as_deref().unwrap_or("-");
                Output::list_item(&format!(
                    "{} ({}){}",
                    language.language_code,
                    name,
                    if language.is_generated { " [auto-generated]" } else { "" }
                ));
            }
            println!();
            Output::kv("Has English", if has_english { "yes" } else { "no" });
            Output::kv("Needs translation", if has_english { "no" } else { "yes" });
        }
        None => {
            Output::warning("No caption tracks are available for this video");
        }
    }

    Ok(())
}
