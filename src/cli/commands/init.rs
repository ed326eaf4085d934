//! Init command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::llm;
use anyhow::Result;

/// Run the init command: write the default config and check the environment.
pub fn run_init(settings: &Settings) -> Result<()> {
    let config_path = Settings::default_config_path();

    if config_path.exists() {
        Output::info(&format!("Configuration already exists at {:?}", config_path));
    } else {
        settings.save()?;
        Output::success(&format!("Wrote default configuration to {:?}", config_path));
    }

    std::fs::create_dir_all(settings.data_dir())?;
    Output::kv("Data directory", &settings.data_dir().display().to_string());
    Output::kv("Vector store", &settings.sqlite_path().display().to_string());

    if llm::is_api_key_configured() {
        Output::success("Chat API key found in environment");
    } else {
        Output::warning("No GROQ_API_KEY or OPENAI_API_KEY set; processing and chat will fail");
    }

    if std::env::var("OPENAI_API_KEY").is_err() {
        Output::warning("No OPENAI_API_KEY set; embedding calls will fail");
    }

    Ok(())
}
