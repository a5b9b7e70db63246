//! TOML configuration file loading
//!
//! Supports `~/.config/voice-agent/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AgentConfigFile {
    /// Ollama configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech recognition configuration
    #[serde(default)]
    pub stt: SttFileConfig,
}

/// Ollama chat settings
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// API base address (e.g. `http://localhost:11434/api`)
    pub base_url: Option<String>,

    /// Model name (e.g. "llama3.2")
    pub model: Option<String>,
}

/// Speech recognition settings
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// "whisper" or "deepgram"
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// BCP 47 language tag (e.g. "ru-RU")
    pub language: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `AgentConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AgentConfigFile {
    config_file_path().map_or_else(AgentConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from an explicit path
pub fn load_config_file_from(path: &Path) -> AgentConfigFile {
    if !path.exists() {
        return AgentConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AgentConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AgentConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voice-agent/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-agent").join("config.toml"))
}
