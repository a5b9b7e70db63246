//! Configuration management for the voice agent
//!
//! Settings are resolved once at startup and passed into constructors.
//! Precedence: explicit override → environment → config file → default.

pub mod file;

use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

use self::file::AgentConfigFile;

/// Default Ollama API base address
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/api";

/// Default Ollama model
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Default recognition language tag
pub const DEFAULT_LANGUAGE: &str = "ru-RU";

/// Deadline for a single chat request
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for the availability probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Voice agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Ollama chat settings
    pub llm: LlmConfig,

    /// Speech recognition settings
    pub stt: SttConfig,

    /// Microphone capture settings
    pub capture: CaptureConfig,
}

/// Explicit values supplied by the caller (e.g. CLI flags)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Ollama API base address
    pub base_url: Option<String>,

    /// Ollama model name
    pub model: Option<String>,
}

/// Ollama chat configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API base address, e.g. `http://localhost:11434/api`
    pub base_url: String,

    /// Model identifier sent with every chat request
    pub model: String,

    /// Deadline for `POST {base}/chat`
    pub request_timeout: Duration,

    /// Deadline for `GET /api/tags`
    pub probe_timeout: Duration,
}

impl LlmConfig {
    /// Create a config with the default timeouts
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            request_timeout: CHAT_TIMEOUT,
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    /// Chat endpoint: `{base}/chat`
    #[must_use]
    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url.trim_end_matches('/'))
    }

    /// Availability endpoint: `{base without "/api"}/api/tags`
    #[must_use]
    pub fn tags_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let root = base.strip_suffix("/api").unwrap_or(base);
        format!("{root}/api/tags")
    }
}

/// Speech recognition backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SttProvider {
    /// `OpenAI`-compatible `/audio/transcriptions` (also whisper.cpp / faster-whisper servers)
    #[default]
    Whisper,
    /// Deepgram pre-recorded `/listen`
    Deepgram,
}

impl SttProvider {
    /// Default API base for this provider
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Whisper => "https://api.openai.com/v1",
            Self::Deepgram => "https://api.deepgram.com/v1",
        }
    }

    /// Default model for this provider
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Whisper => "whisper-1",
            Self::Deepgram => "nova-2",
        }
    }

    /// Provider-specific API key variable
    #[must_use]
    pub const fn key_env(self) -> &'static str {
        match self {
            Self::Whisper => "OPENAI_API_KEY",
            Self::Deepgram => "DEEPGRAM_API_KEY",
        }
    }
}

impl FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Speech recognition configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub provider: SttProvider,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// BCP 47 tag passed to the recognizer (e.g. "ru-RU")
    pub language: String,
}

/// Microphone capture timing
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Ambient noise sampling before capture
    pub calibration: Duration,

    /// Give up if no speech starts within this window
    pub wait_timeout: Duration,

    /// Hard cap on a single phrase
    pub phrase_limit: Duration,

    /// Trailing silence that ends a phrase
    pub pause: Duration,

    /// How often the capture buffer is drained
    pub poll_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            calibration: Duration::from_millis(500),
            wait_timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(10),
            pause: Duration::from_millis(800),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl Config {
    /// Resolve configuration from the process environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid (e.g. unknown STT provider)
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(overrides, fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from explicit sources
    ///
    /// `env` looks up a variable by name; empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid (e.g. unknown STT provider)
    pub fn resolve<F>(overrides: &Overrides, fc: AgentConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let given = |v: &Option<String>| v.clone().filter(|v| !v.trim().is_empty());

        let base_url = given(&overrides.base_url)
            .or_else(|| env("OLLAMA_BASE_URL"))
            .or(fc.llm.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = given(&overrides.model)
            .or_else(|| env("OLLAMA_MODEL"))
            .or(fc.llm.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let provider = env("STT_PROVIDER")
            .or(fc.stt.provider)
            .map(|p| p.parse::<SttProvider>())
            .transpose()?
            .unwrap_or_default();

        let stt = SttConfig {
            provider,
            base_url: env("STT_BASE_URL")
                .or(fc.stt.base_url)
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            api_key: env("STT_API_KEY")
                .or_else(|| env(provider.key_env()))
                .or(fc.stt.api_key),
            model: env("STT_MODEL")
                .or(fc.stt.model)
                .unwrap_or_else(|| provider.default_model().to_string()),
            language: env("STT_LANGUAGE")
                .or(fc.stt.language)
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        };

        tracing::debug!(
            base_url = %base_url,
            model = %model,
            stt_provider = ?stt.provider,
            language = %stt.language,
            "resolved configuration"
        );

        Ok(Self {
            llm: LlmConfig::new(base_url, model),
            stt,
            capture: CaptureConfig::default(),
        })
    }
}
