//! Speech-to-text (STT) processing

use std::time::Duration;

use crate::config::{SttConfig, SttProvider};
use crate::{Error, Result};

/// Deadline for a single recognition request
const STT_TIMEOUT: Duration = Duration::from_secs(30);

/// Response from Whisper-compatible transcription APIs
#[derive(serde::Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    provider: SttProvider,
    base_url: String,
    api_key: Option<String>,
    model: String,
    language: String,
}

impl SpeechToText {
    /// Create a new STT client
    ///
    /// # Errors
    ///
    /// Returns error if Deepgram is selected without an API key
    pub fn new(config: &SttConfig) -> Result<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty());

        if config.provider == SttProvider::Deepgram && api_key.is_none() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(STT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            provider: config.provider,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            language: config.language.clone(),
        })
    }

    /// Recognition language tag
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Transcribe audio to text
    ///
    /// # Arguments
    ///
    /// * `audio` - WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns `Error::Unrecognized` for an empty transcript and
    /// `Error::Recognition` if the service fails
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let transcript = match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio).await?,
            SttProvider::Deepgram => self.transcribe_deepgram(audio).await?,
        };

        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(Error::Unrecognized);
        }

        tracing::info!(transcript, "transcription complete");
        Ok(transcript.to_string())
    }

    /// Transcribe using a Whisper-compatible endpoint
    async fn transcribe_whisper(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Recognition(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", primary_subtag(&self.language).to_string());

        let mut request = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .multipart(form);

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "Whisper request failed");
            Error::Recognition(e.to_string())
        })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Recognition(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            Error::Recognition(e.to_string())
        })?;

        Ok(result.text)
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let url = format!(
            "{}/listen?model={}&language={}&punctuate=true",
            self.base_url, self.model, self.language
        );

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec());

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Token {key}"));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "Deepgram request failed");
            Error::Recognition(e.to_string())
        })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Recognition(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Deepgram response");
            Error::Recognition(e.to_string())
        })?;

        Ok(result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default())
    }
}

/// Primary language subtag ("ru-RU" → "ru"), as Whisper expects ISO 639-1
fn primary_subtag(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}
