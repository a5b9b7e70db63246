//! Ollama chat client
//!
//! One synchronous `POST {base}/chat` per utterance, plus the `/api/tags`
//! availability probe used to fail fast at startup.

use serde::Serialize;

use crate::config::LlmConfig;
use crate::console::Console;
use crate::utterance::Utterance;
use crate::{Error, Result};

/// Shown when the service answers without `message.content`
pub const NO_ANSWER: &str = "Нет ответа";

/// Chat message in the Ollama wire format
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of `POST {base}/chat`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl ChatRequest {
    /// Single-turn, non-streaming request for one utterance
    #[must_use]
    pub fn user(model: &str, utterance: &Utterance) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: utterance.as_str().to_string(),
            }],
            stream: false,
        }
    }
}

/// Parsed model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    /// `message.content` was present
    Text(String),
    /// Payload lacked `message.content`
    Missing,
}

impl ChatReply {
    /// Extract the reply from a chat response body
    #[must_use]
    pub fn from_body(body: &serde_json::Value) -> Self {
        body.get("message")
            .and_then(|m| m.get("content"))
            .and_then(serde_json::Value::as_str)
            .map_or(Self::Missing, |text| Self::Text(text.to_string()))
    }

    /// Reply text, or the placeholder when missing
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Missing => NO_ANSWER,
        }
    }
}

/// Client for a local Ollama instance
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a client without contacting the service
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a client and verify the service is running
    ///
    /// # Errors
    ///
    /// Returns `Error::Connectivity` if the availability probe fails
    pub async fn connect(config: LlmConfig) -> Result<Self> {
        let llm = Self::new(config)?;

        if !llm.is_available().await {
            return Err(Error::Connectivity {
                url: llm.config.base_url.clone(),
                reason: "Ollama is not running (start it with `ollama serve`)".to_string(),
            });
        }

        tracing::info!(
            base_url = %llm.config.base_url,
            model = %llm.config.model,
            "ollama available"
        );
        Ok(llm)
    }

    /// Model used for chat requests
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Configured API base address
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Probe `GET /api/tags`; any failure counts as unavailable
    pub async fn is_available(&self) -> bool {
        let url = self.config.tags_url();

        match self
            .client
            .get(&url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(response) => {
                let available = response.status() == reqwest::StatusCode::OK;
                tracing::debug!(
                    url,
                    status = %response.status(),
                    available,
                    "availability probe"
                );
                available
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "availability probe failed");
                false
            }
        }
    }

    /// Send one utterance and parse the reply
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` for a non-200 status, `Error::Timeout` when
    /// the request deadline elapses, `Error::Connectivity` when the service is
    /// unreachable and `Error::Decode` for a non-JSON body
    pub async fn chat(&self, utterance: &Utterance) -> Result<ChatReply> {
        let url = self.config.chat_url();
        let request = ChatRequest::user(&self.config.model, utterance);
        let secs = self.config.request_timeout.as_secs();

        tracing::debug!(
            url,
            model = %request.model,
            chars = utterance.as_str().len(),
            "chat request"
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::from_transport(&e, &self.config.base_url, "chat", secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::from_transport(&e, &self.config.base_url, "chat", secs))?;

        if status != reqwest::StatusCode::OK {
            tracing::warn!(status = %status, body = %body, "ollama API error");
            return Err(Error::Protocol {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))?;
        let reply = ChatReply::from_body(&value);

        if reply == ChatReply::Missing {
            tracing::warn!("response has no message.content");
        }
        tracing::debug!(response_len = reply.text().len(), "ollama responded");
        Ok(reply)
    }

    /// Send one utterance; failures print a notice and yield `None`
    pub async fn get_reply(
        &self,
        utterance: &Utterance,
        console: &mut Console,
    ) -> Option<ChatReply> {
        console.line(format_args!(
            "🤖 Отправляю запрос в Ollama (модель: {})...",
            self.config.model
        ));

        match self.chat(utterance).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!(error = %e, kind = ?e.kind(), "chat failed");
                console.report(&e);
                None
            }
        }
    }
}
