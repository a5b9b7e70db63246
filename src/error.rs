//! Error types for the voice agent

use thiserror::Error;

/// Result type alias for voice agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while acquiring speech or talking to Ollama
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone or audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// No speech started before the capture wait timeout
    #[error("no speech detected within {secs}s")]
    NoSpeech {
        /// Wait timeout that elapsed, in seconds
        secs: f32,
    },

    /// Speech was captured but could not be recognized
    #[error("speech could not be recognized")]
    Unrecognized,

    /// Speech-recognition service failure
    #[error("recognition service error: {0}")]
    Recognition(String),

    /// Service unreachable
    #[error("cannot connect to {url}: {reason}")]
    Connectivity {
        /// Address that was tried
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// Non-success HTTP status from the chat endpoint
    #[error("unexpected status {status}")]
    Protocol {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),

    /// A network stage exceeded its deadline
    #[error("{stage} timed out after {secs}s")]
    Timeout {
        /// Stage that timed out (e.g. "chat")
        stage: &'static str,
        /// Deadline in seconds
        secs: u64,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Coarse classification used by the command loop to pick a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No speech, unintelligible speech, recognition or device failure
    Acquisition,
    /// Inference service unreachable
    Connectivity,
    /// Non-success status or undecodable payload
    Protocol,
    /// Capture or network deadline elapsed
    Timeout,
    /// Startup problems (configuration, local IO)
    Startup,
}

impl Error {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Audio(_) | Self::Unrecognized | Self::Recognition(_) => {
                ErrorKind::Acquisition
            }
            Self::NoSpeech { .. } | Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Connectivity { .. } => ErrorKind::Connectivity,
            Self::Protocol { .. } | Self::Decode(_) => ErrorKind::Protocol,
            Self::Config(_) | Self::Io(_) | Self::Toml(_) => ErrorKind::Startup,
        }
    }

    /// Map a transport failure from `reqwest` into the closed set
    pub(crate) fn from_transport(
        err: &reqwest::Error,
        url: &str,
        stage: &'static str,
        secs: u64,
    ) -> Self {
        if err.is_timeout() {
            Self::Timeout { stage, secs }
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Connectivity {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}
