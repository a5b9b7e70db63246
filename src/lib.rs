//! Voice Agent - speak to a local Ollama model
//!
//! This library provides the pieces of a voice-driven LLM client:
//! - Voice input (microphone capture, phrase detection, STT)
//! - Ollama chat client with an availability probe
//! - The command loop tying them together
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Listener   │──▶│  LlmClient   │──▶│   Console    │
//! │ mic → STT    │   │ POST /chat   │   │ reply block  │
//! └──────────────┘   └──────────────┘   └──────────────┘
//!         ▲                                     │
//!         └──────────── CommandLoop ────────────┘
//! ```

pub mod agent;
pub mod config;
pub mod console;
pub mod error;
pub mod llm;
pub mod utterance;
pub mod voice;

pub use agent::{CommandLoop, EndReason, LoopPolicy, LoopState, RunSummary};
pub use config::{Config, Overrides};
pub use console::Console;
pub use error::{Error, ErrorKind, Result};
pub use llm::{ChatReply, ChatRequest, LlmClient};
pub use utterance::Utterance;
