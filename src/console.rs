//! User-facing console output
//!
//! Everything the user reads goes through here; diagnostics go to tracing.

use std::fmt::Display;
use std::io::Write;

use crate::Error;
use crate::llm::ChatReply;

/// Width of the separator rule
const RULE_WIDTH: usize = 60;

/// Line-oriented writer for results, prompts and notices
pub struct Console {
    out: Box<dyn Write>,
    show_bodies: bool,
}

impl Console {
    /// Console on standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Console on an arbitrary writer
    pub fn new(out: impl Write + 'static) -> Self {
        Self {
            out: Box::new(out),
            show_bodies: false,
        }
    }

    /// Also print raw response bodies for protocol errors
    #[must_use]
    pub const fn with_response_bodies(mut self, show: bool) -> Self {
        self.show_bodies = show;
        self
    }

    /// Write one line
    pub fn line(&mut self, text: impl Display) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "console write failed");
        }
    }

    /// Write a separator rule
    pub fn rule(&mut self, ch: char) {
        self.line(ch.to_string().repeat(RULE_WIDTH));
    }

    /// Print a reply block
    pub fn reply(&mut self, reply: &ChatReply) {
        self.line(format_args!("\n✅ Ответ LLM:\n{}\n", reply.text()));
    }

    /// Print the notice for a non-fatal error
    pub fn report(&mut self, err: &Error) {
        match err {
            Error::NoSpeech { .. } => self.line("❌ Тайм-аут: не услышал команду"),
            Error::Unrecognized => self.line("❌ Не удалось распознать речь"),
            Error::Recognition(reason) => {
                self.line(format_args!("❌ Ошибка сервиса распознавания: {reason}"));
            }
            Error::Audio(reason) => self.line(format_args!("❌ Ошибка микрофона: {reason}")),
            Error::Connectivity { url, .. } => {
                self.line(format_args!("❌ Не могу подключиться к Ollama по адресу {url}"));
                self.line("   Убедитесь, что Ollama запущена: ollama serve");
            }
            Error::Protocol { status, body } => {
                self.line(format_args!("❌ Ошибка Ollama API: {status}"));
                if self.show_bodies {
                    self.line(format_args!("   Ответ: {body}"));
                }
            }
            Error::Timeout { stage: "chat", .. } => {
                self.line("❌ Тайм-аут при обращении к Ollama");
            }
            Error::Decode(_) => self.line(format_args!("❌ Ошибка при обращении к LLM: {err}")),
            _ => self.line(format_args!("❌ Произошла ошибка: {err}")),
        }
    }
}
