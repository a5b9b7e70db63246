//! Command loop
//!
//! Drives listen → transcribe → query → present, one utterance per
//! iteration, until the source is exhausted, the reply asks to exit, the
//! input device fails or the process is interrupted.

mod pause;
mod source;

use std::future::Future;

pub use pause::{EnterPrompt, NoPause, Pause};
pub use source::{Acquired, DEFAULT_QUERIES, ScriptedQueries, UtteranceSource};

use crate::console::Console;
use crate::llm::{ChatReply, LlmClient};

/// Words in a reply that end a voice session
pub const EXIT_WORDS: [&str; 5] = ["выход", "exit", "quit", "стоп", "stop"];

/// State of the command loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Listening,
    Transcribing,
    Querying,
    Presenting,
    Terminated,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Scripted queries ran out
    Exhausted,
    /// Reply contained an exit word
    ExitWord,
    /// User interrupt
    Interrupted,
    /// Confirmation input closed
    InputClosed,
    /// Input device failed
    DeviceFailed,
}

/// Totals for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: usize,
    pub replies: usize,
    pub end: EndReason,
}

/// Mode-specific loop behavior
#[derive(Debug, Clone, Default)]
pub struct LoopPolicy {
    /// Lowercase words that terminate the loop when found in a reply
    pub exit_words: Vec<String>,

    /// Print a rule after each reply block
    pub rule_after_reply: bool,
}

impl LoopPolicy {
    /// Voice mode: exit words apply
    #[must_use]
    pub fn voice() -> Self {
        Self {
            exit_words: EXIT_WORDS.iter().map(ToString::to_string).collect(),
            rule_after_reply: false,
        }
    }

    /// Diagnostic mode: never exits on reply content
    #[must_use]
    pub const fn diagnostic() -> Self {
        Self {
            exit_words: Vec::new(),
            rule_after_reply: true,
        }
    }

    /// Case-insensitive substring match against the exit words
    #[must_use]
    pub fn is_exit(&self, reply: &str) -> bool {
        let lower = reply.to_lowercase();
        self.exit_words.iter().any(|w| lower.contains(w.as_str()))
    }
}

/// Outcome of a single iteration
enum Step {
    Continue { replied: bool },
    Finished { replied: bool, reason: EndReason },
}

/// The orchestration loop
pub struct CommandLoop<S, P> {
    source: S,
    llm: LlmClient,
    pause: P,
    policy: LoopPolicy,
    console: Console,
    state: LoopState,
}

impl<S: UtteranceSource, P: Pause> CommandLoop<S, P> {
    /// Assemble a loop; nothing runs until [`run`](Self::run)
    pub fn new(
        source: S,
        llm: LlmClient,
        pause: P,
        policy: LoopPolicy,
        console: Console,
    ) -> Self {
        Self {
            source,
            llm,
            pause,
            policy,
            console,
            state: LoopState::Idle,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Run until the source is exhausted or a reply asks to exit
    pub async fn run(&mut self) -> RunSummary {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run until finished or `shutdown` resolves
    ///
    /// An in-flight stage is dropped on shutdown, which releases the microphone.
    pub async fn run_until<F>(&mut self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut iterations = 0;
        let mut replies = 0;

        let end = loop {
            let step = tokio::select! {
                () = &mut shutdown => None,
                step = self.iteration() => Some(step),
            };

            let Some(step) = step else {
                tracing::info!(state = ?self.state, "interrupted");
                self.console.line("\n\n👋 Работа завершена!");
                break EndReason::Interrupted;
            };

            match step {
                Step::Continue { replied } => {
                    iterations += 1;
                    replies += usize::from(replied);
                }
                // The exhausting acquire is not a turn
                Step::Finished {
                    reason: EndReason::Exhausted,
                    ..
                } => break EndReason::Exhausted,
                Step::Finished { replied, reason } => {
                    iterations += 1;
                    replies += usize::from(replied);
                    break reason;
                }
            }
        };

        self.transition(LoopState::Terminated);

        let summary = RunSummary {
            iterations,
            replies,
            end,
        };
        tracing::info!(?summary, "command loop finished");
        summary
    }

    async fn iteration(&mut self) -> Step {
        self.transition(LoopState::Listening);

        let utterance = match self.source.acquire(&mut self.console).await {
            Acquired::Text(utterance) => utterance,
            Acquired::Audio(wav) => {
                self.transition(LoopState::Transcribing);
                match self.source.transcribe(wav, &mut self.console).await {
                    Some(utterance) => utterance,
                    None => return self.idle(false),
                }
            }
            Acquired::Nothing => return self.idle(false),
            Acquired::Failed(e) => {
                tracing::error!(error = %e, "input device failed");
                self.console.report(&e);
                return Step::Finished {
                    replied: false,
                    reason: EndReason::DeviceFailed,
                };
            }
            Acquired::Exhausted => {
                return Step::Finished {
                    replied: false,
                    reason: EndReason::Exhausted,
                };
            }
        };

        self.transition(LoopState::Querying);
        let Some(reply) = self.llm.get_reply(&utterance, &mut self.console).await else {
            return self.idle(false);
        };

        self.transition(LoopState::Presenting);
        self.present(&reply);

        if self.policy.is_exit(reply.text()) {
            self.console.line("\n👋 До свидания!");
            return Step::Finished {
                replied: true,
                reason: EndReason::ExitWord,
            };
        }

        match self.pause.wait(&mut self.console).await {
            Ok(true) => self.idle(true),
            Ok(false) => Step::Finished {
                replied: true,
                reason: EndReason::InputClosed,
            },
            Err(e) => {
                tracing::warn!(error = %e, "confirmation input failed");
                Step::Finished {
                    replied: true,
                    reason: EndReason::InputClosed,
                }
            }
        }
    }

    fn present(&mut self, reply: &ChatReply) {
        self.console.reply(reply);
        if self.policy.rule_after_reply {
            self.console.rule('=');
        }
    }

    fn idle(&mut self, replied: bool) -> Step {
        self.transition(LoopState::Idle);
        Step::Continue { replied }
    }

    fn transition(&mut self, next: LoopState) {
        tracing::trace!(from = ?self.state, to = ?next, "loop transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words_case_insensitive() {
        let policy = LoopPolicy::voice();

        assert!(policy.is_exit("Хорошо, ВЫХОД из программы"));
        assert!(policy.is_exit("Type EXIT to leave"));
        assert!(policy.is_exit("Стоп"));
        assert!(!policy.is_exit("Два плюс два равно четыре"));
    }

    #[test]
    fn test_diagnostic_never_exits() {
        let policy = LoopPolicy::diagnostic();
        assert!(!policy.is_exit("exit quit stop выход"));
    }
}
