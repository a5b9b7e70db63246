//! Where utterances come from

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::console::Console;
use crate::utterance::Utterance;
use crate::{Error, Result};

/// Queries used by diagnostic mode when none are given
pub const DEFAULT_QUERIES: [&str; 3] = [
    "посчитай два плюс два",
    "дай определение искусственного интеллекта в одном предложении",
    "скажи короткий анекдот",
];

/// Result of one acquisition attempt
#[derive(Debug)]
pub enum Acquired {
    /// Text ready for the LLM
    Text(Utterance),
    /// Captured WAV audio that still needs transcription
    Audio(Vec<u8>),
    /// Nothing usable this turn (notice already printed)
    Nothing,
    /// The input device is gone; the loop cannot continue
    Failed(Error),
    /// Source has no more input
    Exhausted,
}

impl Acquired {
    /// Classify the outcome of one recording attempt
    ///
    /// Device failures are returned as [`Acquired::Failed`] for the loop to
    /// report. Anything else prints its notice and yields
    /// [`Acquired::Nothing`] so the next turn can start.
    pub fn from_recording(result: Result<Vec<u8>>, console: &mut Console) -> Self {
        match result {
            Ok(wav) => Self::Audio(wav),
            Err(e @ Error::Audio(_)) => Self::Failed(e),
            Err(e) => {
                tracing::warn!(error = %e, kind = ?e.kind(), "capture failed");
                console.report(&e);
                Self::Nothing
            }
        }
    }
}

/// Supplies one utterance per loop iteration
#[async_trait(?Send)]
pub trait UtteranceSource {
    /// Acquire the next input
    async fn acquire(&mut self, console: &mut Console) -> Acquired;

    /// Turn audio from [`Acquired::Audio`] into text
    ///
    /// Sources that only yield text never receive audio back.
    async fn transcribe(&mut self, audio: Vec<u8>, console: &mut Console) -> Option<Utterance> {
        let _ = (audio, console);
        None
    }
}

/// Fixed list of literal queries, run once
pub struct ScriptedQueries {
    queries: VecDeque<Utterance>,
    total: usize,
}

impl ScriptedQueries {
    /// Script from the given queries
    pub fn new<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queries: VecDeque<Utterance> = queries
            .into_iter()
            .map(|q| Utterance::new(q.into()))
            .collect();
        let total = queries.len();
        Self { queries, total }
    }

    /// Queries not yet asked
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queries.len()
    }
}

impl Default for ScriptedQueries {
    fn default() -> Self {
        Self::new(DEFAULT_QUERIES)
    }
}

#[async_trait(?Send)]
impl UtteranceSource for ScriptedQueries {
    async fn acquire(&mut self, console: &mut Console) -> Acquired {
        let Some(query) = self.queries.pop_front() else {
            return Acquired::Exhausted;
        };

        let index = self.total - self.queries.len();
        console.line(format_args!("\n📌 Тест {index}/{}", self.total));
        console.rule('-');
        console.line(format_args!("📝 Запрос: {query}"));

        Acquired::Text(query)
    }
}
