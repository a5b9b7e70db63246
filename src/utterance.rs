//! One user turn

use std::fmt;

/// Transcribed or literal text for a single turn
///
/// Produced once per loop iteration and consumed by the LLM client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance(String);

impl Utterance {
    /// Wrap text as an utterance
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrow the text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the text
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Utterance {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Utterance {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}
