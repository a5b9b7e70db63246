//! Confirmation pause between voice turns

use std::io::BufRead;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;
use crate::console::Console;

/// Waits for the user before the next turn
#[async_trait(?Send)]
pub trait Pause {
    /// Block until the user confirms
    ///
    /// Returns `false` when input is closed and the loop should stop.
    ///
    /// # Errors
    ///
    /// Returns error if reading user input fails
    async fn wait(&mut self, console: &mut Console) -> Result<bool>;
}

/// Continue immediately
pub struct NoPause;

#[async_trait(?Send)]
impl Pause for NoPause {
    async fn wait(&mut self, _console: &mut Console) -> Result<bool> {
        Ok(true)
    }
}

/// "Press Enter" prompt on standard input
///
/// Lines are read on a dedicated thread so an interrupt never waits on a
/// blocked stdin read. Line contents are never decoded; any line confirms.
pub struct EnterPrompt {
    lines: mpsc::Receiver<std::io::Result<()>>,
}

impl EnterPrompt {
    /// Start the stdin reader thread
    #[must_use]
    pub fn spawn() -> Self {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    /// Start a reader thread over arbitrary line input
    #[must_use]
    pub fn from_reader<R: BufRead + Send + 'static>(input: R) -> Self {
        let (tx, rx) = mpsc::channel(1);

        std::thread::spawn(move || {
            for line in input.split(b'\n') {
                let failed = line.is_err();
                if tx.blocking_send(line.map(drop)).is_err() || failed {
                    break;
                }
            }
            tracing::debug!("confirmation input closed");
        });

        Self { lines: rx }
    }
}

#[async_trait(?Send)]
impl Pause for EnterPrompt {
    async fn wait(&mut self, console: &mut Console) -> Result<bool> {
        console.line("\n⏎ Нажмите Enter для следующей команды или Ctrl+C для выхода...\n");

        match self.lines.recv().await {
            Some(Ok(())) => Ok(true),
            Some(Err(e)) => Err(e.into()),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[tokio::test]
    async fn test_any_line_confirms_until_eof() {
        // Second line is cp1251 "да", not UTF-8
        let input = Cursor::new(b"\n\xe4\xe0\n".to_vec());
        let mut prompt = EnterPrompt::from_reader(input);
        let mut console = Console::new(std::io::sink());

        assert!(prompt.wait(&mut console).await.unwrap());
        assert!(prompt.wait(&mut console).await.unwrap());
        assert!(!prompt.wait(&mut console).await.unwrap());
    }

    #[tokio::test]
    async fn test_no_pause_continues() {
        let mut console = Console::new(std::io::sink());
        assert!(NoPause.wait(&mut console).await.unwrap());
    }
}
