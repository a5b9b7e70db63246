//! Microphone → text for one turn

use std::time::Duration;

use async_trait::async_trait;

use super::capture::{AudioCapture, samples_to_wav};
use super::detector::{DetectorState, SpeechDetector};
use super::stt::SpeechToText;
use crate::agent::{Acquired, UtteranceSource};
use crate::config::{CaptureConfig, Config};
use crate::console::Console;
use crate::utterance::Utterance;
use crate::{Error, Result};

/// Extra time allowed on top of the capture windows before the device is
/// considered stalled
const DEVICE_SLACK: Duration = Duration::from_secs(2);

const LISTENING: &str = "\n🎤 Говорите...";
const PROCESSING: &str = "🔄 Обрабатываю речь...";

/// Captures one phrase and transcribes it
pub struct Listener {
    capture: AudioCapture,
    stt: SpeechToText,
    timing: CaptureConfig,
}

impl Listener {
    /// Open the default input device and set up recognition
    ///
    /// # Errors
    ///
    /// Returns error if no usable input device exists or the STT settings
    /// are invalid
    pub fn new(config: &Config) -> Result<Self> {
        let capture = AudioCapture::new()?;
        let stt = SpeechToText::new(&config.stt)?;

        tracing::debug!(
            language = stt.language(),
            wait_timeout = ?config.capture.wait_timeout,
            phrase_limit = ?config.capture.phrase_limit,
            "listener ready"
        );

        Ok(Self {
            capture,
            stt,
            timing: config.capture.clone(),
        })
    }

    /// Record one phrase as WAV
    ///
    /// The microphone is held only for the duration of this call.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSpeech` if nobody speaks within the wait timeout and
    /// `Error::Audio` if the device fails or stops delivering samples
    pub async fn record(&self) -> Result<Vec<u8>> {
        let session = self.capture.open()?;
        let sample_rate = session.sample_rate();
        let mut detector = SpeechDetector::new(&self.timing, sample_rate);

        let deadline = self.timing.calibration
            + self.timing.wait_timeout
            + self.timing.phrase_limit
            + DEVICE_SLACK;

        let detect = async {
            let mut ticker = tokio::time::interval(self.timing.poll_interval);
            loop {
                ticker.tick().await;
                let state = detector.process(&session.take_buffer());
                if state.is_done() {
                    return state;
                }
            }
        };

        let state = tokio::time::timeout(deadline, detect)
            .await
            .map_err(|_| Error::Audio("input device stopped delivering audio".to_string()))?;
        drop(session);

        if state == DetectorState::TimedOut {
            return Err(Error::NoSpeech {
                secs: self.timing.wait_timeout.as_secs_f32(),
            });
        }

        let phrase = detector.take_phrase();
        tracing::debug!(samples = phrase.len(), "phrase captured");
        samples_to_wav(&phrase, sample_rate)
    }

    /// Transcribe recorded WAV audio
    ///
    /// # Errors
    ///
    /// Returns `Error::Unrecognized` or `Error::Recognition`
    pub async fn transcribe_wav(&self, wav: &[u8]) -> Result<Utterance> {
        self.stt.transcribe(wav).await.map(Utterance::new)
    }

    /// Record and transcribe one phrase
    ///
    /// For library callers driving their own loop; [`CommandLoop`] goes
    /// through [`UtteranceSource`] so it can tell device failures apart.
    ///
    /// # Errors
    ///
    /// Returns any acquisition error from [`record`](Self::record) or
    /// [`transcribe_wav`](Self::transcribe_wav)
    ///
    /// [`CommandLoop`]: crate::agent::CommandLoop
    pub async fn try_listen(&self, console: &mut Console) -> Result<Utterance> {
        console.line(LISTENING);
        let wav = self.record().await?;
        console.line(PROCESSING);
        self.transcribe_wav(&wav).await
    }

    /// Record and transcribe one phrase; failures print a notice and yield `None`
    pub async fn listen(&self, console: &mut Console) -> Option<Utterance> {
        console.line(LISTENING);
        match Acquired::from_recording(self.record().await, console) {
            Acquired::Audio(wav) => self.recognize(&wav, console).await,
            Acquired::Failed(e) => {
                console.report(&e);
                None
            }
            Acquired::Text(_) | Acquired::Nothing | Acquired::Exhausted => None,
        }
    }

    async fn recognize(&self, wav: &[u8], console: &mut Console) -> Option<Utterance> {
        console.line(PROCESSING);
        surface(self.transcribe_wav(wav).await, console)
    }
}

/// Print the recognition outcome
fn surface(result: Result<Utterance>, console: &mut Console) -> Option<Utterance> {
    match result {
        Ok(utterance) => {
            console.line(format_args!("📝 Распознано: {utterance}"));
            Some(utterance)
        }
        Err(e) => {
            tracing::warn!(error = %e, kind = ?e.kind(), "listen failed");
            console.report(&e);
            None
        }
    }
}

#[async_trait(?Send)]
impl UtteranceSource for Listener {
    async fn acquire(&mut self, console: &mut Console) -> Acquired {
        console.line(LISTENING);
        Acquired::from_recording(self.record().await, console)
    }

    async fn transcribe(&mut self, audio: Vec<u8>, console: &mut Console) -> Option<Utterance> {
        self.recognize(&audio, console).await
    }
}
