//! Phrase detection over a live sample stream
//!
//! Calibrates an energy threshold from ambient noise, waits for speech to
//! start, then accumulates the phrase until a trailing pause or the phrase
//! limit. Pure sample arithmetic; no device access.

use std::time::Duration;

use crate::config::CaptureConfig;

/// Threshold multiplier applied to the ambient noise level
const AMBIENT_RATIO: f32 = 1.5;

/// Lowest threshold allowed after calibration (dead-silent rooms)
const MIN_THRESHOLD: f32 = 0.01;

/// State of the phrase detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Sampling ambient noise
    Calibrating,
    /// Waiting for speech to start
    Waiting,
    /// Speech started, accumulating phrase
    Speaking,
    /// Phrase ended (pause or phrase limit)
    Complete,
    /// No speech within the wait timeout
    TimedOut,
}

impl DetectorState {
    /// Whether no further samples are needed
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Complete | Self::TimedOut)
    }
}

/// Detects a single spoken phrase in audio
pub struct SpeechDetector {
    state: DetectorState,
    threshold: f32,
    calibration_len: usize,
    wait_len: usize,
    phrase_len: usize,
    pause_len: usize,
    ambient: Vec<f32>,
    preroll: Vec<f32>,
    phrase: Vec<f32>,
    waited: usize,
    silence: usize,
}

impl SpeechDetector {
    /// Create a detector for one listen call
    #[must_use]
    pub fn new(config: &CaptureConfig, sample_rate: u32) -> Self {
        let samples = |d: Duration| duration_to_samples(d, sample_rate);

        Self {
            state: DetectorState::Calibrating,
            threshold: MIN_THRESHOLD,
            calibration_len: samples(config.calibration),
            wait_len: samples(config.wait_timeout),
            phrase_len: samples(config.phrase_limit),
            pause_len: samples(config.pause),
            ambient: Vec::new(),
            preroll: Vec::new(),
            phrase: Vec::new(),
            waited: 0,
            silence: 0,
        }
    }

    /// Feed a chunk of samples and return the resulting state
    pub fn process(&mut self, samples: &[f32]) -> DetectorState {
        let mut rest = samples;

        if self.state == DetectorState::Calibrating {
            let needed = self.calibration_len.saturating_sub(self.ambient.len());
            let (head, tail) = rest.split_at(needed.min(rest.len()));
            self.ambient.extend_from_slice(head);
            rest = tail;

            if self.ambient.len() >= self.calibration_len {
                self.finish_calibration();
            }
        }

        if rest.is_empty() {
            return self.state;
        }

        let energy = calculate_energy(rest);
        let is_speech = energy > self.threshold;

        match self.state {
            DetectorState::Waiting => {
                if is_speech {
                    self.state = DetectorState::Speaking;
                    self.phrase = std::mem::take(&mut self.preroll);
                    self.phrase.extend_from_slice(rest);
                    self.silence = 0;
                    tracing::trace!(energy, threshold = self.threshold, "speech started");
                    self.check_phrase_limit();
                } else {
                    self.waited += rest.len();
                    self.preroll.clear();
                    self.preroll.extend_from_slice(rest);

                    if self.waited >= self.wait_len {
                        tracing::debug!(waited = self.waited, "no speech before timeout");
                        self.state = DetectorState::TimedOut;
                    }
                }
            }
            DetectorState::Speaking => {
                self.phrase.extend_from_slice(rest);

                if is_speech {
                    self.silence = 0;
                } else {
                    self.silence += rest.len();
                }

                tracing::trace!(
                    phrase_len = self.phrase.len(),
                    silence = self.silence,
                    is_speech,
                    energy,
                    "speaking state"
                );

                if self.silence >= self.pause_len {
                    tracing::debug!(samples = self.phrase.len(), "phrase complete");
                    self.state = DetectorState::Complete;
                } else {
                    self.check_phrase_limit();
                }
            }
            DetectorState::Calibrating | DetectorState::Complete | DetectorState::TimedOut => {}
        }

        self.state
    }

    fn finish_calibration(&mut self) {
        let ambient = calculate_energy(&self.ambient);
        self.threshold = (ambient * AMBIENT_RATIO).max(MIN_THRESHOLD);
        self.state = DetectorState::Waiting;
        self.ambient.clear();
        tracing::debug!(ambient, threshold = self.threshold, "ambient noise calibrated");
    }

    fn check_phrase_limit(&mut self) {
        if self.phrase.len() >= self.phrase_len {
            self.phrase.truncate(self.phrase_len);
            tracing::debug!(samples = self.phrase.len(), "phrase limit reached");
            self.state = DetectorState::Complete;
        }
    }

    /// Take the captured phrase, clearing it
    pub fn take_phrase(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.phrase)
    }

    /// Get the captured phrase
    #[must_use]
    pub fn phrase(&self) -> &[f32] {
        &self.phrase
    }

    /// Energy threshold currently in use
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn duration_to_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)).round() as usize
}
