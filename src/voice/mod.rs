//! Voice input
//!
//! Handles audio capture, phrase detection and speech recognition.

mod capture;
mod detector;
mod listener;
mod stt;

pub use capture::{AudioCapture, CaptureSession, SAMPLE_RATE, samples_to_wav};
pub use detector::{DetectorState, SpeechDetector, calculate_energy};
pub use listener::Listener;
pub use stt::SpeechToText;
