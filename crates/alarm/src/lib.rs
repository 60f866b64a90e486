//! Alarm Controller
//!
//! Owns the single "alarm is sounding" flag and the playback handle behind
//! it. Start and stop are idempotent; playback is best-effort and never
//! propagates failures into the detection loop. When the configured sound
//! file cannot be opened or decoded (or no audio device exists), a
//! synthesized looping tone takes its place.

pub mod controller;
pub mod tone;

pub use controller::AlarmController;
pub use tone::FallbackTone;

use thiserror::Error;

/// Alarm playback error types (internal; playback is best-effort at the API)
#[derive(Error, Debug)]
pub enum AlarmError {
    #[error("No audio output device: {0}")]
    Device(String),

    #[error("Failed to open sound file: {0}")]
    Open(#[from] std::io::Error),

    #[error("Failed to decode sound file: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
}
