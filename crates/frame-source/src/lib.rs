//! Frame Source Abstraction
//!
//! Supplies encoded video frames to the detection loop:
//! - `FrameSource` trait for camera-like devices
//! - JPEG encoding of raw RGB frames
//! - Synthetic test-pattern source for development and tests

pub mod frame;
pub mod synthetic;

pub use frame::{EncodedFrame, RawFrame};
pub use synthetic::TestPatternSource;

use thiserror::Error;

/// Frame source error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Failed to open frame source: {0}")]
    Open(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Frame source not acquired")]
    NotAcquired,
}

/// A camera-like device that yields one encoded frame at a time.
///
/// `acquire` must be called before `next_frame`; `release` is idempotent
/// and must stop all capture before any other teardown runs.
pub trait FrameSource {
    /// Open the underlying device.
    fn acquire(&mut self) -> Result<(), FrameError>;

    /// Capture the next available frame, or `None` if no frame is ready yet.
    fn next_frame(&mut self) -> Result<Option<EncodedFrame>, FrameError>;

    /// Stop capture and release the device. Safe to call when not acquired.
    fn release(&mut self);

    /// Whether the source is currently acquired.
    fn is_acquired(&self) -> bool;
}
