//! Synthetic test-pattern frame source
//!
//! Generates a moving gradient so the full capture/encode/classify path can
//! run without camera hardware.

use crate::frame::{EncodedFrame, RawFrame};
use crate::{FrameError, FrameSource};
use tracing::{debug, info};

/// Frame source that renders a moving RGB gradient
pub struct TestPatternSource {
    width: u32,
    height: u32,
    sequence: u32,
    acquired: bool,
}

impl TestPatternSource {
    /// Create a source producing frames of the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sequence: 0,
            acquired: false,
        }
    }

    fn render(&self) -> RawFrame {
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        let shift = (self.sequence % 256) as u8;
        for y in 0..self.height {
            for x in 0..self.width {
                data.push((x % 256) as u8 ^ shift);
                data.push((y % 256) as u8);
                data.push(shift);
            }
        }
        RawFrame::new(data, self.width, self.height)
    }
}

impl FrameSource for TestPatternSource {
    fn acquire(&mut self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::Open("zero-sized frame dimensions".into()));
        }
        self.acquired = true;
        self.sequence = 0;
        info!(width = self.width, height = self.height, "test pattern source acquired");
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<EncodedFrame>, FrameError> {
        if !self.acquired {
            return Err(FrameError::NotAcquired);
        }
        self.sequence = self.sequence.wrapping_add(1);
        let encoded = self.render().encode()?;
        debug!(sequence = self.sequence, bytes = encoded.jpeg.len(), "frame captured");
        Ok(Some(encoded))
    }

    fn release(&mut self) {
        if self.acquired {
            info!("test pattern source released");
        }
        self.acquired = false;
    }

    fn is_acquired(&self) -> bool {
        self.acquired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_requires_acquire() {
        let mut source = TestPatternSource::new(32, 32);
        assert!(matches!(source.next_frame(), Err(FrameError::NotAcquired)));

        source.acquire().unwrap();
        assert!(source.next_frame().unwrap().is_some());
    }

    #[test]
    fn release_is_idempotent() {
        let mut source = TestPatternSource::new(32, 32);
        source.acquire().unwrap();
        source.release();
        source.release();
        assert!(!source.is_acquired());
    }

    #[test]
    fn zero_dimensions_fail_acquire() {
        let mut source = TestPatternSource::new(0, 480);
        assert!(source.acquire().is_err());
    }
}
