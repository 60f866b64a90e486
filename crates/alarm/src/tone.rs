//! Synthesized fallback tone

use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

/// Looping 800 Hz sine tone used when the configured sound cannot play
pub struct FallbackTone {
    frequency: f32,
    sample_rate: u32,
    num_sample: usize,
}

impl FallbackTone {
    pub fn new() -> Self {
        Self {
            frequency: 800.0,
            sample_rate: 44100,
            num_sample: 0,
        }
    }
}

impl Default for FallbackTone {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for FallbackTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        self.num_sample = self.num_sample.wrapping_add(1);
        let t = self.num_sample as f32 / self.sample_rate as f32;

        // Lower amplitude to prevent clipping; sink volume scales on top
        Some((2.0 * PI * self.frequency * t).sin() * 0.3)
    }
}

impl Source for FallbackTone {
    fn current_frame_len(&self) -> Option<usize> {
        None // Infinite stream
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite
    }
}
