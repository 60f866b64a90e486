//! Per-session statistics
//!
//! Counters follow the backend's counting policy: awake and yawn increment
//! once per observed frame, drowsiness increments only when the episode
//! tracker says a sustained episode qualifies. Session duration is tracked
//! as closed segments plus the currently open one, so pausing and resuming
//! never double-counts.

use crate::result::DetectionClass;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Mutable statistics for one active session
#[derive(Debug, Default)]
pub struct SessionStats {
    total_detections: u32,
    drowsiness_count: u32,
    awake_count: u32,
    yawn_count: u32,
    accumulated: Duration,
    segment_started_at: Option<Instant>,
}

/// Counter snapshot pushed to the backend's update-session endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_detections: u32,
    pub drowsiness_count: u32,
    pub awake_count: u32,
    pub yawn_count: u32,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero all counters and duration state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record one classified frame. Returns true if any counter changed.
    ///
    /// Drowsiness is deliberately not counted here; it goes through
    /// [`count_drowsiness`](Self::count_drowsiness) after the episode
    /// tracker's floor is met.
    pub fn record_detection(&mut self, class: DetectionClass) -> bool {
        match class {
            DetectionClass::Awake => {
                self.awake_count += 1;
                self.total_detections += 1;
                true
            }
            DetectionClass::Yawn => {
                self.yawn_count += 1;
                self.total_detections += 1;
                true
            }
            DetectionClass::Drowsiness | DetectionClass::Normal => false,
        }
    }

    /// Count one qualifying drowsiness episode
    pub fn count_drowsiness(&mut self) {
        self.drowsiness_count += 1;
        self.total_detections += 1;
        debug!(count = self.drowsiness_count, "drowsiness episode counted");
    }

    /// Open a live segment. No-op if one is already open.
    pub fn start_segment(&mut self, now: Instant) {
        if self.segment_started_at.is_none() {
            self.segment_started_at = Some(now);
        }
    }

    /// Close the open segment, folding its span into the accumulated total
    pub fn end_segment(&mut self, now: Instant) {
        if let Some(started) = self.segment_started_at.take() {
            self.accumulated += now.saturating_duration_since(started);
        }
    }

    /// Total active duration: accumulated segments plus the open one
    pub fn current_duration(&self, now: Instant) -> Duration {
        let open = self
            .segment_started_at
            .map(|s| now.saturating_duration_since(s))
            .unwrap_or_default();
        self.accumulated + open
    }

    /// Duration formatted as `m:ss` for display
    pub fn format_duration(&self, now: Instant) -> String {
        let secs = self.current_duration(now).as_secs();
        format!("{}:{:02}", secs / 60, secs % 60)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_detections: self.total_detections,
            drowsiness_count: self.drowsiness_count,
            awake_count: self.awake_count,
            yawn_count: self.yawn_count,
        }
    }

    pub fn total_detections(&self) -> u32 {
        self.total_detections
    }

    pub fn drowsiness_count(&self) -> u32 {
        self.drowsiness_count
    }

    pub fn awake_count(&self) -> u32 {
        self.awake_count
    }

    pub fn yawn_count(&self) -> u32 {
        self.yawn_count
    }
}
