//! Drowsiness episode tracking
//!
//! An episode is a contiguous run of frames classified as `Drowsiness`.
//! The tracker decides when an episode counts toward session statistics
//! (once, after a fixed minimum duration) and when it has sustained long
//! enough to warrant the alarm. A single non-drowsy frame ends the episode
//! immediately; there is no debounce.

use crate::result::DetectionClass;
use std::time::{Duration, Instant};
use tracing::debug;

/// Minimum sustained drowsiness before an episode is counted in statistics.
///
/// Fixed policy constant, independent of the user's alarm trigger time, so
/// single-frame jitter never pollutes the session counters.
pub const STATS_FLOOR: Duration = Duration::from_secs(5);

/// Actions requested by the tracker for one observed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpisodeActions {
    /// Count this episode in the session statistics (fires once per episode)
    pub count_in_stats: bool,
    /// Drowsiness has sustained past the trigger time; the alarm should be
    /// sounding. Reported every frame past the threshold; the caller gates
    /// on the alarm controller's active flag.
    pub alarm_due: bool,
}

/// Tracks the current drowsiness episode, if any
#[derive(Debug, Default)]
pub struct EpisodeTracker {
    started_at: Option<Instant>,
    counted_for_stats: bool,
}

impl EpisodeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one classified frame into the tracker.
    ///
    /// `trigger` is re-read from settings on every call so mid-session
    /// changes apply without restarting the episode timer.
    pub fn observe(
        &mut self,
        class: DetectionClass,
        trigger: Duration,
        now: Instant,
    ) -> EpisodeActions {
        if class != DetectionClass::Drowsiness {
            if self.started_at.is_some() {
                debug!("drowsiness episode ended");
            }
            self.started_at = None;
            self.counted_for_stats = false;
            return EpisodeActions::default();
        }

        let Some(started_at) = self.started_at else {
            self.started_at = Some(now);
            self.counted_for_stats = false;
            debug!("drowsiness episode started");
            return EpisodeActions::default();
        };

        let elapsed = now.saturating_duration_since(started_at);
        let mut actions = EpisodeActions::default();

        if elapsed >= STATS_FLOOR && !self.counted_for_stats {
            self.counted_for_stats = true;
            actions.count_in_stats = true;
            debug!(elapsed_secs = elapsed.as_secs_f32(), "episode counted toward stats");
        }

        if elapsed >= trigger {
            actions.alarm_due = true;
        }

        actions
    }

    /// Whether an episode is currently in progress
    pub fn in_episode(&self) -> bool {
        self.started_at.is_some()
    }

    /// Time spent in the current episode, if one is in progress
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started_at.map(|s| now.saturating_duration_since(s))
    }

    /// Clear episode state (used when a session stops)
    pub fn reset(&mut self) {
        self.started_at = None;
        self.counted_for_stats = false;
    }
}
