//! Session context and the rendering read model

use detection::{
    AlarmSettings, DetectionResult, EpisodeTracker, SessionId, SessionStats,
};
use std::time::Instant;

/// Detection loop lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Running,
    Stopping,
}

/// All mutable state for one detection session.
///
/// Single-writer discipline: only the loop driver transitions `state` and
/// `session_id`; statistics are mutated only through [`SessionStats`]
/// methods; the alarm-active flag lives in the alarm controller.
#[derive(Debug, Default)]
pub struct SessionContext {
    pub(crate) state: LoopState,
    pub(crate) session_id: Option<SessionId>,
    pub(crate) settings: AlarmSettings,
    pub(crate) stats: SessionStats,
    pub(crate) episode: EpisodeTracker,
    /// Last known detections, kept so the overlay does not flicker while a
    /// classify request is in flight
    pub(crate) overlay: Vec<DetectionResult>,
    /// Most recent top detection for the status panel
    pub(crate) top: Option<DetectionResult>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Point-in-time view of the loop for the rendering layer
#[derive(Debug, Clone)]
pub struct LoopSnapshot {
    pub state: LoopState,
    pub top_detection: Option<DetectionResult>,
    pub overlay: Vec<DetectionResult>,
    /// Session duration formatted `m:ss`
    pub duration_display: String,
    pub total_detections: u32,
    pub drowsiness_count: u32,
    pub awake_count: u32,
    pub yawn_count: u32,
    pub alarm_active: bool,
    pub trigger_seconds: u32,
}

impl SessionContext {
    pub(crate) fn snapshot(&self, now: Instant, alarm_active: bool) -> LoopSnapshot {
        LoopSnapshot {
            state: self.state,
            top_detection: self.top.clone(),
            overlay: self.overlay.clone(),
            duration_display: self.stats.format_duration(now),
            total_detections: self.stats.total_detections(),
            drowsiness_count: self.stats.drowsiness_count(),
            awake_count: self.stats.awake_count(),
            yawn_count: self.stats.yawn_count(),
            alarm_active,
            trigger_seconds: self.settings.trigger_seconds,
        }
    }
}
