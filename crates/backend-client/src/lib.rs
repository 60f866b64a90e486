//! Backend Client
//!
//! The detection loop's only view of the outside world: a frame classifier
//! and the session lifecycle endpoints (start, stop, stats update, settings,
//! and the fire-and-forget end-session path used on interruption).

pub mod http;

pub use http::HttpBackend;

use detection::{AlarmSettings, DetectionResult, SessionId, StatsSnapshot};
use frame_source::EncodedFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend call error types
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Kind of detection session being opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Live,
    Upload,
}

/// Remote frame classifier.
///
/// A call may fail for any transient reason; the caller is expected to log
/// and carry on. One failed frame never stops the loop.
pub trait Classifier {
    async fn classify(
        &self,
        session: &SessionId,
        frame: &EncodedFrame,
    ) -> Result<Vec<DetectionResult>, BackendError>;
}

/// Session lifecycle endpoints
pub trait SessionLifecycle {
    async fn start_session(&self, kind: SessionKind) -> Result<SessionId, BackendError>;

    async fn stop_session(&self, session: &SessionId) -> Result<(), BackendError>;

    /// Best-effort stats push; callers log failures and never retry inline.
    async fn update_stats(
        &self,
        session: &SessionId,
        stats: StatsSnapshot,
    ) -> Result<(), BackendError>;

    /// Mark the session interrupted without awaiting a response. Used on
    /// forced teardown where nothing may block.
    fn end_session_best_effort(&self, session: SessionId);

    async fn alarm_settings(&self) -> Result<AlarmSettings, BackendError>;

    async fn save_alarm_settings(&self, settings: &AlarmSettings) -> Result<(), BackendError>;
}
