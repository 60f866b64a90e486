//! Drowsiness Detection Core
//!
//! Client-side session state for the drowsiness detector:
//! - Classifier result types (class, confidence, bounding box)
//! - Drowsiness episode tracking with stats floor and alarm trigger
//! - Per-session statistics with segmented duration accounting
//! - Alarm settings shared with the backend

pub mod config;
pub mod episode;
pub mod result;
pub mod stats;

pub use config::{AlarmSettings, SoundResource};
pub use episode::{EpisodeActions, EpisodeTracker, STATS_FLOOR};
pub use result::{DetectionClass, DetectionResult};
pub use stats::{SessionStats, StatsSnapshot};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-assigned identifier of one active detection session.
///
/// At most one session may be active per client; every per-frame
/// classification request carries the current identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
