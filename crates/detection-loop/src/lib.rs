//! Detection Loop
//!
//! The session state machine at the heart of the client. A cooperative,
//! self-rescheduling loop captures one frame per tick, sends it to the
//! classifier, and feeds the result into the episode tracker and session
//! statistics; sustained drowsiness raises the alarm. Stopping follows a
//! strict teardown order (camera first, backend last) and a stale-response
//! guard keeps late classifier replies from mutating a finished session.

pub mod context;
pub mod driver;

pub use context::{LoopSnapshot, LoopState, SessionContext};
pub use driver::DetectionLoop;

use backend_client::BackendError;
use frame_source::FrameError;
use thiserror::Error;

/// Detection loop error types
#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Frame source error: {0}")]
    Frame(#[from] FrameError),

    #[error("Failed to start session: {0}")]
    SessionStart(BackendError),

    #[error("Failed to stop session: {0}")]
    SessionStop(BackendError),

    #[error("Detection is already running")]
    AlreadyRunning,

    #[error("Detection is not running")]
    NotRunning,
}
