//! Detection loop driver
//!
//! One classify request is in flight at a time: each tick captures a frame,
//! awaits the classifier, applies the result, and only then yields back to
//! the interval. Responses are applied against wall-clock "now" at delivery,
//! so a slow request cannot corrupt episode timing.

use crate::context::{LoopSnapshot, LoopState, SessionContext};
use crate::LoopError;
use alarm::AlarmController;
use backend_client::{Classifier, SessionKind, SessionLifecycle};
use detection::{AlarmSettings, DetectionResult, SessionId, SoundResource};
use frame_source::FrameSource;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Drives one live detection session end to end
pub struct DetectionLoop<B, F> {
    backend: B,
    frames: F,
    alarm: AlarmController,
    ctx: SessionContext,
    tick: Duration,
}

impl<B, F> DetectionLoop<B, F>
where
    B: Classifier + SessionLifecycle,
    F: FrameSource,
{
    pub fn new(backend: B, frames: F, alarm: AlarmController, tick: Duration) -> Self {
        Self {
            backend,
            frames,
            alarm,
            ctx: SessionContext::new(),
            tick,
        }
    }

    /// Start a new session: acquire the camera, load settings, open a
    /// backend session, and enter `Running`.
    ///
    /// Settings failures fall back to defaults; camera or session-start
    /// failures roll back anything partially acquired and leave the loop
    /// in `Idle`.
    pub async fn start(&mut self) -> Result<(), LoopError> {
        if self.ctx.state != LoopState::Idle {
            return Err(LoopError::AlreadyRunning);
        }

        self.ctx.stats.reset();
        self.ctx.episode.reset();
        self.ctx.overlay.clear();
        self.ctx.top = None;

        self.frames.acquire()?;

        match self.backend.alarm_settings().await {
            Ok(settings) => self.ctx.settings = settings,
            Err(e) => {
                warn!(error = %e, "failed to load alarm settings; using defaults");
                self.ctx.settings = AlarmSettings::default();
            }
        }

        let session = match self.backend.start_session(SessionKind::Live).await {
            Ok(id) => id,
            Err(e) => {
                self.frames.release();
                return Err(LoopError::SessionStart(e));
            }
        };

        info!(session = %session, "detection session started");
        self.ctx.session_id = Some(session);
        self.ctx.stats.start_segment(Instant::now());
        self.ctx.state = LoopState::Running;
        Ok(())
    }

    /// Run ticks until the session leaves `Running`
    pub async fn run(&mut self) {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.ctx.state == LoopState::Running {
            interval.tick().await;
            self.step().await;
        }
    }

    /// One loop iteration: capture, classify, apply. Per-frame failures are
    /// logged and skipped; they never end the session.
    pub async fn step(&mut self) {
        if self.ctx.state != LoopState::Running {
            return;
        }
        let Some(captured) = self.ctx.session_id.clone() else {
            return;
        };

        let frame = match self.frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "frame capture failed");
                return;
            }
        };

        match self.backend.classify(&captured, &frame).await {
            Ok(detections) => {
                self.apply_result(&captured, detections, Instant::now()).await;
            }
            Err(e) => warn!(error = %e, "frame classification failed"),
        }
    }

    /// Apply one classification response. `captured` is the session id the
    /// request was issued under; a mismatch means the response is stale and
    /// must not touch any state.
    async fn apply_result(
        &mut self,
        captured: &SessionId,
        detections: Vec<DetectionResult>,
        now: Instant,
    ) {
        if self.ctx.state != LoopState::Running || self.ctx.session_id.as_ref() != Some(captured) {
            debug!(session = %captured, "discarding stale classification response");
            return;
        }

        let top = detections
            .first()
            .cloned()
            .unwrap_or_else(DetectionResult::normal);
        self.ctx.overlay = detections;
        self.ctx.top = Some(top.clone());

        let mut flush = self.ctx.stats.record_detection(top.class);

        let actions =
            self.ctx
                .episode
                .observe(top.class, self.ctx.settings.trigger_duration(), now);
        if actions.count_in_stats {
            self.ctx.stats.count_drowsiness();
            flush = true;
        }
        if actions.alarm_due && self.ctx.settings.enabled && !self.alarm.is_active() {
            self.alarm.start(&self.ctx.settings);
        }

        if flush {
            self.flush_stats(captured).await;
        }
    }

    async fn flush_stats(&self, session: &SessionId) {
        if let Err(e) = self
            .backend
            .update_stats(session, self.ctx.stats.snapshot())
            .await
        {
            warn!(error = %e, "session stats update failed");
        }
    }

    /// Stop the session. Exactly one stop sequence runs per session; the
    /// teardown order is camera, alarm, stats segment, backend, local reset.
    /// Local cleanup is unconditional: a backend failure is reported but
    /// the loop still returns to `Idle`.
    pub async fn stop(&mut self) -> Result<(), LoopError> {
        if self.ctx.state != LoopState::Running {
            return Err(LoopError::NotRunning);
        }
        self.ctx.state = LoopState::Stopping;

        // Camera first, so no capture can race the released device.
        self.frames.release();
        self.alarm.stop();
        self.ctx.stats.end_segment(Instant::now());

        let session = self.ctx.session_id.take();
        let result = match &session {
            Some(id) => self
                .backend
                .stop_session(id)
                .await
                .map_err(LoopError::SessionStop),
            None => Ok(()),
        };
        if let Err(e) = &result {
            error!(error = %e, "failed to record session stop on backend");
        }

        self.ctx.stats.reset();
        self.ctx.episode.reset();
        self.ctx.state = LoopState::Idle;
        if let Some(id) = session {
            info!(session = %id, "detection session stopped");
        }
        result
    }

    /// Forced teardown (navigation/unload analog): same local sequence as
    /// [`stop`](Self::stop), but the backend notification is fire-and-forget.
    pub fn interrupt(&mut self) {
        if self.ctx.state != LoopState::Running {
            return;
        }
        self.ctx.state = LoopState::Stopping;

        self.frames.release();
        self.alarm.stop();
        self.ctx.stats.end_segment(Instant::now());

        if let Some(id) = self.ctx.session_id.take() {
            info!(session = %id, "session interrupted; notifying backend in background");
            self.backend.end_session_best_effort(id);
        }

        self.ctx.stats.reset();
        self.ctx.episode.reset();
        self.ctx.state = LoopState::Idle;
    }

    /// Silence the alarm without ending the session. Episode timing restarts,
    /// so a full trigger period of sustained drowsiness must elapse before
    /// the alarm can fire again.
    pub fn stop_alarm(&mut self) {
        self.alarm.stop();
        self.ctx.episode.reset();
    }

    /// Update the trigger time mid-session; the running episode keeps its
    /// start time.
    pub async fn set_trigger_seconds(&mut self, seconds: u32) {
        self.ctx.settings.trigger_seconds = seconds;
        self.ctx.settings = self.ctx.settings.clone().sanitized();
        self.persist_settings().await;
    }

    /// Update the volume; a currently sounding alarm picks it up live.
    pub async fn set_volume(&mut self, volume: f32) {
        self.ctx.settings.volume = volume;
        self.ctx.settings = self.ctx.settings.clone().sanitized();
        if self.alarm.is_active() {
            self.alarm.start(&self.ctx.settings);
        }
        self.persist_settings().await;
    }

    pub async fn set_sound(&mut self, sound: SoundResource) {
        self.ctx.settings.sound = sound;
        self.persist_settings().await;
    }

    async fn persist_settings(&self) {
        if let Err(e) = self.backend.save_alarm_settings(&self.ctx.settings).await {
            warn!(error = %e, "failed to persist alarm settings");
        }
    }

    pub fn state(&self) -> LoopState {
        self.ctx.state
    }

    pub fn is_alarm_active(&self) -> bool {
        self.alarm.is_active()
    }

    /// Read model for the rendering layer
    pub fn snapshot(&self) -> LoopSnapshot {
        self.ctx.snapshot(Instant::now(), self.alarm.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_client::BackendError;
    use detection::{DetectionClass, StatsSnapshot};
    use frame_source::{EncodedFrame, FrameError};
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Default)]
    struct MockBackend {
        log: CallLog,
        fail_start: bool,
        fail_settings: bool,
        stats_pushes: Arc<Mutex<Vec<StatsSnapshot>>>,
        interrupted: Arc<Mutex<Vec<SessionId>>>,
    }

    impl Classifier for MockBackend {
        async fn classify(
            &self,
            _session: &SessionId,
            _frame: &EncodedFrame,
        ) -> Result<Vec<DetectionResult>, BackendError> {
            self.log.lock().unwrap().push("classify".into());
            Ok(Vec::new())
        }
    }

    impl SessionLifecycle for MockBackend {
        async fn start_session(&self, _kind: SessionKind) -> Result<SessionId, BackendError> {
            self.log.lock().unwrap().push("start_session".into());
            if self.fail_start {
                return Err(BackendError::Status {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(SessionId::new("sess-1"))
        }

        async fn stop_session(&self, _session: &SessionId) -> Result<(), BackendError> {
            self.log.lock().unwrap().push("stop_session".into());
            Ok(())
        }

        async fn update_stats(
            &self,
            _session: &SessionId,
            stats: StatsSnapshot,
        ) -> Result<(), BackendError> {
            self.log.lock().unwrap().push("update_stats".into());
            self.stats_pushes.lock().unwrap().push(stats);
            Ok(())
        }

        fn end_session_best_effort(&self, session: SessionId) {
            self.interrupted.lock().unwrap().push(session);
        }

        async fn alarm_settings(&self) -> Result<AlarmSettings, BackendError> {
            if self.fail_settings {
                return Err(BackendError::Status {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            Ok(AlarmSettings::default())
        }

        async fn save_alarm_settings(
            &self,
            _settings: &AlarmSettings,
        ) -> Result<(), BackendError> {
            Ok(())
        }
    }

    struct MockFrames {
        log: CallLog,
        acquired: bool,
    }

    impl FrameSource for MockFrames {
        fn acquire(&mut self) -> Result<(), FrameError> {
            self.log.lock().unwrap().push("acquire".into());
            self.acquired = true;
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Option<EncodedFrame>, FrameError> {
            if !self.acquired {
                return Err(FrameError::NotAcquired);
            }
            Ok(Some(EncodedFrame {
                jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
                width: 2,
                height: 2,
            }))
        }

        fn release(&mut self) {
            if self.acquired {
                self.log.lock().unwrap().push("release".into());
            }
            self.acquired = false;
        }

        fn is_acquired(&self) -> bool {
            self.acquired
        }
    }

    fn drowsy() -> DetectionResult {
        DetectionResult {
            class: DetectionClass::Drowsiness,
            confidence: 0.9,
            bbox: Some([10.0, 10.0, 90.0, 90.0]),
            color: None,
            timestamp: None,
        }
    }

    fn awake() -> DetectionResult {
        DetectionResult {
            class: DetectionClass::Awake,
            confidence: 0.8,
            bbox: None,
            color: None,
            timestamp: None,
        }
    }

    fn build_loop(backend: MockBackend) -> DetectionLoop<MockBackend, MockFrames> {
        let frames = MockFrames {
            log: backend.log.clone(),
            acquired: false,
        };
        DetectionLoop::new(
            backend,
            frames,
            AlarmController::new("/nonexistent"),
            Duration::from_millis(50),
        )
    }

    fn index_of(log: &CallLog, entry: &str) -> usize {
        log.lock()
            .unwrap()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("{entry} not in call log"))
    }

    #[tokio::test]
    async fn stop_releases_camera_before_backend_notification() {
        let backend = MockBackend::default();
        let log = backend.log.clone();
        let mut driver = build_loop(backend);

        driver.start().await.unwrap();
        assert_eq!(driver.state(), LoopState::Running);

        driver.stop().await.unwrap();
        assert_eq!(driver.state(), LoopState::Idle);
        assert!(index_of(&log, "release") < index_of(&log, "stop_session"));
    }

    #[tokio::test]
    async fn start_failure_rolls_back_camera() {
        let backend = MockBackend {
            fail_start: true,
            ..Default::default()
        };
        let log = backend.log.clone();
        let mut driver = build_loop(backend);

        assert!(matches!(driver.start().await, Err(LoopError::SessionStart(_))));
        assert_eq!(driver.state(), LoopState::Idle);
        assert!(index_of(&log, "acquire") < index_of(&log, "release"));
    }

    #[tokio::test]
    async fn settings_failure_falls_back_to_defaults() {
        let backend = MockBackend {
            fail_settings: true,
            ..Default::default()
        };
        let mut driver = build_loop(backend);

        driver.start().await.unwrap();
        assert_eq!(driver.snapshot().trigger_seconds, 5);
    }

    #[tokio::test]
    async fn second_stop_is_rejected() {
        let mut driver = build_loop(MockBackend::default());
        driver.start().await.unwrap();

        driver.stop().await.unwrap();
        assert!(matches!(driver.stop().await, Err(LoopError::NotRunning)));
    }

    #[tokio::test]
    async fn stale_response_after_stop_mutates_nothing() {
        let mut driver = build_loop(MockBackend::default());
        driver.start().await.unwrap();
        let session = driver.ctx.session_id.clone().unwrap();

        driver.stop().await.unwrap();
        driver
            .apply_result(&session, vec![drowsy()], Instant::now())
            .await;

        let snapshot = driver.snapshot();
        assert_eq!(snapshot.total_detections, 0);
        assert!(!snapshot.alarm_active);
        assert!(snapshot.top_detection.is_none());
    }

    #[tokio::test]
    async fn response_for_another_session_is_discarded() {
        let mut driver = build_loop(MockBackend::default());
        driver.start().await.unwrap();

        driver
            .apply_result(&SessionId::new("other"), vec![awake()], Instant::now())
            .await;

        assert_eq!(driver.snapshot().awake_count, 0);
    }

    #[tokio::test]
    async fn sustained_drowsiness_counts_once_and_alarms_once() {
        let backend = MockBackend::default();
        let pushes = backend.stats_pushes.clone();
        let mut driver = build_loop(backend);
        driver.start().await.unwrap();
        let session = driver.ctx.session_id.clone().unwrap();
        let t0 = Instant::now();

        for s in 0..5 {
            driver
                .apply_result(&session, vec![drowsy()], t0 + Duration::from_secs(s))
                .await;
            assert_eq!(driver.snapshot().drowsiness_count, 0, "no count before 5s");
            assert!(!driver.is_alarm_active(), "no alarm before trigger");
        }

        driver
            .apply_result(&session, vec![drowsy()], t0 + Duration::from_secs(5))
            .await;
        assert_eq!(driver.snapshot().drowsiness_count, 1);
        assert!(driver.is_alarm_active());
        assert_eq!(pushes.lock().unwrap().len(), 1);

        driver
            .apply_result(&session, vec![drowsy()], t0 + Duration::from_secs(6))
            .await;
        assert_eq!(driver.snapshot().drowsiness_count, 1, "episode counts once");
        assert_eq!(pushes.lock().unwrap().len(), 1, "no duplicate flush");
        assert!(driver.is_alarm_active());
    }

    #[tokio::test]
    async fn awake_frames_count_per_frame_and_flush_each_time() {
        let backend = MockBackend::default();
        let pushes = backend.stats_pushes.clone();
        let mut driver = build_loop(backend);
        driver.start().await.unwrap();
        let session = driver.ctx.session_id.clone().unwrap();

        driver
            .apply_result(&session, vec![awake()], Instant::now())
            .await;
        driver
            .apply_result(&session, vec![awake()], Instant::now())
            .await;

        let snapshot = driver.snapshot();
        assert_eq!(snapshot.awake_count, 2);
        assert_eq!(snapshot.total_detections, 2);
        assert_eq!(pushes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_detections_read_as_normal_and_end_episodes() {
        let mut driver = build_loop(MockBackend::default());
        driver.start().await.unwrap();
        let session = driver.ctx.session_id.clone().unwrap();
        let t0 = Instant::now();

        driver.apply_result(&session, vec![drowsy()], t0).await;
        assert!(driver.ctx.episode.in_episode());

        driver
            .apply_result(&session, Vec::new(), t0 + Duration::from_secs(1))
            .await;
        assert!(!driver.ctx.episode.in_episode());
        assert_eq!(
            driver.snapshot().top_detection.unwrap().class,
            DetectionClass::Normal
        );
        assert_eq!(driver.snapshot().total_detections, 0);
    }

    #[tokio::test]
    async fn disabled_alarm_never_sounds() {
        let mut driver = build_loop(MockBackend::default());
        driver.start().await.unwrap();
        driver.ctx.settings.enabled = false;
        let session = driver.ctx.session_id.clone().unwrap();
        let t0 = Instant::now();

        for s in 0..=8 {
            driver
                .apply_result(&session, vec![drowsy()], t0 + Duration::from_secs(s))
                .await;
        }
        assert!(!driver.is_alarm_active());
        // Statistics still count the episode even with the alarm muted.
        assert_eq!(driver.snapshot().drowsiness_count, 1);
    }

    #[tokio::test]
    async fn interrupt_notifies_backend_in_background() {
        let backend = MockBackend::default();
        let interrupted = backend.interrupted.clone();
        let log = backend.log.clone();
        let mut driver = build_loop(backend);

        driver.start().await.unwrap();
        driver.interrupt();

        assert_eq!(driver.state(), LoopState::Idle);
        assert_eq!(
            interrupted.lock().unwrap().clone(),
            vec![SessionId::new("sess-1")]
        );
        assert!(log.lock().unwrap().contains(&"release".to_string()));
        // No awaited stop-session call on the interrupt path.
        assert!(!log.lock().unwrap().contains(&"stop_session".to_string()));
    }

    #[tokio::test]
    async fn stop_alarm_requires_a_fresh_trigger_period() {
        let mut driver = build_loop(MockBackend::default());
        driver.start().await.unwrap();
        let session = driver.ctx.session_id.clone().unwrap();
        let t0 = Instant::now();

        for s in 0..=5 {
            driver
                .apply_result(&session, vec![drowsy()], t0 + Duration::from_secs(s))
                .await;
        }
        assert!(driver.is_alarm_active());

        driver.stop_alarm();
        assert!(!driver.is_alarm_active());

        // Still drowsy, but the silenced alarm must not come straight back.
        for s in 6..=10 {
            driver
                .apply_result(&session, vec![drowsy()], t0 + Duration::from_secs(s))
                .await;
            assert!(!driver.is_alarm_active(), "alarm re-fired too early (t={s})");
        }

        driver
            .apply_result(&session, vec![drowsy()], t0 + Duration::from_secs(11))
            .await;
        assert!(driver.is_alarm_active(), "alarm fires after a full new trigger period");
    }

    #[tokio::test]
    async fn volume_change_reaches_a_sounding_alarm() {
        let mut driver = build_loop(MockBackend::default());
        driver.start().await.unwrap();
        let session = driver.ctx.session_id.clone().unwrap();
        let t0 = Instant::now();

        for s in 0..=5 {
            driver
                .apply_result(&session, vec![drowsy()], t0 + Duration::from_secs(s))
                .await;
        }
        assert!(driver.is_alarm_active());

        driver.set_volume(0.2).await;
        assert!(driver.is_alarm_active(), "refresh must not restart or stop playback");
        assert_eq!(driver.ctx.settings.volume, 0.2);
    }

    #[tokio::test]
    async fn trigger_change_mid_session_applies_to_running_episode() {
        let mut driver = build_loop(MockBackend::default());
        driver.start().await.unwrap();
        let session = driver.ctx.session_id.clone().unwrap();
        let t0 = Instant::now();

        driver.apply_result(&session, vec![drowsy()], t0).await;
        driver
            .apply_result(&session, vec![drowsy()], t0 + Duration::from_secs(2))
            .await;
        assert!(!driver.is_alarm_active());

        driver.set_trigger_seconds(2).await;
        driver
            .apply_result(&session, vec![drowsy()], t0 + Duration::from_secs(3))
            .await;
        assert!(driver.is_alarm_active(), "lowered trigger applies without timer reset");
    }
}
