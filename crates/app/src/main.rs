//! DrowsyGuard Client - Main Entry Point

mod config;

use crate::config::AppConfig;
use alarm::AlarmController;
use anyhow::Context;
use backend_client::HttpBackend;
use detection_loop::DetectionLoop;
use frame_source::TestPatternSource;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("=== DrowsyGuard client v{} ===", env!("CARGO_PKG_VERSION"));

    let backend = HttpBackend::new(cfg.backend_url.as_str(), cfg.auth_token.as_str())
        .context("building backend client")?;
    let frames = TestPatternSource::new(cfg.camera_width, cfg.camera_height);
    let alarm = AlarmController::new(cfg.sound_dir.as_str());

    let mut driver = DetectionLoop::new(
        backend,
        frames,
        alarm,
        Duration::from_millis(cfg.tick_ms),
    );

    driver.start().await.context("starting detection session")?;
    info!("detection running; press Ctrl-C to stop");

    tokio::select! {
        _ = driver.run() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "ctrl-c handler failed");
            }
        }
    }

    if let Err(e) = driver.stop().await {
        warn!(error = %e, "backend did not record the stop; local state is clean");
    }

    let summary = driver.snapshot();
    info!(
        duration = %summary.duration_display,
        total = summary.total_detections,
        drowsiness = summary.drowsiness_count,
        awake = summary.awake_count,
        yawn = summary.yawn_count,
        "session summary"
    );

    Ok(())
}
