//! Application configuration
//!
//! Layered: built-in defaults, then an optional `drowsyguard.toml`, then
//! `DROWSYGUARD_`-prefixed environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Backend API base URL (including the `/api` prefix)
    pub backend_url: String,
    /// Bearer token for the backend
    pub auth_token: String,
    /// Capture width in pixels
    pub camera_width: u32,
    /// Capture height in pixels
    pub camera_height: u32,
    /// Detection loop tick interval (milliseconds)
    pub tick_ms: u64,
    /// Directory holding alarm sound files
    pub sound_dir: String,
    /// tracing filter directive, e.g. "info" or "detection_loop=debug"
    pub log_filter: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("backend_url", "http://localhost:5000/api")?
            .set_default("auth_token", "")?
            .set_default("camera_width", 640_i64)?
            .set_default("camera_height", 480_i64)?
            .set_default("tick_ms", 200_i64)?
            .set_default("sound_dir", "assets/sounds")?
            .set_default("log_filter", "info")?
            .add_source(File::with_name("drowsyguard").required(false))
            .add_source(Environment::with_prefix("DROWSYGUARD"))
            .build()?
            .try_deserialize()
    }
}
