//! Alarm settings shared with the backend settings endpoint

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Allowed range for the alarm trigger time (seconds)
pub const TRIGGER_SECONDS_MIN: u32 = 1;
pub const TRIGGER_SECONDS_MAX: u32 = 10;

/// Alarm sound selection: the bundled default or a user-uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SoundResource {
    #[default]
    Default,
    Named(String),
}

impl From<String> for SoundResource {
    fn from(value: String) -> Self {
        if value.is_empty() || value == "default" {
            SoundResource::Default
        } else {
            SoundResource::Named(value)
        }
    }
}

impl From<SoundResource> for String {
    fn from(value: SoundResource) -> Self {
        match value {
            SoundResource::Default => "default".to_string(),
            SoundResource::Named(name) => name,
        }
    }
}

/// User alarm configuration.
///
/// Field names mirror the backend's `/settings/alarm` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmSettings {
    #[serde(rename = "triggerTime")]
    pub trigger_seconds: u32,

    pub volume: f32,

    #[serde(rename = "alarmSound")]
    pub sound: SoundResource,

    #[serde(rename = "alarmEnabled")]
    pub enabled: bool,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            trigger_seconds: 5,
            volume: 0.8,
            sound: SoundResource::Default,
            enabled: true,
        }
    }
}

impl AlarmSettings {
    /// Clamp fields into their allowed ranges
    pub fn sanitized(mut self) -> Self {
        self.trigger_seconds = self
            .trigger_seconds
            .clamp(TRIGGER_SECONDS_MIN, TRIGGER_SECONDS_MAX);
        self.volume = self.volume.clamp(0.0, 1.0);
        self
    }

    /// Trigger time as a duration
    pub fn trigger_duration(&self) -> Duration {
        Duration::from_secs(self.trigger_seconds as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_clamps_out_of_range_values() {
        let settings = AlarmSettings {
            trigger_seconds: 60,
            volume: 1.7,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(settings.trigger_seconds, TRIGGER_SECONDS_MAX);
        assert_eq!(settings.volume, 1.0);

        let settings = AlarmSettings {
            trigger_seconds: 0,
            volume: -0.2,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(settings.trigger_seconds, TRIGGER_SECONDS_MIN);
        assert_eq!(settings.volume, 0.0);
    }

    #[test]
    fn wire_shape_matches_backend() {
        let json = serde_json::to_value(AlarmSettings::default()).unwrap();
        assert_eq!(json["triggerTime"], 5);
        assert_eq!(json["alarmSound"], "default");
        assert_eq!(json["alarmEnabled"], true);

        let parsed: AlarmSettings =
            serde_json::from_str(r#"{"triggerTime":3,"alarmSound":"siren.mp3"}"#).unwrap();
        assert_eq!(parsed.trigger_seconds, 3);
        assert_eq!(parsed.sound, SoundResource::Named("siren.mp3".into()));
        // Missing fields fall back to defaults
        assert!(parsed.enabled);
    }
}
