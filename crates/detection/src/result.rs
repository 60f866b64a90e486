//! Classifier result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification label for one detection.
///
/// Wire labels are the model's class names verbatim (mixed casing included);
/// anything unknown deserializes as `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DetectionClass {
    Drowsiness,
    Awake,
    Yawn,
    #[default]
    Normal,
}

impl From<String> for DetectionClass {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Drowsiness" => DetectionClass::Drowsiness,
            "awake" => DetectionClass::Awake,
            "yawn" => DetectionClass::Yawn,
            _ => DetectionClass::Normal,
        }
    }
}

impl From<DetectionClass> for String {
    fn from(class: DetectionClass) -> Self {
        match class {
            DetectionClass::Drowsiness => "Drowsiness",
            DetectionClass::Awake => "awake",
            DetectionClass::Yawn => "yawn",
            DetectionClass::Normal => "Normal",
        }
        .to_string()
    }
}

/// One classifier output for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(rename = "class")]
    pub class: DetectionClass,

    /// Confidence in 0.0..=1.0
    pub confidence: f32,

    /// Bounding box as [x1, y1, x2, y2] in source-frame pixel space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 4]>,

    /// Display color hint from the backend (BGR)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,

    /// Server-side classification time, shown in the status panel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DetectionResult {
    /// Synthetic result used when the classifier reports no detections
    pub fn normal() -> Self {
        Self {
            class: DetectionClass::Normal,
            confidence: 0.5,
            bbox: None,
            color: None,
            timestamp: None,
        }
    }

    /// Whether the bounding box is drawable (present, non-degenerate)
    pub fn has_valid_bbox(&self) -> bool {
        match self.bbox {
            Some([x1, y1, x2, y2]) => {
                !(x1 == 0.0 && y1 == 0.0 && x2 == 0.0 && y2 == 0.0) && x2 > x1 && y2 > y1
            }
            None => false,
        }
    }
}
