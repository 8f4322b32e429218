use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::styles::StyleRef;

/// The JSON written next to every watermarked image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSidecar {
    /// File name of the unmarked source image.
    pub source_image: String,
    /// File name of the watermarked image, next to the sidecar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_image: Option<String>,
    pub timestamp: String,
    pub image_size: ImageSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleRef>,
    pub watermark: WatermarkInfo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// What was drawn. Every legible text mark is listed in `watermarks`, so the
/// mark count and the transcription can be recovered for any kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatermarkInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub watermarks: Vec<WatermarkMark>,
    /// Kind-specific parameters (corner, shape, grid size, ...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatermarkMark {
    pub final_text: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub opacity: u8,
}

impl WatermarkInfo {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            watermarks: Vec::new(),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Texts of all marks, joined the way annotations store them.
    pub fn joined_text(&self) -> String {
        self.watermarks
            .iter()
            .map(|m| m.final_text.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
