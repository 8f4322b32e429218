//! The four-field annotation record.
//!
//! `main_object` is the canonical key. `"main object"` (used by the first
//! dataset exports) and `"main-object"` are accepted when reading, but every
//! writer emits `main_object`.

use serde::{Deserialize, Serialize};

/// A complete annotation: what ground truth holds and what a clean
/// generation parses into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub watermarks: u32,
    pub text: String,
    #[serde(alias = "main object", alias = "main-object", alias = "mainObject")]
    pub main_object: String,
    pub style: String,
}

impl Annotation {
    pub fn new(
        watermarks: u32,
        text: impl Into<String>,
        main_object: impl Into<String>,
        style: impl Into<String>,
    ) -> Self {
        Self {
            watermarks,
            text: text.into(),
            main_object: main_object.into(),
            style: style.into(),
        }
    }
}

/// One model prediction.
///
/// Fields are `None` (serialized as `null`) when they could not be recovered
/// from the generation; `raw_output` then keeps the generation text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub watermarks: Option<u32>,
    pub text: Option<String>,
    #[serde(alias = "main object", alias = "main-object", alias = "mainObject")]
    pub main_object: Option<String>,
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl Prediction {
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// The complete annotation, if every field was recovered.
    pub fn annotation(&self) -> Option<Annotation> {
        Some(Annotation {
            watermarks: self.watermarks?,
            text: self.text.clone()?,
            main_object: self.main_object.clone()?,
            style: self.style.clone()?,
        })
    }

    /// The annotation used for scoring: missing count scores as `0`, missing
    /// strings score as empty.
    pub fn scored_annotation(&self) -> Annotation {
        Annotation {
            watermarks: self.watermarks.unwrap_or(0),
            text: self.text.clone().unwrap_or_default(),
            main_object: self.main_object.clone().unwrap_or_default(),
            style: self.style.clone().unwrap_or_default(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.watermarks.is_some()
            && self.text.is_some()
            && self.main_object.is_some()
            && self.style.is_some()
    }
}

impl From<Annotation> for Prediction {
    fn from(value: Annotation) -> Self {
        Self {
            image: None,
            watermarks: Some(value.watermarks),
            text: Some(value.text),
            main_object: Some(value.main_object),
            style: Some(value.style),
            raw_output: None,
        }
    }
}

/// Ground truth for one image of an evaluation split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub image: String,
    #[serde(flatten)]
    pub annotation: Annotation,
}
