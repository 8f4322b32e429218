//! Dataset curation: balanced subset selection, merging watermark sidecars
//! with annotations, and splitting into conversation-format files.
//!
//! Records move between the stages as JSON Lines:
//!
//! 1. a catalog of source images ([`CatalogEntry`]) is reduced to a
//!    per-style balanced subset of [`AnnotationEntry`] lines;
//! 2. after watermark synthesis, each image's [`WatermarkSidecar`] is merged
//!    with its tagged annotation into a [`TrainingRecord`];
//! 3. training records are converted to conversations and split into
//!    `train.json`, `val.json` and `test.json`.

mod merge;
mod sidecar;
mod split;
mod subset;

use serde::{Deserialize, Serialize};

use crate::{schema::Annotation, styles::StyleRef};

pub use merge::{build_metadata, merge_annotations, WatermarkRecord};
pub use sidecar::{ImageSize, WatermarkInfo, WatermarkMark, WatermarkSidecar};
pub use split::{split_dataset, write_splits, SplitRatios, Splits};
pub use subset::{select_balanced_subset, write_subset, DEFAULT_MAIN_OBJECT, UNKNOWN_GROUP};

/// One source image with its catalog metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub image_path: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
}

/// A line of the subset / tagged annotation JSONL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub image_path: String,
    pub instruction: String,
    pub output: EntryOutput,
    #[serde(default)]
    pub meta: EntryMeta,
}

/// The annotation part of an [`AnnotationEntry`]. Taggers write the style
/// either as a dataset index or as a name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOutput {
    #[serde(default)]
    pub watermarks: u32,
    #[serde(default)]
    pub text: String,
    #[serde(alias = "main object", alias = "main-object")]
    pub main_object: String,
    #[serde(default)]
    pub style: Option<StyleRef>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub style_raw: Option<String>,
}

/// A merged training record, the input of [`split_dataset`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub image_path: String,
    #[serde(flatten)]
    pub annotation: Annotation,
}
