use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    io::read_json,
    schema::Annotation,
    styles::{StyleRef, UNKNOWN_STYLE},
};

use super::{AnnotationEntry, TrainingRecord, WatermarkSidecar};

/// What a sidecar says about one watermarked image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatermarkRecord {
    /// Path of the watermarked image.
    pub image_path: String,
    pub watermarks: u32,
    pub text: String,
    pub style: String,
}

/// Read every watermark sidecar in `dir`, keyed by source image file name.
///
/// JSON files that are not sidecars (such as the batch summary) are skipped.
pub fn build_metadata(dir: &Path) -> Result<IndexMap<String, WatermarkRecord>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.extension().is_some_and(|e| e == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut metadata = IndexMap::new();
    for path in paths {
        let sidecar: WatermarkSidecar = match read_json(&path) {
            Ok(sidecar) => sidecar,
            Err(Error::Json(e)) => {
                debug!("Skipping `{}`, not a watermark sidecar: {e}", path.display());
                continue;
            }
            Err(e) => return Err(e),
        };

        let image_name = match &sidecar.output_image {
            Some(name) => name.clone(),
            None => Path::new(&sidecar.source_image)
                .with_extension("png")
                .display()
                .to_string(),
        };
        let record = WatermarkRecord {
            image_path: dir.join(image_name).display().to_string(),
            watermarks: sidecar.watermark.watermarks.len() as u32,
            text: sidecar.watermark.joined_text(),
            style: sidecar
                .style
                .as_ref()
                .map(StyleRef::resolve)
                .unwrap_or_else(|| UNKNOWN_STYLE.to_string()),
        };
        metadata.insert(file_name(&sidecar.source_image), record);
    }
    info!("Metadata dictionary built with {} entries", metadata.len());
    Ok(metadata)
}

/// Join tagged annotations with watermark metadata by image file name.
///
/// The watermark count and text come from the sidecar; the main object
/// comes from the annotation, as does the style when the annotation has
/// one. Annotations without a sidecar are dropped.
pub fn merge_annotations(
    metadata: &IndexMap<String, WatermarkRecord>,
    annotations: &[AnnotationEntry],
) -> Vec<TrainingRecord> {
    let merged: Vec<TrainingRecord> = annotations
        .iter()
        .filter_map(|entry| {
            let name = file_name(&entry.image_path);
            let Some(record) = metadata.get(&name) else {
                debug!("No watermark sidecar for `{name}`");
                return None;
            };
            let style = entry
                .output
                .style
                .as_ref()
                .map(StyleRef::resolve)
                .unwrap_or_else(|| record.style.clone());
            Some(TrainingRecord {
                image_path: record.image_path.clone(),
                annotation: Annotation::new(
                    record.watermarks,
                    record.text.clone(),
                    entry.output.main_object.clone(),
                    style,
                ),
            })
        })
        .collect();

    if merged.len() < annotations.len() {
        warn!(
            "{} of {} annotations had no watermark sidecar",
            annotations.len() - merged.len(),
            annotations.len()
        );
    }
    info!("Merged {} annotation records", merged.len());
    merged
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
