//! Sequential annotation of images.
//!
//! Every image costs one model call; calls are awaited one after another.
//! Folder and test-set runs log and skip images that fail to load or
//! generate, a single-image run fails instead.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use artmark_core::{
    conversation::load_conversations, extract_prediction, io::read_json, io::write_json_pretty,
    Prediction,
};
use artmark_vision::{discover_images, load_rgb, IterWithProgress};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{GenerationConfig, VisionBackend};

pub struct Annotator<B> {
    backend: B,
    generation: GenerationConfig,
    prompt: String,
    quiet: bool,
}

impl<B: VisionBackend> Annotator<B> {
    pub fn new(backend: B, generation: GenerationConfig) -> Self {
        let prompt = generation.prompt.text();
        Self {
            backend,
            generation,
            prompt,
            quiet: false,
        }
    }

    /// Disable progress bars.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Annotate the image at `path`; the prediction's `image` is `label`.
    async fn annotate(&self, path: &Path, label: String) -> Result<Prediction> {
        let image = load_rgb(path)?;
        let raw = self
            .backend
            .generate(image, &self.prompt, &self.generation)
            .await
            .with_context(|| format!("Generation failed for {}", path.display()))?;
        debug!("{}: {raw}", path.display());

        let extraction = extract_prediction(&raw);
        if !extraction.is_complete() {
            warn!(
                "Could not recover every field for {}; keeping the raw output",
                path.display()
            );
        }
        Ok(extraction.into_prediction(&raw).with_image(label))
    }

    pub async fn annotate_one(&self, path: &Path) -> Result<Prediction> {
        if !path.is_file() {
            anyhow::bail!("Image not found: {}", path.display());
        }
        self.annotate(path, path.display().to_string()).await
    }

    /// Annotate every image directly inside `dir`, in path order.
    pub async fn annotate_folder(&self, dir: &Path) -> Result<Vec<Prediction>> {
        let images = discover_images(dir)?;
        if images.is_empty() {
            warn!("No images found in {}", dir.display());
        } else {
            info!("Found {} images in {}", images.len(), dir.display());
        }
        let images = images
            .into_iter()
            .map(|path| {
                let label = path.display().to_string();
                (path, label)
            })
            .collect();
        self.annotate_all(images).await
    }

    /// Annotate every image referenced by a conversation-format split.
    ///
    /// Relative image paths are resolved against `image_root` when given;
    /// predictions keep the path exactly as written in the split so they
    /// pair with its ground truth.
    pub async fn annotate_test_set(
        &self,
        file: &Path,
        image_root: Option<&Path>,
    ) -> Result<Vec<Prediction>> {
        let conversations = load_conversations(file)?;
        let images: Vec<(PathBuf, String)> = conversations
            .iter()
            .flat_map(|c| c.images())
            .map(|image| {
                let path = match image_root {
                    Some(root) if Path::new(image).is_relative() => root.join(image),
                    _ => PathBuf::from(image),
                };
                (path, image.to_string())
            })
            .collect();
        info!(
            "Found {} images in {} conversations",
            images.len(),
            conversations.len()
        );
        self.annotate_all(images).await
    }

    async fn annotate_all(&self, images: Vec<(PathBuf, String)>) -> Result<Vec<Prediction>> {
        let mut predictions = Vec::with_capacity(images.len());
        let mut failed = 0usize;
        for (path, label) in images.into_iter().with_progress(self.quiet) {
            match self.annotate(&path, label).await {
                Ok(prediction) => predictions.push(prediction),
                Err(e) => {
                    warn!("Skipping {}: {e:#}", path.display());
                    failed += 1;
                }
            }
        }
        info!("Annotated {} images, skipped {failed}", predictions.len());
        Ok(predictions)
    }
}

/// What `infer` writes: one object for a single image, a list otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutput {
    Many(Vec<Prediction>),
    One(Prediction),
}

impl PredictionOutput {
    pub fn write(&self, path: &Path) -> Result<()> {
        write_json_pretty(path, self)
            .with_context(|| format!("Failed to write predictions to {}", path.display()))
    }

    pub fn into_vec(self) -> Vec<Prediction> {
        match self {
            Self::One(prediction) => vec![prediction],
            Self::Many(predictions) => predictions,
        }
    }
}

/// Read a predictions file written by `infer`, in either shape.
pub fn load_predictions(path: &Path) -> Result<Vec<Prediction>> {
    let output: PredictionOutput = read_json(path)
        .with_context(|| format!("Failed to read predictions from {}", path.display()))?;
    Ok(output.into_vec())
}
