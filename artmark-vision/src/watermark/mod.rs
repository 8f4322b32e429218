//! Synthetic watermark augmentation.
//!
//! [`WatermarkGenerator::apply_watermark`] draws one watermark kind onto an
//! image and writes `<stem>.png` plus a `<stem>.json` sidecar describing every
//! text mark. The sidecars are later merged into training records.

mod draw;
mod kinds;

use std::{
    collections::BTreeMap,
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use artmark_core::{
    dataset::{ImageSize, WatermarkInfo, WatermarkSidecar},
    io::write_json_pretty,
};
use chrono::Local;
use image::{DynamicImage, RgbaImage};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    fonts::FontBook,
    images::discover_images,
    progress::IterWithProgress,
};
use draw::blend;
use kinds::Layer;

/// Images below this size on either side are skipped.
pub const MIN_IMAGE_SIDE: u32 = 100;

pub const SUMMARY_FILE: &str = "watermark_summary.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    Text,
    Diagonal,
    Corner,
    Stamp,
    Logo,
    Grid,
    Barcode,
    /// Resolved per image to one of [`WatermarkKind::RANDOM_POOL`].
    Random,
}

impl WatermarkKind {
    pub const ALL: [WatermarkKind; 8] = [
        Self::Text,
        Self::Diagonal,
        Self::Corner,
        Self::Stamp,
        Self::Logo,
        Self::Grid,
        Self::Barcode,
        Self::Random,
    ];

    /// Kinds `random` chooses from; all of them carry legible text.
    pub const RANDOM_POOL: [WatermarkKind; 4] = [Self::Text, Self::Corner, Self::Logo, Self::Stamp];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Diagonal => "diagonal",
            Self::Corner => "corner",
            Self::Stamp => "stamp",
            Self::Logo => "logo",
            Self::Grid => "grid",
            Self::Barcode => "barcode",
            Self::Random => "random",
        }
    }

    fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        match self {
            Self::Random => *Self::RANDOM_POOL.choose(rng).unwrap_or(&Self::Text),
            kind => kind,
        }
    }
}

impl Display for WatermarkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatermarkKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown watermark kind `{s}`, expected one of {}", names.join(", "))
            })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    #[default]
    Random,
}

impl Corner {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::Random => "random",
        }
    }
}

impl FromStr for Corner {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        [
            Self::TopLeft,
            Self::TopRight,
            Self::BottomLeft,
            Self::BottomRight,
            Self::Random,
        ]
        .into_iter()
        .find(|c| c.as_str() == s.trim())
        .ok_or_else(|| format!("unknown corner `{s}`"))
    }
}

#[derive(Clone, Debug, Default)]
pub struct WatermarkOptions {
    /// Fixed text instead of a random pick.
    pub text: Option<String>,
    pub corner: Corner,
    /// Disable progress bars.
    pub quiet: bool,
}

/// Files written for one watermarked image.
#[derive(Clone, Debug)]
pub struct WatermarkOutput {
    pub image_path: PathBuf,
    pub sidecar_path: PathBuf,
    pub sidecar: WatermarkSidecar,
}

/// Written to `watermark_summary.json` after a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkSummary {
    pub processing_date: String,
    pub input_folder: String,
    pub output_folder: String,
    pub total_images: usize,
    pub successful: usize,
    pub failed: usize,
    pub watermark_types: BTreeMap<String, usize>,
}

pub struct WatermarkGenerator<R> {
    fonts: FontBook,
    rng: R,
    options: WatermarkOptions,
}

impl<R: Rng> WatermarkGenerator<R> {
    pub fn new(fonts: FontBook, rng: R, options: WatermarkOptions) -> Self {
        Self {
            fonts,
            rng,
            options,
        }
    }

    /// Draw `kind` on a transparent layer of the given size. `Random` is
    /// resolved first; the returned kind is the one drawn.
    pub fn render(
        &mut self,
        kind: WatermarkKind,
        width: u32,
        height: u32,
    ) -> (WatermarkKind, RgbaImage, WatermarkInfo) {
        let kind = kind.resolve(&mut self.rng);
        let text = self.options.text.as_deref();
        let mut layer = Layer::new(width, height, &self.fonts, &mut self.rng);
        let info = match kind {
            WatermarkKind::Text | WatermarkKind::Random => layer.text(text),
            WatermarkKind::Diagonal => layer.diagonal(text),
            WatermarkKind::Corner => layer.corner(text, self.options.corner),
            WatermarkKind::Stamp => layer.stamp(text),
            WatermarkKind::Logo => layer.logo(text),
            WatermarkKind::Grid => layer.grid(text),
            WatermarkKind::Barcode => layer.barcode(text),
        };
        (kind, layer.image, info)
    }

    /// Watermark one image into `out_dir`. Returns `None` when the image is
    /// too small to mark.
    pub fn apply_watermark(
        &mut self,
        image_path: &Path,
        out_dir: &Path,
        kind: WatermarkKind,
    ) -> Result<Option<WatermarkOutput>> {
        let mut image = image::open(image_path)
            .map_err(|e| Error::image(image_path, e))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        if width < MIN_IMAGE_SIDE || height < MIN_IMAGE_SIDE {
            warn!("Skipping {} - image too small", image_path.display());
            return Ok(None);
        }

        let (_, layer, info) = self.render(kind, width, height);
        blend(&mut image, &layer, 0, 0);
        let marked = DynamicImage::ImageRgba8(image).to_rgb8();

        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let output_name = format!("{stem}.png");
        let output_path = out_dir.join(&output_name);
        std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;
        marked
            .save(&output_path)
            .map_err(|e| Error::image(&output_path, e))?;

        let sidecar = WatermarkSidecar {
            source_image: image_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| output_name.clone()),
            output_image: Some(output_name),
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            image_size: ImageSize { width, height },
            style: None,
            watermark: info,
        };
        let sidecar_path = out_dir.join(format!("{stem}.json"));
        write_json_pretty(&sidecar_path, &sidecar)?;

        Ok(Some(WatermarkOutput {
            image_path: output_path,
            sidecar_path,
            sidecar,
        }))
    }

    /// Watermark every image directly inside `input`, in path order.
    ///
    /// Failures on single images are logged and counted; the summary is
    /// written to `out_dir/watermark_summary.json` and returned.
    pub fn process_folder(
        &mut self,
        input: &Path,
        out_dir: &Path,
        kind: WatermarkKind,
        max_images: Option<usize>,
    ) -> Result<WatermarkSummary> {
        let mut images = discover_images(input)?;
        std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;

        if images.is_empty() {
            warn!("No images found in {}", input.display());
        } else {
            info!("Found {} images in {}", images.len(), input.display());
        }
        if let Some(max) = max_images {
            if images.len() > max {
                images.truncate(max);
                info!("Processing first {max} images");
            }
        }

        let mut successful = 0;
        let mut failed = 0;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let quiet = self.options.quiet;
        for path in images.iter().with_progress(quiet) {
            let current = kind.resolve(&mut self.rng);
            match self.apply_watermark(path, out_dir, current) {
                Ok(Some(_)) => {
                    successful += 1;
                    *counts.entry(current.to_string()).or_default() += 1;
                }
                Ok(None) => failed += 1,
                Err(e) => {
                    warn!("Error processing {}: {e}", path.display());
                    failed += 1;
                }
            }
        }

        info!("Processing complete: {successful} watermarked, {failed} failed");
        for (kind, count) in &counts {
            info!("  {kind}: {count}");
        }

        let summary = WatermarkSummary {
            processing_date: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            input_folder: input.display().to_string(),
            output_folder: out_dir.display().to_string(),
            total_images: images.len(),
            successful,
            failed,
            watermark_types: counts,
        };
        write_json_pretty(&out_dir.join(SUMMARY_FILE), &summary)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in WatermarkKind::ALL {
            assert_eq!(kind.as_str().parse::<WatermarkKind>().unwrap(), kind);
        }
        assert_eq!("LOGO".parse::<WatermarkKind>().unwrap(), WatermarkKind::Logo);
        assert!("wave".parse::<WatermarkKind>().is_err());
        assert_eq!("top-left".parse::<Corner>().unwrap(), Corner::TopLeft);
    }

    #[test]
    fn random_resolves_to_text_kinds() {
        let mut rng = rand::rngs::mock::StepRng::new(0, 1 << 60);
        for _ in 0..20 {
            let kind = WatermarkKind::Random.resolve(&mut rng);
            assert!(WatermarkKind::RANDOM_POOL.contains(&kind));
        }
        assert_eq!(
            WatermarkKind::Grid.resolve(&mut rng),
            WatermarkKind::Grid
        );
    }
}
