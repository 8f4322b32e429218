use anyhow::{Context, Result};
use artmark_vision::{FontBook, WatermarkGenerator, WatermarkOptions};
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use super::require_exists;
use crate::args::WatermarkArgs;

pub fn run_watermark(args: WatermarkArgs, quiet: bool) -> Result<()> {
    require_exists(&args.input, "Input folder")?;

    let fonts = if args.font.is_empty() {
        FontBook::system().context("No usable system font; pass one with --font")?
    } else {
        FontBook::from_paths(&args.font)?
    };
    info!("Using {} fonts", fonts.len());

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let options = WatermarkOptions {
        text: args.text,
        corner: args.corner,
        quiet,
    };
    let mut generator = WatermarkGenerator::new(fonts, rng, options);
    let summary = generator.process_folder(&args.input, &args.output, args.kind, args.max_images)?;
    info!(
        "Watermarked {} of {} images into {}",
        summary.successful,
        summary.total_images,
        args.output.display()
    );
    Ok(())
}
