//! CLI argument definitions for the `artmark` binary.

mod dataset;
mod model;

pub use dataset::*;
pub use model::*;

use artmark_vision::{Corner, WatermarkKind};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Annotate artwork images with a fine-tuned vision-language model
#[derive(Parser)]
#[command(name = "artmark")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalOptions,
}

/// Options shared by every subcommand
#[derive(Args, Clone, Default)]
pub struct GlobalOptions {
    /// Configuration file (.toml) with [model], [generation], [embedding], [lora] and [training] tables
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Hide progress bars
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the model on one image, a folder, or a conversation-format test set
    Infer(InferArgs),

    /// Score predictions against a conversation-format split
    Evaluate(EvaluateArgs),

    /// Dataset curation
    Dataset {
        #[command(subcommand)]
        cmd: DatasetCommand,
    },

    /// Draw synthetic watermarks onto a folder of images
    Watermark(WatermarkArgs),

    /// Show the LoRA recipe and check a trained adapter against it
    Recipe(RecipeArgs),
}

/// Exactly one input source
#[derive(Args, Clone, Debug)]
#[group(required = true, multiple = false)]
pub struct InferInput {
    /// A single image; the output is one JSON object
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Every image directly inside this folder; the output is a list
    #[arg(long)]
    pub folder: Option<PathBuf>,

    /// A conversation-format split (test.json); every image part is annotated
    #[arg(long)]
    pub test_set: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct InferArgs {
    #[command(flatten)]
    pub input: InferInput,

    /// Where to write the predictions (JSON)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Directory relative test-set image paths are resolved against
    #[arg(long)]
    pub image_root: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelOverrides,

    #[command(flatten)]
    pub generation: GenerationOverrides,
}

#[derive(Args, Clone, Debug)]
pub struct EvaluateArgs {
    /// Conversation-format split holding the ground truth
    #[arg(long)]
    pub ground_truth: PathBuf,

    /// Predictions written by `artmark infer`
    #[arg(long)]
    pub predictions: PathBuf,

    /// Where to write the evaluation report (JSON)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Sentence-transformers model used for the main-object similarity
    #[arg(long)]
    pub embedding_model: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct WatermarkArgs {
    /// Folder of source images
    #[arg(short, long)]
    pub input: PathBuf,

    /// Folder for watermarked images and their sidecars
    #[arg(short, long)]
    pub output: PathBuf,

    /// Watermark kind: text, diagonal, corner, stamp, logo, grid, barcode or random
    #[arg(short, long, default_value = "random")]
    pub kind: WatermarkKind,

    /// Fixed watermark text instead of a random pick
    #[arg(long)]
    pub text: Option<String>,

    /// Corner for `corner` watermarks: top-left, top-right, bottom-left, bottom-right or random
    #[arg(long, default_value = "random")]
    pub corner: Corner,

    /// Process at most this many images
    #[arg(long)]
    pub max_images: Option<usize>,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Font files to use instead of the system fonts; may be repeated
    #[arg(long)]
    pub font: Vec<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct RecipeArgs {
    /// Trained adapter directory holding adapter_config.json
    #[arg(long)]
    pub adapter: Option<PathBuf>,

    /// Number of training examples, to compute the optimizer step count
    #[arg(long)]
    pub dataset_size: Option<usize>,
}
