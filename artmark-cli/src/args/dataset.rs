//! Dataset curation subcommands

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Clone, Debug)]
pub enum DatasetCommand {
    /// Pick a style-balanced subset of a catalog and copy its images
    Subset(SubsetArgs),

    /// Merge watermark sidecars with tagged annotations into training records
    Merge(MergeArgs),

    /// Convert training records to conversations and split them
    Split(SplitArgs),
}

#[derive(Args, Clone, Debug)]
pub struct SubsetArgs {
    /// Catalog JSONL: one {image_path, style, artist, genre} object per line
    #[arg(long)]
    pub catalog: PathBuf,

    /// Directory relative catalog image paths are resolved against (defaults to the catalog's directory)
    #[arg(long)]
    pub catalog_root: Option<PathBuf>,

    /// Where the selected images are copied
    #[arg(long)]
    pub image_dir: PathBuf,

    /// Annotation JSONL to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of images to select
    #[arg(long, default_value_t = 1000)]
    pub total: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Args, Clone, Debug)]
pub struct MergeArgs {
    /// Folder written by `artmark watermark`
    #[arg(long)]
    pub watermarks: PathBuf,

    /// Tagged annotation JSONL
    #[arg(long)]
    pub annotations: PathBuf,

    /// Training-record JSONL to write
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct SplitArgs {
    /// Training-record JSONL
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory for train.json, val.json and test.json
    #[arg(short, long)]
    pub output_dir: PathBuf,

    #[arg(long, default_value_t = 0.8)]
    pub train_ratio: f64,

    #[arg(long, default_value_t = 0.1)]
    pub val_ratio: f64,

    #[arg(long, default_value_t = 0.1)]
    pub test_ratio: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
