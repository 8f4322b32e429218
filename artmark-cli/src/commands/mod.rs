//! Command implementations for the `artmark` binary

mod dataset;
mod evaluate;
mod infer;
mod recipe;
mod watermark;

pub use dataset::{run_merge, run_split, run_subset};
pub use evaluate::run_evaluate;
pub use infer::run_infer;
pub use recipe::run_recipe;
pub use watermark::run_watermark;

use anyhow::Result;
use std::path::Path;

/// Fail early, before anything is written, when an input path is missing.
pub(crate) fn require_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("{what} not found: {}", path.display());
    }
    Ok(())
}
