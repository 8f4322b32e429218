use anyhow::{Context, Result};
use artmark_core::recipe::AdapterConfig;
use serde::Serialize;

use super::require_exists;
use crate::args::RecipeArgs;
use crate::config::ArtmarkConfig;

#[derive(Serialize)]
struct Recipe<'a> {
    lora: &'a artmark_core::recipe::LoraRecipe,
    training: &'a artmark_core::recipe::TrainingRecipe,
}

/// Human-readable report on the recipe and, optionally, a trained adapter.
pub(crate) fn describe(
    config: &ArtmarkConfig,
    dataset_size: Option<usize>,
    adapter: Option<&AdapterConfig>,
) -> Result<String> {
    let mut out = toml::to_string_pretty(&Recipe {
        lora: &config.lora,
        training: &config.training,
    })?;
    out.push('\n');
    out.push_str(&format!("scaling = {:.4}\n", config.lora.scaling()));
    out.push_str(&format!(
        "effective_batch_size = {}\n",
        config.training.effective_batch_size()
    ));
    if let Some(n) = dataset_size {
        out.push_str(&format!(
            "total_steps = {} (for {n} examples)\n",
            config.training.total_steps(n)
        ));
    }

    if let Some(adapter) = adapter {
        let mismatches = adapter.compare(&config.lora);
        if mismatches.is_empty() {
            out.push_str("\nadapter matches the recipe\n");
        } else {
            out.push_str("\nadapter differs from the recipe:\n");
            for line in mismatches {
                out.push_str(&format!("  {line}\n"));
            }
        }
    }
    Ok(out)
}

pub fn run_recipe(args: RecipeArgs, config: ArtmarkConfig) -> Result<()> {
    let adapter = match &args.adapter {
        Some(dir) => {
            require_exists(dir, "Adapter directory")?;
            Some(AdapterConfig::load(dir).with_context(|| {
                format!("Failed to read adapter_config.json in {}", dir.display())
            })?)
        }
        None => None,
    };
    print!("{}", describe(&config, args.dataset_size, adapter.as_ref())?);
    Ok(())
}
