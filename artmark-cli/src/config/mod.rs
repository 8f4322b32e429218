//! Configuration file loading for the `artmark` binary.
//!
//! Every table is optional and every field has a default, so an empty file
//! (or no file at all) describes the stock setup. Command-line flags are
//! applied on top of whatever the file says.

use anyhow::{Context, Result};
use artmark::{EmbeddingConfig, GenerationConfig, ModelConfig};
use artmark_core::recipe::{LoraRecipe, TrainingRecipe};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtmarkConfig {
    pub model: ModelConfig,
    pub generation: GenerationConfig,
    pub embedding: EmbeddingConfig,
    pub lora: LoraRecipe,
    pub training: TrainingRecipe,
}

impl ArtmarkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.model_id.trim().is_empty() {
            anyhow::bail!("model.model_id must not be empty");
        }
        if self.embedding.model_id.trim().is_empty() {
            anyhow::bail!("embedding.model_id must not be empty");
        }
        self.generation.validate()?;
        self.lora.validate()?;
        self.training.validate()?;
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<ArtmarkConfig> {
    if path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        != Some(true)
    {
        anyhow::bail!("artmark config files must be .toml");
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: ArtmarkConfig =
        toml::from_str(&contents).context("Failed to parse TOML config file")?;
    config
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

/// The file's configuration, or the defaults when no file was given.
pub fn load_or_default(path: Option<&Path>) -> Result<ArtmarkConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ArtmarkConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artmark_core::prompt::PromptKind;

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn empty_file_is_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "artmark.toml", "");
        assert_eq!(load_config(&path).unwrap(), ArtmarkConfig::default());
        assert_eq!(load_or_default(None).unwrap(), ArtmarkConfig::default());
    }

    #[test]
    fn tables_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "artmark.toml",
            r#"
[model]
model_id = "outputs/merged"
isq = "Q4K"

[generation]
max_new_tokens = 256
prompt = "schema"

[lora]
r = 32
lora_alpha = 32.0

[training]
max_steps = 60
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.model.model_id, "outputs/merged");
        assert_eq!(config.generation.max_new_tokens, 256);
        assert_eq!(config.generation.temperature, 0.1);
        assert_eq!(config.generation.prompt, PromptKind::Schema);
        assert_eq!(config.lora.r, 32);
        assert_eq!(config.training.total_steps(10_000), 60);
        assert_eq!(
            config.embedding.model_id,
            "sentence-transformers/all-MiniLM-L6-v2"
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.toml", "[lora]\nr = 0\n");
        assert!(load_config(&path).is_err());
        let path = write(dir.path(), "bad2.toml", "[generation]\ntemperature = -0.5\n");
        assert!(load_config(&path).is_err());
        let path = write(dir.path(), "typo.toml", "[modle]\nmodel_id = \"x\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn only_toml_files_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "artmark.json", "{}");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains(".toml"));
    }
}
