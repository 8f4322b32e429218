use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use artmark_core::{eval::TextEmbedder, Error};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{api::sync::ApiBuilder, Repo, RepoType};
use serde::{Deserialize, Serialize};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// A sentence-transformers BERT checkpoint, on the Hub or on disk.
    pub model_id: String,
    pub revision: String,
    /// Inputs longer than this many tokens are truncated.
    pub max_length: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            revision: "main".to_string(),
            max_length: 256,
        }
    }
}

/// Sentence embeddings from a BERT encoder: mean pooling over the attention
/// mask followed by L2 normalization.
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

fn resolve_files(config: &EmbeddingConfig) -> Result<ModelFiles> {
    let local = Path::new(&config.model_id);
    if local.is_dir() {
        return Ok(ModelFiles {
            config: local.join("config.json"),
            tokenizer: local.join("tokenizer.json"),
            weights: local.join("model.safetensors"),
        });
    }

    let api = ApiBuilder::new().with_progress(false).build()?;
    let repo = api.repo(Repo::with_revision(
        config.model_id.clone(),
        RepoType::Model,
        config.revision.clone(),
    ));
    let get = |name: &str| {
        repo.get(name)
            .with_context(|| format!("Failed to fetch `{name}` from `{}`", config.model_id))
    };
    Ok(ModelFiles {
        config: get("config.json")?,
        tokenizer: get("tokenizer.json")?,
        weights: get("model.safetensors")?,
    })
}

impl SentenceEmbedder {
    pub fn load(config: &EmbeddingConfig) -> Result<Self> {
        let device = Device::Cpu;
        let files = resolve_files(config)?;
        info!("Loading embedding model `{}`", config.model_id);

        let bert_config = std::fs::read_to_string(&files.config).with_context(|| {
            format!("Failed to read config.json at {}", files.config.display())
        })?;
        let bert_config: BertConfig = serde_json::from_str(&bert_config)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(anyhow::Error::msg)?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(anyhow::Error::msg)?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DTYPE, &device)? };
        let model = BertModel::load(vb, &bert_config)?;
        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(anyhow::Error::msg)?;

        let ids = encodings
            .iter()
            .map(|e| Tensor::new(e.get_ids(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|e| Tensor::new(e.get_attention_mask(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // (batch, seq, hidden) -> (batch, hidden), padding excluded
        let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let pooled = summed.broadcast_div(&mask.sum(1)?)?;
        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        Ok(pooled.broadcast_div(&norm)?.to_vec2::<f32>()?)
    }
}

impl TextEmbedder for SentenceEmbedder {
    fn embed(&self, texts: &[&str]) -> artmark_core::Result<Vec<Vec<f32>>> {
        self.embed_batch(texts).map_err(Error::embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_directory_is_used_without_the_hub() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmbeddingConfig {
            model_id: dir.path().display().to_string(),
            ..Default::default()
        };
        let files = resolve_files(&config).unwrap();
        assert_eq!(files.weights, dir.path().join("model.safetensors"));
        assert!(SentenceEmbedder::load(&config).is_err());
    }
}
