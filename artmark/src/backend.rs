use anyhow::{Context, Result};
use artmark_core::prompt::PromptKind;
use image::DynamicImage;
use mistralrs::{parse_isq_value, Model, RequestBuilder, TextMessageRole, VisionModelBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Where the vision-language model comes from and how it is loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Hugging Face model id or local directory holding the merged
    /// fine-tuned weights.
    pub model_id: String,
    /// In-situ quantization applied while loading, e.g. `Q4K` or `Q8_0`.
    pub isq: Option<String>,
    pub revision: Option<String>,
    pub force_cpu: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: "lora_model".to_string(),
            isq: None,
            revision: None,
            force_cpu: false,
        }
    }
}

/// Sampling settings for one generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub prompt: PromptKind,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 128,
            temperature: 0.1,
            prompt: PromptKind::FineTuned,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_new_tokens == 0 {
            anyhow::bail!("`max_new_tokens` must be at least 1");
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            anyhow::bail!(
                "`temperature` must be a non-negative number, got {}",
                self.temperature
            );
        }
        Ok(())
    }
}

/// A model that answers one user turn made of an image and a prompt.
///
/// Calls are awaited one at a time; implementations need not be
/// re-entrant.
#[allow(async_fn_in_trait)]
pub trait VisionBackend {
    async fn generate(
        &self,
        image: DynamicImage,
        prompt: &str,
        generation: &GenerationConfig,
    ) -> Result<String>;
}

/// Qwen2.5-VL served in-process by `mistralrs`.
pub struct MistralRsBackend {
    model: Model,
}

impl MistralRsBackend {
    pub async fn load(config: &ModelConfig) -> Result<Self> {
        // The Qwen2.5-VL architecture is read from the checkpoint's config.json.
        let mut builder = VisionModelBuilder::new(&config.model_id);
        if let Some(isq) = &config.isq {
            let isq = parse_isq_value(isq, None).map_err(anyhow::Error::msg)?;
            builder = builder.with_isq(isq);
        }
        if let Some(revision) = &config.revision {
            builder = builder.with_hf_revision(revision);
        }
        if config.force_cpu {
            builder = builder.with_force_cpu();
        }

        info!("Loading model `{}`", config.model_id);
        let model = builder
            .build()
            .await
            .with_context(|| format!("Failed to load model `{}`", config.model_id))?;
        info!("Model loaded.");
        Ok(Self { model })
    }
}

impl VisionBackend for MistralRsBackend {
    async fn generate(
        &self,
        image: DynamicImage,
        prompt: &str,
        generation: &GenerationConfig,
    ) -> Result<String> {
        let request = RequestBuilder::new()
            .add_image_message(TextMessageRole::User, prompt, vec![image], &self.model)?
            .set_sampler_temperature(generation.temperature)
            .set_sampler_max_len(generation.max_new_tokens);

        let response = self.model.send_chat_request(request).await?;
        debug!(
            "Generation took {:.2} tok/s (prompt), {:.2} tok/s (completion)",
            response.usage.avg_prompt_tok_per_sec, response.usage.avg_compl_tok_per_sec
        );
        let choice = response
            .choices
            .into_iter()
            .next()
            .context("Model returned no choices")?;
        Ok(choice.message.content.unwrap_or_default())
    }
}
