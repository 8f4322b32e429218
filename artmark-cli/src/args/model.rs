//! Flags that override the [model] and [generation] config tables

use artmark::{GenerationConfig, ModelConfig};
use artmark_core::prompt::PromptKind;
use clap::{Args, ValueEnum};

#[derive(Args, Clone, Debug, Default)]
pub struct ModelOverrides {
    /// HuggingFace model ID or local directory with the merged fine-tuned model
    #[arg(short = 'm', long)]
    pub model_id: Option<String>,

    /// In-situ quantization, e.g. Q4K or Q8_0
    #[arg(long)]
    pub isq: Option<String>,

    /// Run on the CPU even when an accelerator is available
    #[arg(long, default_value_t = false)]
    pub cpu: bool,
}

impl ModelOverrides {
    pub fn apply(&self, config: &mut ModelConfig) {
        if let Some(model_id) = &self.model_id {
            config.model_id = model_id.clone();
        }
        if let Some(isq) = &self.isq {
            config.isq = Some(isq.clone());
        }
        if self.cpu {
            config.force_cpu = true;
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PromptArg {
    /// The short instruction the adapter was trained on
    FineTuned,
    /// A long instruction spelling out the schema and style labels
    Schema,
}

impl From<PromptArg> for PromptKind {
    fn from(value: PromptArg) -> Self {
        match value {
            PromptArg::FineTuned => Self::FineTuned,
            PromptArg::Schema => Self::Schema,
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct GenerationOverrides {
    /// Maximum number of generated tokens
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Which instruction to send with each image
    #[arg(long, value_enum)]
    pub prompt: Option<PromptArg>,
}

impl GenerationOverrides {
    pub fn apply(&self, config: &mut GenerationConfig) {
        if let Some(max_tokens) = self.max_tokens {
            config.max_new_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(prompt) = self.prompt {
            config.prompt = prompt.into();
        }
    }
}
