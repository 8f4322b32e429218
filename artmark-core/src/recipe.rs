//! The LoRA fine-tuning recipe.
//!
//! Training itself runs in an external trainer; this module owns the
//! configuration it is driven by, validates it, derives the numbers people
//! usually compute by hand, and checks a trained adapter against it.

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    io::read_json,
};

/// Which bias terms are trained alongside the adapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoraBias {
    #[default]
    None,
    All,
    LoraOnly,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoraRecipe {
    pub base_model: String,
    pub load_in_4bit: bool,
    pub finetune_vision_layers: bool,
    pub finetune_language_layers: bool,
    pub finetune_attention_modules: bool,
    pub finetune_mlp_modules: bool,
    pub r: usize,
    pub lora_alpha: f64,
    pub lora_dropout: f32,
    pub bias: LoraBias,
    pub use_rslora: bool,
    pub random_state: u64,
}

impl Default for LoraRecipe {
    fn default() -> Self {
        Self {
            base_model: "unsloth/Qwen2.5-VL-7B-Instruct-bnb-4bit".to_string(),
            load_in_4bit: true,
            finetune_vision_layers: true,
            finetune_language_layers: true,
            finetune_attention_modules: true,
            finetune_mlp_modules: true,
            r: 16,
            lora_alpha: 16.0,
            lora_dropout: 0.0,
            bias: LoraBias::None,
            use_rslora: false,
            random_state: 3407,
        }
    }
}

impl LoraRecipe {
    pub fn validate(&self) -> Result<()> {
        if self.r == 0 {
            return Err(Error::Config("lora.r must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.lora_dropout) {
            return Err(Error::Config(format!(
                "lora.lora_dropout must be in [0, 1), got {}",
                self.lora_dropout
            )));
        }
        if !self.lora_alpha.is_finite() || self.lora_alpha <= 0.0 {
            return Err(Error::Config(format!(
                "lora.lora_alpha must be positive, got {}",
                self.lora_alpha
            )));
        }
        if !(self.finetune_vision_layers || self.finetune_language_layers) {
            return Err(Error::Config(
                "at least one of finetune_vision_layers / finetune_language_layers must be set"
                    .to_string(),
            ));
        }
        if !(self.finetune_attention_modules || self.finetune_mlp_modules) {
            return Err(Error::Config(
                "at least one of finetune_attention_modules / finetune_mlp_modules must be set"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Multiplier applied to the low-rank update: `alpha / r`, or
    /// `alpha / sqrt(r)` with rsLoRA.
    pub fn scaling(&self) -> f64 {
        let r = self.r as f64;
        if self.use_rslora {
            self.lora_alpha / r.sqrt()
        } else {
            self.lora_alpha / r
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingRecipe {
    pub per_device_train_batch_size: usize,
    pub gradient_accumulation_steps: usize,
    pub warmup_steps: usize,
    pub num_train_epochs: Option<usize>,
    pub max_steps: Option<usize>,
    pub learning_rate: f64,
    pub optim: String,
    pub weight_decay: f64,
    pub lr_scheduler_type: String,
    pub seed: u64,
    pub max_seq_length: usize,
    pub output_dir: String,
}

impl Default for TrainingRecipe {
    fn default() -> Self {
        Self {
            per_device_train_batch_size: 2,
            gradient_accumulation_steps: 4,
            warmup_steps: 5,
            num_train_epochs: Some(1),
            max_steps: None,
            learning_rate: 2e-4,
            optim: "adamw_8bit".to_string(),
            weight_decay: 0.01,
            lr_scheduler_type: "linear".to_string(),
            seed: 3407,
            max_seq_length: 2048,
            output_dir: "outputs".to_string(),
        }
    }
}

impl TrainingRecipe {
    pub fn validate(&self) -> Result<()> {
        if self.per_device_train_batch_size == 0 || self.gradient_accumulation_steps == 0 {
            return Err(Error::Config(
                "batch size and gradient accumulation steps must be at least 1".to_string(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::Config(format!(
                "training.learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !self.weight_decay.is_finite() || self.weight_decay < 0.0 {
            return Err(Error::Config(format!(
                "training.weight_decay must be non-negative, got {}",
                self.weight_decay
            )));
        }
        match (self.num_train_epochs, self.max_steps) {
            (None | Some(0), None | Some(0)) => Err(Error::Config(
                "one of training.num_train_epochs / training.max_steps must be set".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Examples consumed per optimizer step.
    pub fn effective_batch_size(&self) -> usize {
        self.per_device_train_batch_size * self.gradient_accumulation_steps
    }

    /// Optimizer steps for a dataset of `dataset_size` examples. `max_steps`
    /// wins over epochs when both are set.
    pub fn total_steps(&self, dataset_size: usize) -> usize {
        if let Some(steps) = self.max_steps.filter(|&s| s > 0) {
            return steps;
        }
        let epochs = self.num_train_epochs.unwrap_or(0);
        dataset_size.div_ceil(self.effective_batch_size()) * epochs
    }
}

/// A trained adapter's `adapter_config.json`, as written by PEFT.
#[derive(Clone, Debug, Deserialize)]
pub struct AdapterConfig {
    #[serde(rename = "r")]
    pub rank: usize,
    #[serde(rename = "lora_alpha")]
    pub alpha: f64,
    #[serde(rename = "lora_dropout", default)]
    pub dropout: Option<f32>,
    #[serde(default)]
    pub target_modules: TargetModules,
    #[serde(default)]
    pub use_rslora: bool,
    #[serde(default)]
    pub bias: Option<LoraBias>,
    #[serde(default)]
    pub base_model_name_or_path: Option<String>,
}

/// PEFT stores targets either as a module-name list or as one regex.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum TargetModules {
    List(HashSet<String>),
    Pattern(String),
}

impl Default for TargetModules {
    fn default() -> Self {
        Self::List(HashSet::new())
    }
}

impl AdapterConfig {
    /// Read `<dir>/adapter_config.json`.
    pub fn load(dir: &Path) -> Result<Self> {
        read_json(&dir.join("adapter_config.json"))
    }

    pub fn scaling(&self) -> f64 {
        let r = self.rank as f64;
        if self.use_rslora {
            self.alpha / r.sqrt()
        } else {
            self.alpha / r
        }
    }

    /// Where the adapter disagrees with `recipe`, one line per field.
    pub fn compare(&self, recipe: &LoraRecipe) -> Vec<String> {
        let mut mismatches = Vec::new();
        if self.rank != recipe.r {
            mismatches.push(format!("r: adapter {} vs recipe {}", self.rank, recipe.r));
        }
        if (self.alpha - recipe.lora_alpha).abs() > f64::EPSILON {
            mismatches.push(format!(
                "lora_alpha: adapter {} vs recipe {}",
                self.alpha, recipe.lora_alpha
            ));
        }
        let dropout = self.dropout.unwrap_or(0.0);
        if (dropout - recipe.lora_dropout).abs() > f32::EPSILON {
            mismatches.push(format!(
                "lora_dropout: adapter {dropout} vs recipe {}",
                recipe.lora_dropout
            ));
        }
        if self.use_rslora != recipe.use_rslora {
            mismatches.push(format!(
                "use_rslora: adapter {} vs recipe {}",
                self.use_rslora, recipe.use_rslora
            ));
        }
        if let Some(bias) = self.bias.filter(|b| *b != recipe.bias) {
            mismatches.push(format!(
                "bias: adapter {bias:?} vs recipe {:?}",
                recipe.bias
            ));
        }
        if let Some(base) = self
            .base_model_name_or_path
            .as_deref()
            .filter(|b| *b != recipe.base_model)
        {
            mismatches.push(format!(
                "base_model: adapter {base} vs recipe {}",
                recipe.base_model
            ));
        }
        mismatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        LoraRecipe::default().validate().unwrap();
        TrainingRecipe::default().validate().unwrap();
    }

    #[test]
    fn scaling() {
        let mut recipe = LoraRecipe {
            r: 16,
            lora_alpha: 32.0,
            ..Default::default()
        };
        assert_eq!(recipe.scaling(), 2.0);
        recipe.use_rslora = true;
        assert_eq!(recipe.scaling(), 8.0);
    }

    #[test]
    fn rejects_bad_lora() {
        let cases = [
            LoraRecipe {
                r: 0,
                ..Default::default()
            },
            LoraRecipe {
                lora_dropout: 1.0,
                ..Default::default()
            },
            LoraRecipe {
                finetune_vision_layers: false,
                finetune_language_layers: false,
                ..Default::default()
            },
            LoraRecipe {
                lora_alpha: f64::NAN,
                ..Default::default()
            },
            LoraRecipe {
                lora_alpha: f64::INFINITY,
                ..Default::default()
            },
            LoraRecipe {
                lora_dropout: f32::NAN,
                ..Default::default()
            },
        ];
        for recipe in cases {
            assert!(recipe.validate().is_err(), "{recipe:?}");
        }
    }

    #[test]
    fn training_steps() {
        let training = TrainingRecipe::default();
        assert_eq!(training.effective_batch_size(), 8);
        assert_eq!(training.total_steps(4000), 500);
        assert_eq!(training.total_steps(4001), 501);

        let capped = TrainingRecipe {
            max_steps: Some(30),
            ..Default::default()
        };
        assert_eq!(capped.total_steps(4000), 30);

        let neither = TrainingRecipe {
            num_train_epochs: None,
            ..Default::default()
        };
        assert!(neither.validate().is_err());

        let bad_lr = TrainingRecipe {
            learning_rate: 0.0,
            ..Default::default()
        };
        assert!(bad_lr.validate().is_err());

        for training in [
            TrainingRecipe {
                learning_rate: f64::NAN,
                ..Default::default()
            },
            TrainingRecipe {
                weight_decay: f64::NAN,
                ..Default::default()
            },
            TrainingRecipe {
                weight_decay: f64::INFINITY,
                ..Default::default()
            },
        ] {
            assert!(training.validate().is_err(), "{training:?}");
        }
    }

    #[test]
    fn recipe_from_toml() {
        let recipe: LoraRecipe = toml::from_str("r = 8\nlora_alpha = 16\nbias = \"lora_only\"").unwrap();
        assert_eq!(recipe.r, 8);
        assert_eq!(recipe.bias, LoraBias::LoraOnly);
        assert!(recipe.finetune_vision_layers);
    }

    #[test]
    fn adapter_comparison() {
        let adapter: AdapterConfig = serde_json::from_str(
            r#"{"r": 16, "lora_alpha": 16, "lora_dropout": 0.0, "bias": "none",
                "target_modules": "(?:.*?(?:language|text).*?(?:self_attn|mlp).*?)",
                "base_model_name_or_path": "unsloth/Qwen2.5-VL-7B-Instruct-bnb-4bit",
                "peft_type": "LORA"}"#,
        )
        .unwrap();
        assert!(matches!(adapter.target_modules, TargetModules::Pattern(_)));
        assert!(adapter.compare(&LoraRecipe::default()).is_empty());

        let recipe = LoraRecipe {
            r: 32,
            ..Default::default()
        };
        assert_eq!(adapter.compare(&recipe), vec!["r: adapter 16 vs recipe 32".to_string()]);
    }

    #[test]
    fn adapter_target_list() {
        let adapter: AdapterConfig = serde_json::from_str(
            r#"{"r": 8, "lora_alpha": 16, "target_modules": ["q_proj", "v_proj"]}"#,
        )
        .unwrap();
        let TargetModules::List(modules) = &adapter.target_modules else {
            panic!("expected a module list");
        };
        assert!(modules.contains("q_proj"));
        assert_eq!(adapter.scaling(), 2.0);
    }
}
