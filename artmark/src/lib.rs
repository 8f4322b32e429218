//! Model-facing side of artmark.
//!
//! [`Annotator`] runs a [`VisionBackend`] once per image and parses each
//! generation into a [`Prediction`]. [`MistralRsBackend`] serves the
//! fine-tuned Qwen2.5-VL model in-process; [`SentenceEmbedder`] provides
//! the sentence embeddings used to score the main object.

mod backend;
mod embedder;
mod pipeline;

pub use backend::{GenerationConfig, MistralRsBackend, ModelConfig, VisionBackend};
pub use embedder::{EmbeddingConfig, SentenceEmbedder};
pub use pipeline::{load_predictions, Annotator, PredictionOutput};

pub use artmark_core::{Annotation, Prediction};
