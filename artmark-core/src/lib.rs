//! Core types and pure logic for artwork annotation.
//!
//! This crate holds everything that does not need a model loaded: the
//! prediction schema, the extraction of that schema from free-text
//! generations, the evaluation metrics, dataset curation helpers and the
//! LoRA recipe. Model-facing code lives in the `artmark` crate.

mod error;
mod logging;

pub mod conversation;
pub mod dataset;
pub mod eval;
pub mod extract;
pub mod io;
pub mod metrics;
pub mod prompt;
pub mod recipe;
pub mod schema;
pub mod styles;

pub use error::{Error, Result};
pub use eval::{evaluate_dataset, evaluate_example, EvaluationReport, TextEmbedder};
pub use extract::{extract_prediction, Extraction};
pub use logging::initialize_logging;
pub use schema::{Annotation, GroundTruth, Prediction};
pub use styles::{StyleLabel, StyleRef};
