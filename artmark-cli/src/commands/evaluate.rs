use anyhow::{Context, Result};
use artmark::{load_predictions, SentenceEmbedder};
use artmark_core::{
    conversation::load_ground_truth,
    eval::{evaluate_dataset, pair_by_image, EvaluationReport, TextEmbedder},
    io::write_json_pretty,
};
use std::path::Path;
use tracing::info;

use super::require_exists;
use crate::args::EvaluateArgs;
use crate::config::ArtmarkConfig;

pub(crate) fn evaluate_files<E: TextEmbedder>(
    ground_truth: &Path,
    predictions: &Path,
    embedder: &E,
) -> Result<EvaluationReport> {
    let truth = load_ground_truth(ground_truth)
        .with_context(|| format!("Failed to load ground truth from {}", ground_truth.display()))?;
    let predictions = load_predictions(predictions)?;
    info!(
        "Loaded {} ground-truth records and {} predictions",
        truth.len(),
        predictions.len()
    );
    let pairs = pair_by_image(truth, predictions);
    Ok(evaluate_dataset(&pairs, embedder)?)
}

fn log_summary(report: &EvaluationReport) {
    let s = &report.summary;
    info!("Evaluated {} examples", s.count);
    info!("  watermarks: MAE {:.3}, accuracy {:.3}", s.watermarks_mae, s.watermarks_accuracy);
    info!(
        "  text: Levenshtein {:.2}, similarity {:.3}",
        s.text_levenshtein_distance, s.text_normalized_similarity
    );
    info!(
        "  main object: cosine {:.3}, accuracy {:.3}",
        s.main_object_cosine_similarity, s.main_object_accuracy
    );
    info!("  style: accuracy {:.3}", s.style_accuracy);
}

pub fn run_evaluate(args: EvaluateArgs, mut config: ArtmarkConfig) -> Result<()> {
    require_exists(&args.ground_truth, "Ground truth")?;
    require_exists(&args.predictions, "Predictions")?;
    if let Some(model_id) = args.embedding_model {
        config.embedding.model_id = model_id;
    }

    let embedder = SentenceEmbedder::load(&config.embedding)?;
    let report = evaluate_files(&args.ground_truth, &args.predictions, &embedder)?;
    log_summary(&report);

    write_json_pretty(&args.output, &report)?;
    info!("Saved evaluation report to {}", args.output.display());
    Ok(())
}
