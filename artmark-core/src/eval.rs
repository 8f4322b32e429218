//! Scoring predictions against ground truth.
//!
//! Each field is scored on its own; there is deliberately no composite
//! score. The main-object metric needs sentence embeddings, which come from
//! an external model behind [`TextEmbedder`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{Error, Result},
    metrics::{
        cosine_similarity, exact_match, levenshtein, mean, normalized_similarity, watermark_mae,
    },
    schema::{Annotation, GroundTruth, Prediction},
    styles::labels_match,
};

/// Something that turns short texts into fixed-size vectors.
pub trait TextEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

impl<E: TextEmbedder + ?Sized> TextEmbedder for &E {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatermarkScore {
    #[serde(rename = "true")]
    pub truth: u32,
    #[serde(rename = "pred")]
    pub predicted: u32,
    pub abs_error: u32,
    pub exact: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextScore {
    #[serde(rename = "true")]
    pub truth: String,
    #[serde(rename = "pred")]
    pub predicted: String,
    pub normalized_similarity: f64,
    pub levenshtein_distance: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MainObjectScore {
    #[serde(rename = "true")]
    pub truth: String,
    #[serde(rename = "pred")]
    pub predicted: String,
    pub cosine_similarity: f32,
    pub exact: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StyleScore {
    #[serde(rename = "true")]
    pub truth: String,
    #[serde(rename = "pred")]
    pub predicted: String,
    pub exact: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExampleReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub watermarks: WatermarkScore,
    pub text: TextScore,
    pub main_object: MainObjectScore,
    pub style: StyleScore,
}

/// Dataset-level means, one per metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub watermarks_mae: f64,
    pub watermarks_accuracy: f64,
    pub text_levenshtein_distance: f64,
    pub text_normalized_similarity: f64,
    pub main_object_cosine_similarity: f64,
    pub main_object_accuracy: f64,
    pub style_accuracy: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub per_example: Vec<ExampleReport>,
    pub summary: Summary,
}

/// Score one prediction. Missing predicted fields score as `0` / empty.
pub fn evaluate_example<E: TextEmbedder>(
    truth: &Annotation,
    prediction: &Prediction,
    embedder: &E,
) -> Result<ExampleReport> {
    let predicted = prediction.scored_annotation();

    let embeddings = embedder.embed(&[&truth.main_object, &predicted.main_object])?;
    let [truth_embedding, predicted_embedding] = embeddings.as_slice() else {
        return Err(Error::embedding(format!(
            "expected 2 embeddings, got {}",
            embeddings.len()
        )));
    };
    let cosine = cosine_similarity(truth_embedding, predicted_embedding)?;

    Ok(ExampleReport {
        image: prediction.image.clone(),
        watermarks: WatermarkScore {
            truth: truth.watermarks,
            predicted: predicted.watermarks,
            abs_error: truth.watermarks.abs_diff(predicted.watermarks),
            exact: truth.watermarks == predicted.watermarks,
        },
        text: TextScore {
            normalized_similarity: normalized_similarity(&truth.text, &predicted.text),
            levenshtein_distance: levenshtein(&truth.text, &predicted.text),
            truth: truth.text.clone(),
            predicted: predicted.text,
        },
        main_object: MainObjectScore {
            cosine_similarity: cosine,
            exact: exact_match(&truth.main_object, &predicted.main_object),
            truth: truth.main_object.clone(),
            predicted: predicted.main_object,
        },
        style: StyleScore {
            exact: labels_match(&truth.style, &predicted.style),
            truth: truth.style.clone(),
            predicted: predicted.style,
        },
    })
}

/// Score every `(truth, prediction)` pair and summarize.
pub fn evaluate_dataset<E: TextEmbedder>(
    pairs: &[(Annotation, Prediction)],
    embedder: &E,
) -> Result<EvaluationReport> {
    if pairs.is_empty() {
        return Err(Error::Metric(
            "no prediction could be paired with ground truth".to_string(),
        ));
    }

    let per_example = pairs
        .iter()
        .map(|(truth, prediction)| evaluate_example(truth, prediction, embedder))
        .collect::<Result<Vec<_>>>()?;

    let truth_counts: Vec<u32> = per_example.iter().map(|r| r.watermarks.truth).collect();
    let predicted_counts: Vec<u32> = per_example.iter().map(|r| r.watermarks.predicted).collect();
    let rate = |hit: fn(&ExampleReport) -> bool| {
        per_example.iter().filter(|r| hit(r)).count() as f64 / per_example.len() as f64
    };
    let mean_of = |value: fn(&ExampleReport) -> f64| {
        mean(&per_example.iter().map(value).collect::<Vec<_>>())
    };

    let summary = Summary {
        count: per_example.len(),
        watermarks_mae: watermark_mae(&predicted_counts, &truth_counts)?,
        watermarks_accuracy: rate(|r| r.watermarks.exact),
        text_levenshtein_distance: mean_of(|r| r.text.levenshtein_distance as f64)?,
        text_normalized_similarity: mean_of(|r| r.text.normalized_similarity)?,
        main_object_cosine_similarity: mean_of(|r| f64::from(r.main_object.cosine_similarity))?,
        main_object_accuracy: rate(|r| r.main_object.exact),
        style_accuracy: rate(|r| r.style.exact),
    };

    Ok(EvaluationReport {
        per_example,
        summary,
    })
}

/// Pair predictions with ground truth by image path, in prediction order.
/// Predictions without an image or without matching ground truth are
/// skipped with a warning.
pub fn pair_by_image(
    ground_truth: Vec<GroundTruth>,
    predictions: Vec<Prediction>,
) -> Vec<(Annotation, Prediction)> {
    let by_image: HashMap<String, Annotation> = ground_truth
        .into_iter()
        .map(|gt| (gt.image, gt.annotation))
        .collect();

    predictions
        .into_iter()
        .filter_map(|prediction| {
            let Some(image) = prediction.image.as_deref() else {
                warn!("Skipping a prediction without an `image` field");
                return None;
            };
            match by_image.get(image) {
                Some(truth) => Some((truth.clone(), prediction)),
                None => {
                    warn!("No ground truth for `{image}`, skipping");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Bag-of-letters embedding: identical strings embed identically.
    struct Letters;

    impl TextEmbedder for Letters {
        fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0f32; 26];
                    for c in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                        v[(c - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    #[test]
    fn perfect_prediction() {
        let truth = Annotation::new(3, "ANNUAL 2", "Girl", "Realism");
        let report = evaluate_example(&truth, &truth.clone().into(), &Letters).unwrap();
        assert_eq!(report.watermarks.abs_error, 0);
        assert!(report.watermarks.exact);
        assert_eq!(report.text.levenshtein_distance, 0);
        assert_eq!(report.text.normalized_similarity, 1.0);
        assert!((report.main_object.cosine_similarity - 1.0).abs() < 1e-6);
        assert!(report.main_object.exact);
        assert!(report.style.exact);
    }

    #[test]
    fn missing_fields_score_as_empty() {
        let truth = Annotation::new(2, "DRAFT 1", "Boat", "Impressionism");
        let prediction = Prediction {
            style: Some("impressionism".into()),
            ..Default::default()
        };
        let report = evaluate_example(&truth, &prediction, &Letters).unwrap();
        assert_eq!(report.watermarks.predicted, 0);
        assert_eq!(report.watermarks.abs_error, 2);
        assert_eq!(report.text.levenshtein_distance, 7);
        assert_eq!(report.main_object.cosine_similarity, 0.0);
        assert!(report.style.exact);
    }

    #[test]
    fn summary_means() {
        let pairs = vec![
            (
                Annotation::new(3, "cat", "Girl", "Realism"),
                Prediction::from(Annotation::new(4, "car", "Girl", "Realism")),
            ),
            (
                Annotation::new(2, "dog", "Tree", "Baroque"),
                Prediction::from(Annotation::new(4, "dog", "Tree", "Rococo")),
            ),
        ];
        let report = evaluate_dataset(&pairs, &Letters).unwrap();
        let summary = &report.summary;
        assert_eq!(summary.count, 2);
        assert_eq!(summary.watermarks_mae, 1.5);
        assert_eq!(summary.watermarks_accuracy, 0.0);
        assert_eq!(summary.text_levenshtein_distance, 0.5);
        assert!((summary.main_object_cosine_similarity - 1.0).abs() < 1e-6);
        assert_eq!(summary.main_object_accuracy, 1.0);
        assert_eq!(summary.style_accuracy, 0.5);
    }

    #[test]
    fn empty_dataset_is_an_error() {
        assert!(evaluate_dataset::<Letters>(&[], &Letters).is_err());
    }

    #[test]
    fn pairing_by_image() {
        let ground_truth = vec![
            GroundTruth {
                image: "a.png".into(),
                annotation: Annotation::new(1, "A", "Apple", "Pop_Art"),
            },
            GroundTruth {
                image: "b.png".into(),
                annotation: Annotation::new(0, "", "Bird", "Ukiyo_e"),
            },
        ];
        let predictions = vec![
            Prediction::from(Annotation::new(0, "", "Bird", "Ukiyo_e")).with_image("b.png"),
            Prediction::from(Annotation::new(0, "", "Cat", "Cubism")).with_image("c.png"),
            Prediction::from(Annotation::new(1, "A", "Apple", "Pop_Art")),
        ];
        let pairs = pair_by_image(ground_truth, predictions);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.main_object, "Bird");
        assert_eq!(pairs[0].1.image.as_deref(), Some("b.png"));
    }

    #[test]
    fn report_uses_true_pred_keys() {
        let truth = Annotation::new(1, "A", "Apple", "Pop_Art");
        let report = evaluate_example(&truth, &truth.clone().into(), &Letters).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["watermarks"]["true"], 1);
        assert_eq!(json["style"]["pred"], "Pop_Art");
    }
}
