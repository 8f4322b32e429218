//! Per-field scoring functions. All of them are pure.

use similar::TextDiff;

use crate::{
    error::{Error, Result},
    styles::labels_match,
};

/// Mean absolute error between predicted and true watermark counts.
pub fn watermark_mae(predicted: &[u32], truth: &[u32]) -> Result<f64> {
    check_lengths(predicted.len(), truth.len())?;
    let total: u64 = predicted
        .iter()
        .zip(truth)
        .map(|(&p, &t)| u64::from(p.abs_diff(t)))
        .sum();
    Ok(total as f64 / predicted.len() as f64)
}

/// Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rows of the DP table; `prev[j]` is the distance between a[..i] and b[..j].
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Character-level similarity ratio `2 * M / T` in `[0, 1]`, where `M` is
/// the number of matched characters and `T` the total length. Two empty
/// strings are identical.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Cosine similarity of two embeddings, clamped to `[-1, 1]`.
///
/// Zero-norm vectors have no direction; their similarity is `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::Metric(format!(
            "embedding dimensions differ ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    let (mut dot, mut norm_a, mut norm_b) = (0f64, 0f64, 0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32)
}

/// Fraction of predicted style labels matching the truth.
pub fn style_accuracy<P, T>(predicted: &[P], truth: &[T]) -> Result<f64>
where
    P: AsRef<str>,
    T: AsRef<str>,
{
    check_lengths(predicted.len(), truth.len())?;
    let matches = predicted
        .iter()
        .zip(truth)
        .filter(|(p, t)| labels_match(p.as_ref(), t.as_ref()))
        .count();
    Ok(matches as f64 / predicted.len() as f64)
}

/// Case-insensitive exact match of two free-text answers.
pub fn exact_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Arithmetic mean; undefined for an empty slice.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::Metric("mean of an empty set".to_string()));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

fn check_lengths(predicted: usize, truth: usize) -> Result<()> {
    if predicted != truth {
        return Err(Error::Metric(format!(
            "{predicted} predictions for {truth} ground-truth records"
        )));
    }
    if predicted == 0 {
        return Err(Error::Metric("no records to score".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mae_example() {
        assert_eq!(watermark_mae(&[3, 4], &[3, 2]).unwrap(), 1.0);
        assert_eq!(watermark_mae(&[1, 2, 3], &[1, 2, 3]).unwrap(), 0.0);
        assert!(watermark_mae(&[], &[]).is_err());
        assert!(watermark_mae(&[1], &[1, 2]).is_err());
    }

    #[test]
    fn levenshtein_examples() {
        assert_eq!(levenshtein("cat", "car"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("ANNUAL 2", "ANNUAL 2"), 0);
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(normalized_similarity("", ""), 1.0);
        assert_eq!(normalized_similarity("abc", "abc"), 1.0);
        assert_eq!(normalized_similarity("abc", "xyz"), 0.0);
        let s = normalized_similarity("DRAFT 1", "DRAFT 2");
        assert!(s > 0.8 && s < 1.0, "{s}");
    }

    #[test]
    fn cosine_examples() {
        assert!((cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0);
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn style_accuracy_example() {
        let predicted = ["Realism", "baroque", "Cubism", "Pop Art", "Rococo"];
        let truth = ["Realism", "Baroque", "Fauvism", "Pop_Art", "Symbolism"];
        assert_eq!(style_accuracy(&predicted, &truth).unwrap(), 0.6);
    }

    #[test]
    fn exact_match_ignores_case() {
        assert!(exact_match("Girl", " girl "));
        assert!(!exact_match("Girl", "Woman"));
    }
}
