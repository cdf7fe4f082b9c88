//! Inference on a fitted model.

use feature_encoder::FeatureVector;

use crate::{FittedModel, PredictError, label_for};

/// Predicts a 0/1 delay label for each vector, in input order.
///
/// Pure with respect to the model; safe to call concurrently.
///
/// # Errors
///
/// Returns an error if a vector does not match the model's schema width or the
/// classifier returns the wrong number of scores.
pub fn predict(model: &FittedModel, vectors: &[FeatureVector]) -> Result<Vec<u8>, PredictError> {
    if vectors.is_empty() {
        return Ok(Vec::new());
    }

    let expected = model.schema().len();
    if let Some((row, vector)) = vectors
        .iter()
        .enumerate()
        .find(|(_, vector)| vector.len() != expected)
    {
        return Err(PredictError::SchemaMismatch {
            row,
            expected,
            found: vector.len(),
        });
    }

    let scores = model.classifier().predict_proba(vectors);
    if scores.len() != vectors.len() {
        return Err(PredictError::OutputLength {
            expected: vectors.len(),
            found: scores.len(),
        });
    }

    Ok(scores.into_iter().map(label_for).collect())
}
