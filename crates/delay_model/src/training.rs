//! Training logic for the delay model.

use chrono::Utc;
use feature_encoder::{FeatureSchema, FeatureVector, encode};
use flight_structs::{RawRecord, TrainingExample};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    ClassificationReport, DelayClassifier, FittedModel, Hyperparameters, ModelMetadata,
    TrainingError, predict,
};

/// Options for the full training pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    /// Fraction of rows held out for evaluation, in `[0, 1)`.
    pub validation_fraction: f64,
    /// Seed for the row shuffle taken before encoding.
    pub shuffle_seed: u64,
    /// Seed for the train/validation split.
    pub split_seed: u64,
    pub hyperparameters: Hyperparameters,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            validation_fraction: 0.33,
            shuffle_seed: 111,
            split_seed: 42,
            hyperparameters: Hyperparameters::default(),
        }
    }
}

/// Label counts of a training set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassBalance {
    pub on_time: usize,
    pub delayed: usize,
}

impl ClassBalance {
    /// Counts labels, requiring both classes to be present.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidTrainingData`] if a label is not 0 or 1,
    /// or if either class is absent.
    pub fn from_labels(labels: &[u8]) -> Result<Self, TrainingError> {
        let mut balance = Self {
            on_time: 0,
            delayed: 0,
        };
        for &label in labels {
            match label {
                0 => balance.on_time += 1,
                1 => balance.delayed += 1,
                other => {
                    return Err(TrainingError::InvalidTrainingData(format!(
                        "label {other} is not 0 or 1"
                    )));
                }
            }
        }

        if balance.on_time == 0 || balance.delayed == 0 {
            return Err(TrainingError::InvalidTrainingData(format!(
                "both classes are required (on_time = {}, delayed = {})",
                balance.on_time, balance.delayed
            )));
        }

        Ok(balance)
    }

    /// Weight for the delayed class: `on_time / delayed`.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "row counts stay far below 2^24")]
    pub fn scale_pos_weight(&self) -> f32 {
        self.on_time as f32 / self.delayed as f32
    }
}

/// Fits a classifier on schema-aligned vectors.
///
/// The delayed class is weighted by `on_time / delayed`.
///
/// # Errors
///
/// Returns an error if the inputs are empty, mismatched in length or width,
/// or contain a single class.
pub fn fit(
    schema: &FeatureSchema,
    vectors: &[FeatureVector],
    labels: &[u8],
    hyperparameters: &Hyperparameters,
) -> Result<FittedModel, TrainingError> {
    if vectors.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    if vectors.len() != labels.len() {
        return Err(TrainingError::InvalidTrainingData(format!(
            "{} feature vectors but {} labels",
            vectors.len(),
            labels.len()
        )));
    }
    if let Some(row) = vectors.iter().position(|v| v.len() != schema.len()) {
        return Err(TrainingError::InvalidTrainingData(format!(
            "row {row} has {} columns, schema has {}",
            vectors[row].len(),
            schema.len()
        )));
    }

    let balance = ClassBalance::from_labels(labels)?;
    let scale_pos_weight = balance.scale_pos_weight();

    info!(
        rows = vectors.len(),
        on_time = balance.on_time,
        delayed = balance.delayed,
        scale_pos_weight,
        "Fitting delay classifier"
    );

    let classifier = DelayClassifier::fit(
        vectors,
        labels,
        scale_pos_weight,
        schema.len(),
        hyperparameters,
    );

    let metadata = ModelMetadata {
        model_id: Uuid::new_v4(),
        trained_at: Utc::now(),
        hyperparameters: hyperparameters.clone(),
        scale_pos_weight,
        training_rows: vectors.len(),
        validation_rows: 0,
        observed_columns: schema.clone(),
        report: None,
    };

    Ok(FittedModel::new(schema.clone(), classifier, metadata))
}

/// Runs the full pipeline: shuffle, encode, split, fit, evaluate.
///
/// Both the shuffle and the split are seeded, so the same examples and
/// options always produce the same training rows.
///
/// # Errors
///
/// Returns an error if the options are out of range or fitting fails.
pub fn train(
    examples: &[TrainingExample],
    options: &TrainingOptions,
) -> Result<FittedModel, TrainingError> {
    if examples.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    if !(0.0..1.0).contains(&options.validation_fraction) {
        return Err(TrainingError::InvalidOptions(format!(
            "validation_fraction must be in [0, 1), got {}",
            options.validation_fraction
        )));
    }

    let mut order: Vec<usize> = (0..examples.len()).collect();
    shuffle_indices(&mut order, options.shuffle_seed);

    let records: Vec<RawRecord> = order.iter().map(|&i| examples[i].record.clone()).collect();
    let labels: Vec<u8> = order.iter().map(|&i| examples[i].label()).collect();

    let batch = encode(&records, None);
    debug!(
        observed = batch.observed.len(),
        selected = batch.schema.len(),
        "Encoded training batch"
    );

    let (train_idx, valid_idx) =
        split_indices(records.len(), options.validation_fraction, options.split_seed);

    let train_vectors: Vec<FeatureVector> =
        train_idx.iter().map(|&i| batch.vectors[i].clone()).collect();
    let train_labels: Vec<u8> = train_idx.iter().map(|&i| labels[i]).collect();

    let mut model = fit(
        &batch.schema,
        &train_vectors,
        &train_labels,
        &options.hyperparameters,
    )?;

    let report = if valid_idx.is_empty() {
        None
    } else {
        let valid_vectors: Vec<FeatureVector> =
            valid_idx.iter().map(|&i| batch.vectors[i].clone()).collect();
        let valid_labels: Vec<u8> = valid_idx.iter().map(|&i| labels[i]).collect();
        let predicted = predict(&model, &valid_vectors)
            .map_err(|e| TrainingError::Classifier(e.to_string()))?;
        let report = ClassificationReport::from_predictions(&valid_labels, &predicted);
        info!(
            accuracy = report.accuracy,
            delayed_recall = report.delayed.recall,
            delayed_f1 = report.delayed.f1,
            "Validation report"
        );
        Some(report)
    };

    let metadata = model.metadata_mut();
    metadata.validation_rows = valid_idx.len();
    metadata.observed_columns = batch.observed;
    metadata.report = report;

    Ok(model)
}

/// Splits `0..len` into (train, validation) index sets.
///
/// The validation size is `ceil(len * fraction)`, capped so at least one
/// training row remains.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    reason = "fraction is in [0, 1) and len is a row count"
)]
fn split_indices(len: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..len).collect();
    shuffle_indices(&mut indices, seed);

    let valid_len = ((len as f64 * fraction).ceil() as usize).min(len.saturating_sub(1));
    let train = indices.split_off(valid_len);
    (train, indices)
}

/// Shuffles indices using a simple LCG-based shuffle.
fn shuffle_indices(indices: &mut [usize], seed: u64) {
    // Simple Fisher-Yates shuffle with LCG random
    let mut rng_state = seed.wrapping_add(12345);

    for i in (1..indices.len()).rev() {
        // LCG: state = (a * state + c) mod m
        rng_state = rng_state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        #[expect(clippy::cast_possible_truncation, reason = "upper 31 bits fit in usize")]
        let j = ((rng_state >> 33) as usize) % (i + 1);
        indices.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(carrier: &str, flight_type: &str, month: u8, delay: f64) -> TrainingExample {
        TrainingExample::new(RawRecord::new(carrier, flight_type, month), delay)
    }

    fn balanced_examples() -> Vec<TrainingExample> {
        let mut examples = Vec::new();
        for i in 0..40u8 {
            let month = i % 12 + 1;
            examples.push(example("Grupo LATAM", "I", month, 30.0));
            examples.push(example("Sky Airline", "N", month, 2.0));
            examples.push(example("Copa Air", "I", month, if i % 3 == 0 { 20.0 } else { 0.0 }));
        }
        examples
    }

    #[test]
    fn test_single_class_is_rejected() {
        let result = ClassBalance::from_labels(&[0, 0, 0]);
        assert!(matches!(result, Err(TrainingError::InvalidTrainingData(_))));

        let examples = vec![
            example("Iberia", "I", 7, 0.0),
            example("Iberia", "N", 3, 1.0),
        ];
        let options = TrainingOptions {
            validation_fraction: 0.0,
            ..TrainingOptions::default()
        };
        let result = train(&examples, &options);
        assert!(matches!(result, Err(TrainingError::InvalidTrainingData(_))));
    }

    #[test]
    fn test_scale_pos_weight() {
        let balance = ClassBalance::from_labels(&[0, 0, 0, 1]).expect("two classes");
        assert_eq!(balance.on_time, 3);
        assert_eq!(balance.delayed, 1);
        assert!((balance.scale_pos_weight() - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_label_rejected() {
        assert!(ClassBalance::from_labels(&[0, 1, 2]).is_err());
    }

    #[test]
    fn test_fit_checks_shapes() {
        let schema = FeatureSchema::selected();
        let vectors = vec![FeatureVector::zeros(schema.len())];
        assert!(matches!(
            fit(&schema, &vectors, &[0, 1], &Hyperparameters::default()),
            Err(TrainingError::InvalidTrainingData(_))
        ));
        assert!(matches!(
            fit(&schema, &[], &[], &Hyperparameters::default()),
            Err(TrainingError::EmptyDataset)
        ));
        let narrow = vec![FeatureVector::zeros(3), FeatureVector::zeros(3)];
        assert!(matches!(
            fit(&schema, &narrow, &[0, 1], &Hyperparameters::default()),
            Err(TrainingError::InvalidTrainingData(_))
        ));
    }

    #[test]
    fn test_two_example_training_set() {
        let examples = vec![
            example("Delta Air Lines", "N", 3, 20.0),
            example("Iberia", "I", 7, 5.0),
        ];
        let options = TrainingOptions {
            validation_fraction: 0.0,
            ..TrainingOptions::default()
        };
        let model = train(&examples, &options).expect("training should succeed");

        assert_eq!(model.schema(), &FeatureSchema::selected());
        let observed = &model.metadata().observed_columns;
        assert!(observed.contains("OPERA_Delta Air Lines"));
        assert!(observed.contains("MES_3"));
        assert_eq!(model.metadata().training_rows, 2);
        assert!(model.metadata().report.is_none());
        assert!((model.metadata().scale_pos_weight - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pipeline_with_validation_split() {
        let examples = balanced_examples();
        let model = train(&examples, &TrainingOptions::default()).expect("should train");

        let metadata = model.metadata();
        assert_eq!(metadata.validation_rows, 40); // ceil(120 * 0.33)
        assert_eq!(metadata.training_rows, 80);
        assert!(metadata.report.is_some());

        let predictions = model
            .predict_records(&[RawRecord::new("Qantas Airways", "N", 12)])
            .expect("should predict");
        assert_eq!(predictions.len(), 1);
        assert!(predictions[0] <= 1);
    }

    #[test]
    fn test_invalid_fraction() {
        let options = TrainingOptions {
            validation_fraction: 1.0,
            ..TrainingOptions::default()
        };
        assert!(matches!(
            train(&balanced_examples(), &options),
            Err(TrainingError::InvalidOptions(_))
        ));
        assert!(matches!(
            train(&[], &TrainingOptions::default()),
            Err(TrainingError::EmptyDataset)
        ));
    }

    #[test]
    fn test_split_is_deterministic() {
        let a = split_indices(10, 0.33, 42);
        let b = split_indices(10, 0.33, 42);
        assert_eq!(a, b);
        assert_eq!(a.1.len(), 4);
        assert_eq!(a.0.len(), 6);

        let (train_only, valid) = split_indices(2, 0.9, 42);
        assert_eq!(train_only.len(), 1);
        assert_eq!(valid.len(), 1);
    }

    #[test]
    fn test_shuffle_indices() {
        let mut indices: Vec<usize> = (0..10).collect();
        let original = indices.clone();

        shuffle_indices(&mut indices, 42);

        // Should be permuted (very unlikely to be the same)
        assert_ne!(indices, original, "Shuffle should change order");

        // Should contain the same elements
        indices.sort_unstable();
        assert_eq!(indices, original, "Shuffle should preserve elements");
    }
}
