//! Delay model crate: training, inference and the persisted model format.
//!
//! A [`FittedModel`] bundles the gradient-boosted classifier with the
//! [`FeatureSchema`] it was trained on, so the columns used at prediction time
//! are always the columns the classifier learned.

use chrono::{DateTime, Utc};
use feature_encoder::{FeatureSchema, FeatureVector, encode_with};
use flight_structs::RawRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod artifact;
mod classifier;
pub mod dataset;
mod error;
pub mod evaluation;
mod predict;
pub mod training;

pub use classifier::{DECISION_THRESHOLD, DelayClassifier, label_for};
pub use error::{ArtifactError, DatasetError, PredictError, TrainingError};
pub use evaluation::ClassificationReport;
pub use predict::predict;
pub use training::{ClassBalance, TrainingOptions, fit, train};

/// Booster hyperparameters. Fixed per release; not tuned per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Shrinkage applied to every tree.
    pub learning_rate: f32,
    /// Number of boosting rounds.
    pub iterations: usize,
    /// Maximum tree depth.
    pub max_depth: u32,
    /// Minimum samples per leaf.
    pub min_leaf_size: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            iterations: 100,
            max_depth: 6,
            min_leaf_size: 1,
        }
    }
}

/// Provenance recorded alongside a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub hyperparameters: Hyperparameters,
    /// Weight applied to delayed samples (negatives / positives).
    pub scale_pos_weight: f32,
    /// Rows the classifier was fitted on.
    pub training_rows: usize,
    /// Rows held out for evaluation.
    pub validation_rows: usize,
    /// Every column the training batch produced before selection.
    pub observed_columns: FeatureSchema,
    /// Held-out evaluation, when a validation split was taken.
    pub report: Option<ClassificationReport>,
}

/// Classifier state plus the schema it was trained with.
#[derive(Debug, Serialize, Deserialize)]
pub struct FittedModel {
    schema: FeatureSchema,
    classifier: DelayClassifier,
    metadata: ModelMetadata,
}

impl FittedModel {
    pub(crate) const fn new(
        schema: FeatureSchema,
        classifier: DelayClassifier,
        metadata: ModelMetadata,
    ) -> Self {
        Self {
            schema,
            classifier,
            metadata,
        }
    }

    /// The input contract of this model.
    #[must_use]
    pub const fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    #[must_use]
    pub const fn classifier(&self) -> &DelayClassifier {
        &self.classifier
    }

    pub(crate) const fn metadata_mut(&mut self) -> &mut ModelMetadata {
        &mut self.metadata
    }

    /// Encodes records with this model's schema.
    #[must_use]
    pub fn encode(&self, records: &[RawRecord]) -> Vec<FeatureVector> {
        encode_with(records, &self.schema)
    }

    /// Encodes and predicts in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the classifier output does not line up with the input.
    pub fn predict_records(&self, records: &[RawRecord]) -> Result<Vec<u8>, PredictError> {
        predict(self, &self.encode(records))
    }
}
