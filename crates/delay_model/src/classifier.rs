//! Gradient-boosted classifier wrapper.

use core::fmt;

use feature_encoder::FeatureVector;
use gbdt::config::Config as BoosterConfig;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};

use crate::Hyperparameters;

/// Probability above which a flight is predicted as delayed.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// The booster's log-likelihood loss expects labels in {-1, 1}.
const POSITIVE_TARGET: f32 = 1.0;
const NEGATIVE_TARGET: f32 = -1.0;

/// Fitted booster plus the input width it was trained on.
#[derive(Serialize, Deserialize)]
pub struct DelayClassifier {
    feature_count: usize,
    booster: GBDT,
}

impl DelayClassifier {
    /// Fits a booster on schema-aligned vectors.
    ///
    /// `positive_weight` scales every delayed sample so the minority class is
    /// not swamped by the majority.
    pub(crate) fn fit(
        vectors: &[FeatureVector],
        labels: &[u8],
        positive_weight: f32,
        feature_count: usize,
        hyperparameters: &Hyperparameters,
    ) -> Self {
        let mut config = BoosterConfig::new();
        config.set_feature_size(feature_count);
        config.set_max_depth(hyperparameters.max_depth);
        config.set_iterations(hyperparameters.iterations);
        config.set_shrinkage(hyperparameters.learning_rate);
        config.set_min_leaf_size(hyperparameters.min_leaf_size);
        config.set_data_sample_ratio(1.0);
        config.set_feature_sample_ratio(1.0);
        config.set_loss("LogLikelyhood");
        config.set_debug(false);

        let mut training_data: DataVec = vectors
            .iter()
            .zip(labels)
            .map(|(vector, &label)| {
                let (weight, target) = if label == 1 {
                    (positive_weight, POSITIVE_TARGET)
                } else {
                    (1.0, NEGATIVE_TARGET)
                };
                Data::new_training_data(vector.values.clone(), weight, target, None)
            })
            .collect();

        let mut booster = GBDT::new(&config);
        booster.fit(&mut training_data);

        Self {
            feature_count,
            booster,
        }
    }

    /// Number of input columns the booster was trained on.
    #[must_use]
    pub const fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Probability of delay for each vector.
    #[must_use]
    pub fn predict_proba(&self, vectors: &[FeatureVector]) -> Vec<f32> {
        if vectors.is_empty() {
            return Vec::new();
        }
        let test_data: DataVec = vectors
            .iter()
            .map(|vector| Data::new_test_data(vector.values.clone(), None))
            .collect();
        self.booster.predict(&test_data)
    }
}

impl fmt::Debug for DelayClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayClassifier")
            .field("feature_count", &self.feature_count)
            .finish_non_exhaustive()
    }
}

/// Maps a delay probability to a binary label.
#[must_use]
pub fn label_for(probability: f32) -> u8 {
    u8::from(probability > DECISION_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_threshold() {
        assert_eq!(label_for(0.5), 0);
        assert_eq!(label_for(0.51), 1);
        assert_eq!(label_for(0.0), 0);
    }

    #[test]
    fn test_fit_and_score_shapes() {
        let vectors = vec![
            FeatureVector {
                values: vec![1.0, 0.0],
            },
            FeatureVector {
                values: vec![0.0, 1.0],
            },
            FeatureVector {
                values: vec![1.0, 1.0],
            },
            FeatureVector {
                values: vec![0.0, 0.0],
            },
        ];
        let labels = [1, 0, 1, 0];
        let classifier =
            DelayClassifier::fit(&vectors, &labels, 1.0, 2, &Hyperparameters::default());

        assert_eq!(classifier.feature_count(), 2);
        let scores = classifier.predict_proba(&vectors);
        assert_eq!(scores.len(), 4);
        assert!(scores.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(classifier.predict_proba(&[]).is_empty());
    }
}
