//! Held-out evaluation of a fitted model.

use serde::{Deserialize, Serialize};

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true samples of this class.
    pub support: usize,
}

/// Binary classification report over a validation split.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    /// Metrics for label 0.
    pub on_time: ClassMetrics,
    /// Metrics for label 1.
    pub delayed: ClassMetrics,
}

impl ClassificationReport {
    /// Builds a report from true and predicted labels of equal length.
    #[must_use]
    pub fn from_predictions(actual: &[u8], predicted: &[u8]) -> Self {
        let total = actual.len().min(predicted.len());
        if total == 0 {
            return Self::default();
        }

        let correct = actual
            .iter()
            .zip(predicted)
            .filter(|(a, p)| a == p)
            .count();

        Self {
            accuracy: ratio(correct, total),
            on_time: class_metrics(actual, predicted, 0),
            delayed: class_metrics(actual, predicted, 1),
        }
    }
}

fn class_metrics(actual: &[u8], predicted: &[u8], class: u8) -> ClassMetrics {
    let mut true_positive = 0;
    let mut false_positive = 0;
    let mut false_negative = 0;

    for (&a, &p) in actual.iter().zip(predicted) {
        match (a == class, p == class) {
            (true, true) => true_positive += 1,
            (false, true) => false_positive += 1,
            (true, false) => false_negative += 1,
            (false, false) => {}
        }
    }

    let precision = ratio(true_positive, true_positive + false_positive);
    let recall = ratio(true_positive, true_positive + false_negative);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ClassMetrics {
        precision,
        recall,
        f1,
        support: true_positive + false_negative,
    }
}

#[expect(clippy::cast_precision_loss, reason = "row counts stay far below 2^52")]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
