//! Error types for training, prediction and artifact handling.

use thiserror::Error;

/// Training pipeline failures.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("no training examples provided")]
    EmptyDataset,

    #[error("invalid training data: {0}")]
    InvalidTrainingData(String),

    #[error("invalid training options: {0}")]
    InvalidOptions(String),

    #[error("classifier failed to fit: {0}")]
    Classifier(String),
}

/// Inference failures on an already fitted model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PredictError {
    #[error("row {row}: feature vector has {found} columns, model expects {expected}")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("classifier returned {found} scores for {expected} rows")]
    OutputLength { expected: usize, found: usize },
}

/// Failures reading the training data CSV.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("row {row}: no delay_minutes column and no Fecha-I/Fecha-O timestamps")]
    MissingDelay { row: usize },

    #[error("row {row}: invalid timestamp {value:?}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("training data contains no rows")]
    Empty,
}

/// Failures encoding or decoding a persisted model.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported artifact format {0:?}")]
    UnsupportedFormat(String),

    #[error("unsupported artifact version {0}")]
    UnsupportedVersion(u32),

    #[error("artifact schema has {schema} columns but classifier expects {classifier}")]
    Inconsistent { schema: usize, classifier: usize },
}
