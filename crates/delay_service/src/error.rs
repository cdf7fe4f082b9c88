//! Errors surfaced at the prediction boundary.

use core::fmt;

use artifact_store::{StoreError, StoreErrorKind};
use delay_model::{DatasetError, PredictError, TrainingError};
use flight_structs::RecordError;
use thiserror::Error;

/// What the boundary needs to pick a response: the kind, never the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Validation,
    ModelNotAvailable,
    Busy,
    Prediction,
    Training,
    Storage(StoreErrorKind),
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => f.write_str("validation"),
            Self::ModelNotAvailable => f.write_str("model_not_available"),
            Self::Busy => f.write_str("busy"),
            Self::Prediction => f.write_str("prediction"),
            Self::Training => f.write_str("training"),
            Self::Storage(kind) => write!(f, "storage:{kind}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("record {row} is invalid: {source}")]
    Validation {
        row: usize,
        #[source]
        source: RecordError,
    },

    #[error("no model is available")]
    ModelNotAvailable,

    #[error("a model load or training run is already in progress")]
    Busy,

    #[error("prediction failed: {0}")]
    Prediction(#[from] PredictError),

    #[error("training failed: {0}")]
    Training(#[from] TrainingError),

    #[error("training data is unusable: {0}")]
    Dataset(#[from] DatasetError),

    #[error("model storage failed: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    #[must_use]
    pub const fn kind(&self) -> ServiceErrorKind {
        match self {
            Self::Validation { .. } => ServiceErrorKind::Validation,
            Self::ModelNotAvailable => ServiceErrorKind::ModelNotAvailable,
            Self::Busy => ServiceErrorKind::Busy,
            Self::Prediction(_) => ServiceErrorKind::Prediction,
            Self::Training(_) | Self::Dataset(_) => ServiceErrorKind::Training,
            Self::Store(err) => ServiceErrorKind::Storage(err.kind()),
        }
    }

    /// True when the same call may succeed later without changing the input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ServiceErrorKind::ModelNotAvailable
                | ServiceErrorKind::Busy
                | ServiceErrorKind::Storage(StoreErrorKind::Transient)
        )
    }

    /// Fixed text safe to show to callers. Backend messages may carry paths
    /// or credentials and stay in the logs.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self.kind() {
            ServiceErrorKind::Validation => "The request contains an invalid flight record.",
            ServiceErrorKind::ModelNotAvailable => "The model is not ready yet. Retry later.",
            ServiceErrorKind::Busy => "A model update is already in progress. Retry later.",
            ServiceErrorKind::Prediction => "The prediction could not be computed.",
            ServiceErrorKind::Training => "The model could not be trained.",
            ServiceErrorKind::Storage(_) => "Model storage is unavailable.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct_at_the_boundary() {
        let validation = ServiceError::Validation {
            row: 0,
            source: RecordError::MonthOutOfRange(13),
        };
        let prediction = ServiceError::Prediction(PredictError::OutputLength {
            expected: 2,
            found: 1,
        });

        assert_eq!(validation.kind(), ServiceErrorKind::Validation);
        assert_eq!(
            ServiceError::ModelNotAvailable.kind(),
            ServiceErrorKind::ModelNotAvailable
        );
        assert_eq!(prediction.kind(), ServiceErrorKind::Prediction);
        assert_eq!(
            ServiceError::Dataset(DatasetError::Empty).kind(),
            ServiceErrorKind::Training
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ServiceError::ModelNotAvailable.is_retryable());
        assert!(ServiceError::Busy.is_retryable());

        let transient = ServiceError::Store(StoreError::Transient {
            location: "gs://bucket1/m.json".to_string(),
            source: "503".into(),
        });
        assert!(transient.is_retryable());

        let not_found = ServiceError::Store(StoreError::NotFound {
            location: "gs://bucket1/m.json".to_string(),
        });
        assert!(!not_found.is_retryable());
        assert!(!ServiceError::Training(TrainingError::EmptyDataset).is_retryable());
    }

    #[test]
    fn test_public_message_hides_backend_text() {
        let err = ServiceError::Store(StoreError::PermissionDenied {
            location: "gs://secret-bucket/models/m.json".to_string(),
            source: "token ya29.abc rejected".into(),
        });

        assert_eq!(
            err.kind(),
            ServiceErrorKind::Storage(StoreErrorKind::PermissionDenied)
        );
        assert!(!err.public_message().contains("secret-bucket"));
        assert!(!err.public_message().contains("ya29"));
        assert!(err.to_string().contains("secret-bucket"));
        assert_eq!(err.kind().to_string(), "storage:permission_denied");
    }
}
