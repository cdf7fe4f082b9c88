//! The prediction boundary consumed by request handlers.

use flight_structs::RawRecord;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::lifecycle::ready_model;
use crate::{ModelService, ModelState, ServiceError};

/// Read-only handle on the published model. Cheap to clone per request.
#[derive(Debug, Clone)]
pub struct PredictionService {
    models: watch::Receiver<ModelState>,
}

impl PredictionService {
    #[must_use]
    pub fn new(service: &ModelService) -> Self {
        Self {
            models: service.subscribe(),
        }
    }

    /// True once a model has been published and no reload is in progress.
    #[must_use]
    pub fn is_model_available(&self) -> bool {
        matches!(*self.models.borrow(), ModelState::Ready(_))
    }

    /// Predicts one label per record, in input order. `1` means delayed.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if a record fails the allow-lists.
    /// - [`ServiceError::ModelNotAvailable`] before a model is ready.
    /// - [`ServiceError::Prediction`] on an internal inference failure.
    pub fn predict_delays(&self, records: &[RawRecord]) -> Result<Vec<u8>, ServiceError> {
        for (row, record) in records.iter().enumerate() {
            record
                .validate()
                .map_err(|source| ServiceError::Validation { row, source })?;
        }

        // Clone the snapshot out so the channel is not held during inference.
        let model = ready_model(&self.models.borrow())?;

        let labels = model.predict_records(records).inspect_err(|e| {
            error!(
                model_id = %model.metadata().model_id,
                error = %e,
                "Prediction failed"
            );
        })?;

        debug!(rows = labels.len(), "Predicted delays");
        Ok(labels)
    }
}
