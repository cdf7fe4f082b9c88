//! Model lifecycle: load at startup, train on demand, publish snapshots.
//!
//! The current model lives in a `watch` channel as an `Arc<FittedModel>`.
//! Every load or training run publishes a fresh snapshot; requests already
//! holding the previous one keep using it untouched.

use std::sync::Arc;

use artifact_store::{ArtifactStore, ModelLocation, StoreError, StorePolicy};
use config::{Config, StartupPolicy};
use delay_model::{FittedModel, TrainingError, TrainingOptions, dataset, train};
use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};

use crate::{ServiceError, ServiceErrorKind};

/// Published lifecycle state.
#[derive(Debug, Clone)]
pub enum ModelState {
    Uninitialized,
    Loading,
    Training,
    Ready(Arc<FittedModel>),
    Failed(ServiceErrorKind),
}

/// [`ModelState`] without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ModelStatus {
    Uninitialized,
    Loading,
    Training,
    Ready,
    Failed,
}

impl ModelState {
    #[must_use]
    pub const fn status(&self) -> ModelStatus {
        match self {
            Self::Uninitialized => ModelStatus::Uninitialized,
            Self::Loading => ModelStatus::Loading,
            Self::Training => ModelStatus::Training,
            Self::Ready(_) => ModelStatus::Ready,
            Self::Failed(_) => ModelStatus::Failed,
        }
    }
}

/// Returns the published model, or `ModelNotAvailable` while none is ready.
pub(crate) fn ready_model(state: &ModelState) -> Result<Arc<FittedModel>, ServiceError> {
    match state {
        ModelState::Ready(model) => Ok(Arc::clone(model)),
        _ => Err(ServiceError::ModelNotAvailable),
    }
}

/// Where the service reads and writes, and how it starts.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub model_location: ModelLocation,
    pub data_location: ModelLocation,
    pub startup_policy: StartupPolicy,
    pub training: TrainingOptions,
}

impl ServiceSettings {
    /// # Errors
    ///
    /// Returns an error if either configured location is malformed.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Ok(Self {
            model_location: config.model_path.parse()?,
            data_location: config.data_path.parse()?,
            startup_policy: config.startup_policy,
            training: TrainingOptions::default(),
        })
    }
}

/// Storage settings from configuration.
#[must_use]
pub fn store_policy(config: &Config) -> StorePolicy {
    StorePolicy {
        timeout: config.storage_timeout,
        max_retries: config.storage_max_retries,
        ..StorePolicy::default()
    }
}

/// Owns the single in-process model.
pub struct ModelService {
    store: Arc<ArtifactStore>,
    settings: ServiceSettings,
    state: watch::Sender<ModelState>,
    lifecycle: Mutex<()>,
}

impl ModelService {
    #[must_use]
    pub fn new(store: Arc<ArtifactStore>, settings: ServiceSettings) -> Self {
        let (state, _) = watch::channel(ModelState::Uninitialized);
        Self {
            store,
            settings,
            state,
            lifecycle: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Receiver for the published state; used by [`crate::PredictionService`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ModelState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> ModelStatus {
        self.state.borrow().status()
    }

    /// The published model.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ModelNotAvailable`] unless the state is ready.
    pub fn current(&self) -> Result<Arc<FittedModel>, ServiceError> {
        ready_model(&self.state.borrow())
    }

    /// Startup: load the artifact, then apply the startup policy if that fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Busy`] if another lifecycle operation is
    /// running. With `FailFast`, returns the load failure. With
    /// `TrainOnDemand`, returns the training failure.
    pub async fn initialize(&self) -> Result<Arc<FittedModel>, ServiceError> {
        let _guard = self.lifecycle.try_lock().map_err(|_| ServiceError::Busy)?;
        let transition = Transition::begin(&self.state, ModelState::Loading);

        let load_error = match self.store.load(&self.settings.model_location).await {
            Ok(model) => return Ok(transition.publish(model)),
            Err(err) => err,
        };

        match self.settings.startup_policy {
            StartupPolicy::FailFast => {
                error!(
                    location = %self.settings.model_location,
                    error = %load_error,
                    "No usable model artifact. Run `flight-delay train` to create one"
                );
                Err(transition.fail(load_error.into()))
            }
            StartupPolicy::TrainOnDemand => {
                warn!(
                    location = %self.settings.model_location,
                    error = %load_error,
                    "No usable model artifact, training from scratch"
                );
                self.state.send_replace(ModelState::Training);
                let model = match self.train_model().await {
                    Ok(model) => model,
                    Err(err) => return Err(transition.fail(err)),
                };

                if let Err(err) = self.store.save(&model, &self.settings.model_location).await {
                    error!(
                        location = %self.settings.model_location,
                        error = %err,
                        "Trained model could not be persisted; serving it from memory only"
                    );
                }
                Ok(transition.publish(model))
            }
        }
    }

    /// Trains from the data location, persists, then publishes.
    ///
    /// Nothing is published unless the artifact was written. On failure the
    /// previously published model, if any, stays in service.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Busy`] if another lifecycle operation is
    /// running, or the training or storage failure.
    pub async fn train_and_persist(&self) -> Result<Arc<FittedModel>, ServiceError> {
        let _guard = self.lifecycle.try_lock().map_err(|_| ServiceError::Busy)?;
        let transition = Transition::begin(&self.state, ModelState::Training);

        let model = match self.train_model().await {
            Ok(model) => model,
            Err(err) => return Err(transition.fail(err)),
        };

        if let Err(err) = self.store.save(&model, &self.settings.model_location).await {
            return Err(transition.fail(err.into()));
        }
        Ok(transition.publish(model))
    }

    /// Re-reads the artifact and publishes it. No training fallback.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Busy`] if another lifecycle operation is
    /// running, or the load failure.
    pub async fn reload(&self) -> Result<Arc<FittedModel>, ServiceError> {
        let _guard = self.lifecycle.try_lock().map_err(|_| ServiceError::Busy)?;
        let transition = Transition::begin(&self.state, ModelState::Loading);

        match self.store.load(&self.settings.model_location).await {
            Ok(model) => Ok(transition.publish(model)),
            Err(err) => Err(transition.fail(err.into())),
        }
    }

    async fn train_model(&self) -> Result<FittedModel, ServiceError> {
        let location = &self.settings.data_location;
        info!(data = %location, "Reading training data");
        let bytes = self.store.read_blob(location).await?;

        let options = self.settings.training.clone();
        let trained = tokio::task::spawn_blocking(move || -> Result<FittedModel, ServiceError> {
            let examples = dataset::read_examples(&bytes)?;
            Ok(train(&examples, &options)?)
        })
        .await
        .map_err(|e| TrainingError::Classifier(format!("training task failed: {e}")))?;

        trained
    }
}

/// An in-progress `Loading`/`Training` state.
///
/// Ends with [`Transition::publish`] or [`Transition::fail`]. If the
/// operation is dropped before either (the caller was cancelled), the state
/// it replaced is put back.
struct Transition<'a> {
    state: &'a watch::Sender<ModelState>,
    previous: Option<ModelState>,
}

impl<'a> Transition<'a> {
    fn begin(state: &'a watch::Sender<ModelState>, next: ModelState) -> Self {
        let previous = state.send_replace(next);
        Self {
            state,
            previous: Some(previous),
        }
    }

    fn publish(mut self, model: FittedModel) -> Arc<FittedModel> {
        self.previous = None;
        let model = Arc::new(model);
        info!(
            model_id = %model.metadata().model_id,
            trained_at = %model.metadata().trained_at,
            features = model.schema().len(),
            "Model ready"
        );
        self.state.send_replace(ModelState::Ready(Arc::clone(&model)));
        model
    }

    /// Puts back a previously ready model, otherwise records the failure.
    fn fail(mut self, err: ServiceError) -> ServiceError {
        let next = match self.previous.take() {
            Some(ModelState::Ready(model)) => {
                warn!(
                    model_id = %model.metadata().model_id,
                    error = %err,
                    "Lifecycle operation failed, keeping the current model"
                );
                ModelState::Ready(model)
            }
            _ => ModelState::Failed(err.kind()),
        };
        self.state.send_replace(next);
        err
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            warn!(
                restored = %previous.status(),
                "Lifecycle operation cancelled, restoring the previous state"
            );
            self.state.send_replace(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::path::Path;

    use artifact_store::{ArtifactBackend, BackendKind, LocalBackend, StoreErrorKind};
    use async_trait::async_trait;
    use bytes::Bytes;
    use delay_model::artifact;
    use flight_structs::RawRecord;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    use super::*;
    use crate::PredictionService;

    const CARRIERS: [(&str, &str); 4] = [
        ("Grupo LATAM", "I"),
        ("Sky Airline", "N"),
        ("Latin American Wings", "N"),
        ("Copa Air", "I"),
    ];

    fn write_training_csv(path: &Path) {
        let mut csv = String::from("OPERA,TIPOVUELO,MES,delay_minutes\n");
        for month in 1..=12u8 {
            for (i, (carrier, kind)) in CARRIERS.iter().enumerate() {
                let delay = if (usize::from(month) + i) % 3 == 0 { 40 } else { 2 };
                writeln!(csv, "{carrier},{kind},{month},{delay}").expect("write");
            }
        }
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, csv).expect("write csv");
    }

    fn settings(dir: &TempDir, policy: StartupPolicy) -> ServiceSettings {
        ServiceSettings {
            model_location: ModelLocation::Local(dir.path().join("models/delay_model.json")),
            data_location: ModelLocation::Local(dir.path().join("data/data.csv")),
            startup_policy: policy,
            training: TrainingOptions {
                validation_fraction: 0.0,
                ..TrainingOptions::default()
            },
        }
    }

    fn local_service(dir: &TempDir, policy: StartupPolicy) -> ModelService {
        let store = Arc::new(ArtifactStore::new(StorePolicy::default()));
        ModelService::new(store, settings(dir, policy))
    }

    #[tokio::test]
    async fn test_predict_before_initialize_is_not_available() {
        let dir = TempDir::new().expect("tempdir");
        let service = local_service(&dir, StartupPolicy::FailFast);
        let predictions = PredictionService::new(&service);

        assert_eq!(service.status(), ModelStatus::Uninitialized);
        assert!(!predictions.is_model_available());

        let err = predictions
            .predict_delays(&[RawRecord::new("Grupo LATAM", "I", 7)])
            .expect_err("no model yet");
        assert!(matches!(err, ServiceError::ModelNotAvailable));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_fail_fast_without_artifact() {
        let dir = TempDir::new().expect("tempdir");
        write_training_csv(&dir.path().join("data/data.csv"));
        let service = local_service(&dir, StartupPolicy::FailFast);

        let err = service.initialize().await.expect_err("no artifact");
        assert_eq!(
            err.kind(),
            ServiceErrorKind::Storage(StoreErrorKind::NotFound)
        );
        assert_eq!(service.status(), ModelStatus::Failed);
        assert!(matches!(service.current(), Err(ServiceError::ModelNotAvailable)));
        assert!(!dir.path().join("models/delay_model.json").exists());
    }

    #[tokio::test]
    async fn test_train_on_demand_persists_and_serves() {
        let dir = TempDir::new().expect("tempdir");
        write_training_csv(&dir.path().join("data/data.csv"));
        let service = local_service(&dir, StartupPolicy::TrainOnDemand);
        let predictions = PredictionService::new(&service);

        let model = service.initialize().await.expect("trains on demand");
        assert_eq!(service.status(), ModelStatus::Ready);
        assert!(dir.path().join("models/delay_model.json").exists());
        assert!(predictions.is_model_available());

        let labels = predictions
            .predict_delays(&[
                RawRecord::new("Qantas Airways", "N", 12),
                RawRecord::new("Grupo LATAM", "I", 7),
            ])
            .expect("predicts");
        assert_eq!(labels.len(), 2);
        assert!(labels.iter().all(|&l| l <= 1));

        // A fresh process loads what was persisted instead of retraining.
        let restarted = local_service(&dir, StartupPolicy::FailFast);
        let loaded = restarted.initialize().await.expect("loads artifact");
        assert_eq!(loaded.metadata().model_id, model.metadata().model_id);
        assert_eq!(loaded.schema(), model.schema());
    }

    #[tokio::test]
    async fn test_train_on_demand_publishes_when_persist_fails() {
        let dir = TempDir::new().expect("tempdir");
        write_training_csv(&dir.path().join("data/data.csv"));
        std::fs::write(dir.path().join("blocker"), b"not a directory").expect("write");

        let mut settings = settings(&dir, StartupPolicy::TrainOnDemand);
        settings.model_location = ModelLocation::Local(dir.path().join("blocker/m.json"));
        let store = Arc::new(ArtifactStore::new(StorePolicy::default()));
        let service = ModelService::new(store, settings);

        service.initialize().await.expect("served from memory");
        assert_eq!(service.status(), ModelStatus::Ready);
    }

    #[tokio::test]
    async fn test_failed_training_keeps_current_model() {
        let dir = TempDir::new().expect("tempdir");
        write_training_csv(&dir.path().join("data/data.csv"));
        let service = local_service(&dir, StartupPolicy::TrainOnDemand);
        let first = service.initialize().await.expect("trains");

        std::fs::write(
            dir.path().join("data/data.csv"),
            "OPERA,TIPOVUELO,MES,delay_minutes\nIberia,I,7,1\nIberia,N,3,2\n",
        )
        .expect("write");

        let err = service.train_and_persist().await.expect_err("single class");
        assert!(matches!(
            err,
            ServiceError::Training(TrainingError::InvalidTrainingData(_))
        ));
        assert_eq!(service.status(), ModelStatus::Ready);
        let current = service.current().expect("still serving");
        assert_eq!(current.metadata().model_id, first.metadata().model_id);
    }

    #[tokio::test]
    async fn test_train_and_persist_replaces_snapshot() {
        let dir = TempDir::new().expect("tempdir");
        write_training_csv(&dir.path().join("data/data.csv"));
        let service = local_service(&dir, StartupPolicy::TrainOnDemand);
        let first = service.initialize().await.expect("trains");

        let second = service.train_and_persist().await.expect("retrains");
        assert_ne!(first.metadata().model_id, second.metadata().model_id);
        assert_eq!(
            service.current().expect("ready").metadata().model_id,
            second.metadata().model_id
        );
        // The old snapshot is still intact for anyone holding it.
        assert_eq!(first.schema(), second.schema());

        let reloaded = service.reload().await.expect("reloads");
        assert_eq!(reloaded.metadata().model_id, second.metadata().model_id);
    }

    /// Serves a fixed artifact once `gate` is notified.
    struct GatedBackend {
        gate: Arc<Notify>,
        artifact: Bytes,
    }

    #[async_trait]
    impl ArtifactBackend for GatedBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Local
        }

        async fn exists(&self, _location: &ModelLocation) -> Result<bool, StoreError> {
            Ok(true)
        }

        async fn read(&self, _location: &ModelLocation) -> Result<Bytes, StoreError> {
            self.gate.notified().await;
            Ok(self.artifact.clone())
        }

        async fn write(&self, _location: &ModelLocation, _bytes: Bytes) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_requests_rejected_while_loading() {
        let dir = TempDir::new().expect("tempdir");
        write_training_csv(&dir.path().join("data/data.csv"));
        let trainer = local_service(&dir, StartupPolicy::TrainOnDemand);
        let model = trainer.initialize().await.expect("trains");
        let artifact = Bytes::from(artifact::to_bytes(&model).expect("serialize"));

        let gate = Arc::new(Notify::new());
        let backend = GatedBackend {
            gate: Arc::clone(&gate),
            artifact,
        };
        let store = Arc::new(ArtifactStore::with_backends(
            Arc::new(backend),
            Arc::new(LocalBackend),
            StorePolicy::default(),
        ));
        let service = Arc::new(ModelService::new(
            store,
            settings(&dir, StartupPolicy::FailFast),
        ));
        let predictions = PredictionService::new(&service);
        let mut watcher = service.subscribe();

        let loading = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.initialize().await }
        });
        watcher
            .wait_for(|state| matches!(state, ModelState::Loading))
            .await
            .expect("state published");

        let err = predictions
            .predict_delays(&[RawRecord::new("Grupo LATAM", "I", 7)])
            .expect_err("still loading");
        assert!(matches!(err, ServiceError::ModelNotAvailable));
        assert!(matches!(service.reload().await, Err(ServiceError::Busy)));

        gate.notify_one();
        let loaded = loading.await.expect("join").expect("loads");
        assert_eq!(loaded.metadata().model_id, model.metadata().model_id);
        assert!(predictions.is_model_available());
    }

    #[tokio::test]
    async fn test_cancelled_reload_keeps_serving() {
        let dir = TempDir::new().expect("tempdir");
        write_training_csv(&dir.path().join("data/data.csv"));
        let trainer = local_service(&dir, StartupPolicy::TrainOnDemand);
        let model = trainer.initialize().await.expect("trains");
        let artifact = Bytes::from(artifact::to_bytes(&model).expect("serialize"));

        let gate = Arc::new(Notify::new());
        let store = Arc::new(ArtifactStore::with_backends(
            Arc::new(GatedBackend {
                gate: Arc::clone(&gate),
                artifact,
            }),
            Arc::new(LocalBackend),
            StorePolicy::default(),
        ));
        let service = Arc::new(ModelService::new(
            store,
            settings(&dir, StartupPolicy::FailFast),
        ));
        let predictions = PredictionService::new(&service);

        gate.notify_one();
        let first = service.initialize().await.expect("loads");
        assert_eq!(service.status(), ModelStatus::Ready);

        let mut watcher = service.subscribe();
        let reloading = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.reload().await }
        });
        watcher
            .wait_for(|state| matches!(state, ModelState::Loading))
            .await
            .expect("state published");

        reloading.abort();
        assert!(reloading.await.expect_err("aborted").is_cancelled());

        assert_eq!(service.status(), ModelStatus::Ready);
        let current = service.current().expect("still serving");
        assert_eq!(current.metadata().model_id, first.metadata().model_id);
        predictions
            .predict_delays(&[RawRecord::new("Grupo LATAM", "I", 7)])
            .expect("predicts after cancellation");

        // The lifecycle lock was released with the cancelled call.
        gate.notify_one();
        service.reload().await.expect("reloads again");
    }
}
