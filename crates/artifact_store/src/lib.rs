//! Artifact storage with a pluggable backend per location.
//!
//! `gs://bucket/key` locations go to object storage, everything else to the
//! local filesystem. Every backend call runs under a timeout and transient
//! failures are retried with exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use delay_model::{FittedModel, artifact};
use tracing::{info, warn};

mod backend;
mod error;
mod location;

pub use backend::{
    ArtifactBackend, BucketBackend, BucketProvider, FixedStoreProvider, GcsProvider, LocalBackend,
};
pub use error::{StoreError, StoreErrorKind};
pub use location::{BUCKET_SCHEME, BackendKind, FILE_SCHEME, ModelLocation};

/// Timeout and retry settings for storage calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorePolicy {
    /// Upper bound on a single backend call.
    pub timeout: Duration,
    /// Retries after the first attempt, transient failures only.
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl StorePolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_max_times(self.max_retries)
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
    }
}

/// Saves and loads models, dispatching on the location prefix.
pub struct ArtifactStore {
    local: Arc<dyn ArtifactBackend>,
    bucket: Arc<dyn ArtifactBackend>,
    policy: StorePolicy,
}

impl ArtifactStore {
    /// Local filesystem plus Google Cloud Storage.
    #[must_use]
    pub fn new(policy: StorePolicy) -> Self {
        Self::with_backends(
            Arc::new(LocalBackend),
            Arc::new(BucketBackend::gcs()),
            policy,
        )
    }

    #[must_use]
    pub fn with_backends(
        local: Arc<dyn ArtifactBackend>,
        bucket: Arc<dyn ArtifactBackend>,
        policy: StorePolicy,
    ) -> Self {
        Self {
            local,
            bucket,
            policy,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &StorePolicy {
        &self.policy
    }

    /// The backend responsible for `location`.
    #[must_use]
    pub fn backend_for(&self, location: &ModelLocation) -> &Arc<dyn ArtifactBackend> {
        match location.backend() {
            BackendKind::Local => &self.local,
            BackendKind::Bucket => &self.bucket,
        }
    }

    /// Serializes `model` and writes it to `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the backend rejects the write.
    pub async fn save(&self, model: &FittedModel, location: &ModelLocation) -> Result<(), StoreError> {
        let bytes = artifact::to_bytes(model).map_err(|source| StoreError::Corrupt {
            location: location.to_string(),
            source,
        })?;
        let size = bytes.len();

        self.write_blob(location, Bytes::from(bytes)).await?;

        info!(
            location = %location,
            backend = %location.backend(),
            bytes = size,
            model_id = %model.metadata().model_id,
            "Saved model"
        );
        Ok(())
    }

    /// Reads and restores the model at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored there,
    /// [`StoreError::Corrupt`] if the bytes are not a valid artifact, and
    /// other variants for backend failures.
    pub async fn load(&self, location: &ModelLocation) -> Result<FittedModel, StoreError> {
        let bytes = self.read_blob(location).await?;

        let model = artifact::from_bytes(&bytes).map_err(|source| StoreError::Corrupt {
            location: location.to_string(),
            source,
        })?;

        info!(
            location = %location,
            backend = %location.backend(),
            model_id = %model.metadata().model_id,
            "Loaded model"
        );
        Ok(model)
    }

    /// Reads raw bytes, checking existence first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored at `location`.
    pub async fn read_blob(&self, location: &ModelLocation) -> Result<Bytes, StoreError> {
        let backend = self.backend_for(location);

        let exists = self
            .call("exists", location, || backend.exists(location))
            .await?;
        if !exists {
            return Err(StoreError::NotFound {
                location: location.to_string(),
            });
        }

        self.call("read", location, || backend.read(location)).await
    }

    /// Writes raw bytes, replacing anything at `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub async fn write_blob(&self, location: &ModelLocation, bytes: Bytes) -> Result<(), StoreError> {
        let backend = self.backend_for(location);
        self.call("write", location, || backend.write(location, bytes.clone()))
            .await
    }

    /// Runs one backend operation under the timeout, retrying transient failures.
    async fn call<T, F, Fut>(
        &self,
        operation: &'static str,
        location: &ModelLocation,
        mut f: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let timeout = self.policy.timeout;

        let attempt = || {
            let fut = f();
            async move {
                tokio::time::timeout(timeout, fut)
                    .await
                    .unwrap_or_else(|_| {
                        Err(StoreError::Timeout {
                            operation,
                            location: location.to_string(),
                            after: timeout,
                        })
                    })
            }
        };

        attempt
            .retry(self.policy.backoff())
            .when(StoreError::is_transient)
            .notify(|err: &StoreError, delay: Duration| {
                warn!(
                    operation,
                    location = %location,
                    error = %err,
                    retry_in = ?delay,
                    "Storage call failed, will retry"
                );
            })
            .await
    }
}
