//! Storage backends: a local filesystem and an object-storage bucket.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt};
use tracing::{debug, warn};

use crate::{BackendKind, ModelLocation, StoreError};

/// Reads and writes whole artifacts.
///
/// Implementations perform a single attempt; timeouts and retries are applied
/// by [`crate::ArtifactStore`].
#[async_trait]
pub trait ArtifactBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Whether an artifact exists at `location`.
    async fn exists(&self, location: &ModelLocation) -> Result<bool, StoreError>;

    /// Reads the full artifact. A missing artifact is [`StoreError::NotFound`].
    async fn read(&self, location: &ModelLocation) -> Result<Bytes, StoreError>;

    /// Writes the full artifact, replacing any previous one.
    async fn write(&self, location: &ModelLocation, bytes: Bytes) -> Result<(), StoreError>;
}

fn wrong_backend(location: &ModelLocation, expected: BackendKind) -> StoreError {
    StoreError::InvalidLocation {
        location: location.to_string(),
        reason: format!("not a {expected} location"),
    }
}

/// Artifacts on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBackend;

impl LocalBackend {
    fn path<'a>(location: &'a ModelLocation) -> Result<&'a Path, StoreError> {
        location
            .local_path()
            .ok_or_else(|| wrong_backend(location, BackendKind::Local))
    }
}

/// Sibling file written first and renamed over the target.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

#[async_trait]
impl ArtifactBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn exists(&self, location: &ModelLocation) -> Result<bool, StoreError> {
        let path = Self::path(location)?;
        tokio::fs::try_exists(path)
            .await
            .map_err(|e| StoreError::from_io(location, e))
    }

    async fn read(&self, location: &ModelLocation) -> Result<Bytes, StoreError> {
        let path = Self::path(location)?;
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::from_io(location, e))?;
        debug!(path = %path.display(), bytes = data.len(), "Read local artifact");
        Ok(Bytes::from(data))
    }

    async fn write(&self, location: &ModelLocation, bytes: Bytes) -> Result<(), StoreError> {
        let path = Self::path(location)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::from_io(location, e))?;
        }

        let partial = partial_path(path);
        tokio::fs::write(&partial, &bytes)
            .await
            .map_err(|e| StoreError::from_io(location, e))?;
        tokio::fs::rename(&partial, path)
            .await
            .map_err(|e| StoreError::from_io(location, e))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Wrote local artifact");
        Ok(())
    }
}

/// Hands out an object store client for a bucket.
///
/// Injected into [`BucketBackend`] so tests can substitute an in-memory store.
pub trait BucketProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if a client for `bucket` cannot be built.
    fn store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, StoreError>;
}

/// Google Cloud Storage clients configured from the environment
/// (`GOOGLE_APPLICATION_CREDENTIALS`, `GOOGLE_SERVICE_ACCOUNT`, ...).
#[derive(Default)]
pub struct GcsProvider {
    clients: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl BucketProvider for GcsProvider {
    fn store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, StoreError> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(bucket) {
            return Ok(Arc::clone(client));
        }

        debug!(
            bucket,
            credentials_file = std::env::var_os("GOOGLE_APPLICATION_CREDENTIALS").is_some(),
            "Building GCS client"
        );

        let client: Arc<dyn ObjectStore> = Arc::new(
            GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| {
                    warn!(
                        bucket,
                        error = %e,
                        "Could not build GCS client; check that credentials are configured"
                    );
                    StoreError::from_client_build(bucket, e)
                })?,
        );
        clients.insert(bucket.to_string(), Arc::clone(&client));
        Ok(client)
    }
}

/// Serves every bucket from one store. Used with `InMemory` in tests and for
/// emulators.
pub struct FixedStoreProvider(pub Arc<dyn ObjectStore>);

impl BucketProvider for FixedStoreProvider {
    fn store(&self, _bucket: &str) -> Result<Arc<dyn ObjectStore>, StoreError> {
        Ok(Arc::clone(&self.0))
    }
}

/// Artifacts in an object-storage bucket.
pub struct BucketBackend {
    provider: Arc<dyn BucketProvider>,
}

impl BucketBackend {
    #[must_use]
    pub fn new(provider: Arc<dyn BucketProvider>) -> Self {
        Self { provider }
    }

    /// Backend for Google Cloud Storage.
    #[must_use]
    pub fn gcs() -> Self {
        Self::new(Arc::new(GcsProvider::default()))
    }

    fn resolve(
        &self,
        location: &ModelLocation,
    ) -> Result<(Arc<dyn ObjectStore>, ObjectStorePath), StoreError> {
        let ModelLocation::Bucket { bucket, key } = location else {
            return Err(wrong_backend(location, BackendKind::Bucket));
        };
        let store = self.provider.store(bucket)?;
        Ok((store, ObjectStorePath::from(key.as_str())))
    }

    fn log_hint(location: &ModelLocation, err: &StoreError) {
        match err {
            StoreError::PermissionDenied { .. } => warn!(
                location = %location,
                "Access denied; the service account needs object read/write on the bucket"
            ),
            StoreError::NotFound { .. } => debug!(
                location = %location,
                "Object not found; check the bucket name and object key"
            ),
            _ => {}
        }
    }
}

#[async_trait]
impl ArtifactBackend for BucketBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Bucket
    }

    async fn exists(&self, location: &ModelLocation) -> Result<bool, StoreError> {
        let (store, path) = self.resolve(location)?;
        match store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => {
                let err = StoreError::from_object_store(location, e);
                Self::log_hint(location, &err);
                Err(err)
            }
        }
    }

    async fn read(&self, location: &ModelLocation) -> Result<Bytes, StoreError> {
        let (store, path) = self.resolve(location)?;
        let result = match store.get(&path).await {
            Ok(object) => object.bytes().await,
            Err(e) => Err(e),
        };

        result
            .inspect(|data| debug!(location = %location, bytes = data.len(), "Downloaded artifact"))
            .map_err(|e| {
                let err = StoreError::from_object_store(location, e);
                Self::log_hint(location, &err);
                err
            })
    }

    async fn write(&self, location: &ModelLocation, bytes: Bytes) -> Result<(), StoreError> {
        let (store, path) = self.resolve(location)?;
        let size = bytes.len();

        store.put(&path, bytes.into()).await.map_err(|e| {
            let err = StoreError::from_object_store(location, e);
            Self::log_hint(location, &err);
            err
        })?;

        debug!(location = %location, bytes = size, "Uploaded artifact");
        Ok(())
    }
}
