//! Artifact storage client
//!
//! A [`StorageClient`] is bound to one (project, container) pair and moves
//! whole artifacts between the caller and the container. Paths are never
//! overwritten: a second `store` to the same path is a conflict.

use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::backend::{ObjectBackend, S3Backend};
use crate::config::{StorageConfig, StorageProvider, GCS_ENDPOINT};
use crate::error::{Operation, Result, StorageError};

/// Object names longer than this are rejected by both GCS and S3
pub const MAX_PATH_BYTES: usize = 1024;

/// Client for storing, fetching and deleting artifacts in one container
#[derive(Clone)]
pub struct StorageClient {
    project: String,
    container: String,
    backend: Arc<dyn ObjectBackend>,
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("project", &self.project)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

impl StorageClient {
    /// Connect to `container` on GCS using the ambient credential chain.
    ///
    /// Fails with [`StorageError::Configuration`] if either identifier is
    /// malformed or the container cannot be reached.
    pub async fn new(project: impl Into<String>, container: impl Into<String>) -> Result<Self> {
        let project = project.into();
        let container = container.into();
        validate_identifiers(&project, &container)?;

        let backend = S3Backend::from_env_chain(StorageProvider::Gcs, GCS_ENDPOINT, &container).await;
        Self::bind(project, container, Arc::new(backend)).await
    }

    /// Connect using explicit configuration
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        validate_identifiers(&config.project, &config.bucket)?;

        let backend = S3Backend::new(config)?;
        Self::bind(config.project.clone(), config.bucket.clone(), Arc::new(backend)).await
    }

    /// Bind to an arbitrary backend, e.g. [`InMemoryBackend`](crate::InMemoryBackend).
    pub async fn with_backend(
        project: impl Into<String>,
        container: impl Into<String>,
        backend: Arc<dyn ObjectBackend>,
    ) -> Result<Self> {
        let project = project.into();
        let container = container.into();
        validate_identifiers(&project, &container)?;

        Self::bind(project, container, backend).await
    }

    async fn bind(
        project: String,
        container: String,
        backend: Arc<dyn ObjectBackend>,
    ) -> Result<Self> {
        backend
            .check_container()
            .await
            .map_err(|e| StorageError::configuration(&project, &container, e.to_string()))?;

        tracing::info!(project = %project, bucket = %container, "Storage client ready");

        Ok(Self {
            project,
            container,
            backend,
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Upload `data` as a new object at `storage_path`.
    ///
    /// Returns `storage_path` unchanged. Fails with
    /// [`StorageError::Conflict`] if the path is already taken; the existing
    /// object is left as it was.
    pub async fn store(&self, data: impl Into<Vec<u8>>, storage_path: &str) -> Result<String> {
        validate_path(Operation::Store, storage_path)?;

        let data = data.into();
        let size = data.len();

        match self.backend.create_object(storage_path, data).await {
            Ok(()) => {
                tracing::info!(bucket = %self.container, path = %storage_path, bytes = size, "Artifact stored");
                Ok(storage_path.to_string())
            }
            Err(e) => {
                let err = StorageError::from_backend(Operation::Store, storage_path, e);
                if err.is_conflict() {
                    tracing::warn!(bucket = %self.container, path = %storage_path, "Refusing to overwrite existing artifact");
                } else {
                    tracing::error!(bucket = %self.container, path = %storage_path, error = %err, "Store failed");
                }
                Err(err)
            }
        }
    }

    /// Read a local file and store its contents like [`store`](Self::store).
    pub async fn store_file(
        &self,
        local_path: impl AsRef<Path>,
        storage_path: &str,
    ) -> Result<String> {
        let local_path = local_path.as_ref();
        validate_path(Operation::Store, storage_path)?;

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| StorageError::local_io(Operation::Store, storage_path, local_path, e))?;

        self.store(data, storage_path).await
    }

    /// Download the object at `remote_path` into `local_path`.
    ///
    /// An existing file at `local_path` is replaced. On any failure the
    /// local file is left untouched.
    pub async fn fetch(&self, remote_path: &str, local_path: impl AsRef<Path>) -> Result<()> {
        let local_path = local_path.as_ref();
        validate_path(Operation::Fetch, remote_path)?;

        let data = self
            .backend
            .read_object(remote_path)
            .await
            .map_err(|e| StorageError::from_backend(Operation::Fetch, remote_path, e))?;

        write_replacing(local_path, &data)
            .await
            .map_err(|e| StorageError::local_io(Operation::Fetch, remote_path, local_path, e))?;

        tracing::debug!(
            bucket = %self.container,
            path = %remote_path,
            local_path = %local_path.display(),
            bytes = data.len(),
            "Artifact fetched"
        );
        Ok(())
    }

    /// Remove the object at `storage_path`.
    ///
    /// Lifecycle and cleanup operation. Deleting a path with no object is a
    /// no-op success; a later [`fetch`](Self::fetch) of that path still
    /// fails with [`StorageError::NotFound`].
    pub async fn delete(&self, storage_path: &str) -> Result<()> {
        validate_path(Operation::Delete, storage_path)?;

        self.backend
            .delete_object(storage_path)
            .await
            .map_err(|e| StorageError::from_backend(Operation::Delete, storage_path, e))?;

        tracing::info!(bucket = %self.container, path = %storage_path, "Artifact deleted");
        Ok(())
    }
}

/// Write `data` to a hidden sibling `.part` file, then rename it over `target`.
///
/// The part file name has a fixed length so any name valid for `target`
/// still fits.
async fn write_replacing(target: &Path, data: &[u8]) -> std::io::Result<()> {
    if target.file_name().is_none() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "local path has no file name",
        ));
    }

    let part_path = target.with_file_name(format!(".{}.part", Uuid::new_v4().simple()));

    let result = async {
        let mut file = tokio::fs::File::create(&part_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&part_path, target).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&part_path).await;
    }
    result
}

fn validate_identifiers(project: &str, container: &str) -> Result<()> {
    if project.is_empty() {
        return Err(StorageError::configuration(project, container, "project identifier is empty"));
    }
    if project.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(StorageError::configuration(
            project,
            container,
            "project identifier must not contain whitespace or '/'",
        ));
    }

    if !(3..=63).contains(&container.len()) {
        return Err(StorageError::configuration(
            project,
            container,
            "container name must be 3 to 63 characters",
        ));
    }
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.');
    if !container.chars().all(allowed) {
        return Err(StorageError::configuration(
            project,
            container,
            "container name may only contain lowercase letters, digits, '-', '_' and '.'",
        ));
    }
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edge_ok(container.chars().next()) || !edge_ok(container.chars().last()) {
        return Err(StorageError::configuration(
            project,
            container,
            "container name must start and end with a letter or digit",
        ));
    }

    Ok(())
}

fn validate_path(operation: Operation, path: &str) -> Result<()> {
    let reason = if path.is_empty() {
        "storage path is empty"
    } else if path.len() > MAX_PATH_BYTES {
        "storage path exceeds 1024 bytes"
    } else {
        return Ok(());
    };

    Err(StorageError::InvalidPath {
        operation,
        path: path.to_string(),
        reason: reason.to_string(),
    })
}
