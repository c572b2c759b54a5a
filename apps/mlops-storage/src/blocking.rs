//! Blocking facade over [`StorageClient`]
//!
//! For callers without an async runtime. Each call drives the async client
//! to completion on a private current-thread runtime.
//!
//! Do not use from inside a tokio runtime: `block_on` panics there.

use std::path::Path;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::backend::ObjectBackend;
use crate::client::StorageClient;
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};

pub struct BlockingStorageClient {
    inner: StorageClient,
    runtime: Runtime,
}

impl BlockingStorageClient {
    pub fn new(project: &str, container: &str) -> Result<Self> {
        let runtime = build_runtime(project, container)?;
        let inner = runtime.block_on(StorageClient::new(project, container))?;
        Ok(Self { inner, runtime })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let runtime = build_runtime(&config.project, &config.bucket)?;
        let inner = runtime.block_on(StorageClient::from_config(config))?;
        Ok(Self { inner, runtime })
    }

    pub fn with_backend(
        project: &str,
        container: &str,
        backend: Arc<dyn ObjectBackend>,
    ) -> Result<Self> {
        let runtime = build_runtime(project, container)?;
        let inner = runtime.block_on(StorageClient::with_backend(project, container, backend))?;
        Ok(Self { inner, runtime })
    }

    pub fn store(&self, data: impl Into<Vec<u8>>, storage_path: &str) -> Result<String> {
        self.runtime.block_on(self.inner.store(data, storage_path))
    }

    pub fn store_file(&self, local_path: impl AsRef<Path>, storage_path: &str) -> Result<String> {
        self.runtime
            .block_on(self.inner.store_file(local_path, storage_path))
    }

    pub fn fetch(&self, remote_path: &str, local_path: impl AsRef<Path>) -> Result<()> {
        self.runtime.block_on(self.inner.fetch(remote_path, local_path))
    }

    pub fn delete(&self, storage_path: &str) -> Result<()> {
        self.runtime.block_on(self.inner.delete(storage_path))
    }

    /// The wrapped async client
    pub fn inner(&self) -> &StorageClient {
        &self.inner
    }
}

fn build_runtime(project: &str, container: &str) -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            StorageError::configuration(project, container, format!("failed to start runtime: {e}"))
        })
}
