//! Object store backends
//!
//! The client only needs create-if-absent, read, and delete by path on a
//! single container. [`ObjectBackend`] captures exactly that, so the same
//! client runs against an S3-compatible service (GCS interop, AWS S3, MinIO,
//! R2) or the in-memory store used in tests.

mod memory;
mod s3_client;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryBackend;
pub use s3_client::S3Backend;

/// Provider-neutral backend failure.
///
/// Carries no path or operation; the client attaches those when it turns
/// this into a [`StorageError`](crate::StorageError).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("object already exists")]
    AlreadyExists,

    #[error("object not found")]
    NotFound,

    #[error("container unavailable: {0}")]
    ContainerUnavailable(String),

    #[error("{0}")]
    Other(String),
}

/// Minimal capability set of a backing object store
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Verify the container exists and is reachable with current credentials.
    async fn check_container(&self) -> Result<(), BackendError>;

    /// Create the object at `path`.
    ///
    /// Must fail with [`BackendError::AlreadyExists`] if `path` is taken, and
    /// the check must be atomic with the write. A failed create leaves no
    /// object behind.
    async fn create_object(&self, path: &str, data: Vec<u8>) -> Result<(), BackendError>;

    /// Read the whole object at `path`.
    async fn read_object(&self, path: &str) -> Result<Vec<u8>, BackendError>;

    /// Remove the object at `path`. Succeeds when nothing is there.
    async fn delete_object(&self, path: &str) -> Result<(), BackendError>;
}
