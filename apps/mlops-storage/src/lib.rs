//! MLOps artifact storage
//!
//! A small client for keeping training artifacts (checkpoints, datasets,
//! config blobs) in a cloud object store. One [`StorageClient`] is bound to
//! one container and offers `store`, `fetch` and `delete` by path.
//!
//! # Modules
//!
//! - `client`: the async [`StorageClient`]
//! - `blocking`: [`BlockingStorageClient`] for synchronous callers
//! - `backend`: the [`ObjectBackend`] capability plus S3 and in-memory backends
//! - `config`: [`StorageConfig`] and provider endpoints
//! - `error`: [`StorageError`] and its structured fields

pub mod backend;
pub mod blocking;
pub mod client;
pub mod config;
pub mod error;

pub use backend::{BackendError, InMemoryBackend, ObjectBackend, S3Backend};
pub use blocking::BlockingStorageClient;
pub use client::StorageClient;
pub use config::{StorageConfig, StorageProvider};
pub use error::{ErrorKind, Operation, Result, StorageError};
