//! In-memory object store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BackendError, ObjectBackend};

/// `HashMap`-backed store for tests and local runs.
///
/// Clones share the same object set.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }
}

#[async_trait]
impl ObjectBackend for InMemoryBackend {
    async fn check_container(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn create_object(&self, path: &str, data: Vec<u8>) -> Result<(), BackendError> {
        let mut objects = self.objects.write().await;
        if objects.contains_key(path) {
            return Err(BackendError::AlreadyExists);
        }
        objects.insert(path.to_string(), data);
        Ok(())
    }

    async fn read_object(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        self.objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn delete_object(&self, path: &str) -> Result<(), BackendError> {
        if self.objects.write().await.remove(path).is_none() {
            tracing::debug!(path = %path, "Delete of absent object, nothing to do");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_is_create_if_absent() {
        let backend = InMemoryBackend::new();

        backend.create_object("a", vec![1]).await.unwrap();
        let err = backend.create_object("a", vec![2]).await.unwrap_err();

        assert_eq!(err, BackendError::AlreadyExists);
        assert_eq!(backend.read_object("a").await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_read_missing() {
        let backend = InMemoryBackend::new();
        assert_eq!(
            backend.read_object("nope").await.unwrap_err(),
            BackendError::NotFound
        );
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let backend = InMemoryBackend::new();
        backend.delete_object("nope").await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_objects() {
        let backend = InMemoryBackend::new();
        let other = backend.clone();

        backend.create_object("shared", b"x".to_vec()).await.unwrap();

        assert!(other.contains("shared").await);
        assert_eq!(other.len().await, 1);
    }
}
