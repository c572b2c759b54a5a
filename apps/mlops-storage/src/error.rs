//! Error types for the artifact storage client
//!
//! Every failure is surfaced as a [`StorageError`] carrying the operation
//! and the storage path involved, so callers can branch on fields instead
//! of matching provider message text.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::backend::BackendError;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// The client operation an error was raised from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Store,
    Fetch,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::Store => "store",
            Operation::Fetch => "fetch",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a [`StorageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Conflict,
    NotFound,
    Transfer,
    InvalidPath,
    LocalIo,
}

/// Storage client error
#[derive(Error, Debug)]
pub enum StorageError {
    /// Bad project/container identifier or unreachable container.
    #[error("configuration error for project `{project}`, container `{container}`: {reason}")]
    Configuration {
        project: String,
        container: String,
        reason: String,
    },

    /// An object already occupies the path.
    #[error("{operation} conflict: an object already exists at `{path}`")]
    Conflict { operation: Operation, path: String },

    #[error("{operation} failed: no object at `{path}`")]
    NotFound { operation: Operation, path: String },

    /// Any other backend failure. `message` keeps the provider's diagnostics.
    #[error("{operation} of `{path}` failed: {message}")]
    Transfer {
        operation: Operation,
        path: String,
        message: String,
    },

    #[error("{operation} rejected storage path `{path}`: {reason}")]
    InvalidPath {
        operation: Operation,
        path: String,
        reason: String,
    },

    /// Reading or writing the caller's local file failed.
    #[error("{operation} of `{path}` failed on local file {}: {source}", .local_path.display())]
    LocalIo {
        operation: Operation,
        path: String,
        local_path: PathBuf,
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn configuration(
        project: &str,
        container: &str,
        reason: impl Into<String>,
    ) -> Self {
        StorageError::Configuration {
            project: project.to_string(),
            container: container.to_string(),
            reason: reason.into(),
        }
    }

    /// Attach operation and path to a provider-neutral backend failure.
    pub(crate) fn from_backend(operation: Operation, path: &str, err: BackendError) -> Self {
        let path = path.to_string();
        match err {
            BackendError::AlreadyExists => StorageError::Conflict { operation, path },
            BackendError::NotFound => StorageError::NotFound { operation, path },
            BackendError::ContainerUnavailable(message) | BackendError::Other(message) => {
                StorageError::Transfer {
                    operation,
                    path,
                    message,
                }
            }
        }
    }

    pub(crate) fn local_io(
        operation: Operation,
        path: &str,
        local_path: &Path,
        source: std::io::Error,
    ) -> Self {
        StorageError::LocalIo {
            operation,
            path: path.to_string(),
            local_path: local_path.to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Configuration { .. } => ErrorKind::Configuration,
            StorageError::Conflict { .. } => ErrorKind::Conflict,
            StorageError::NotFound { .. } => ErrorKind::NotFound,
            StorageError::Transfer { .. } => ErrorKind::Transfer,
            StorageError::InvalidPath { .. } => ErrorKind::InvalidPath,
            StorageError::LocalIo { .. } => ErrorKind::LocalIo,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            StorageError::Configuration { .. } => Operation::Connect,
            StorageError::Conflict { operation, .. }
            | StorageError::NotFound { operation, .. }
            | StorageError::Transfer { operation, .. }
            | StorageError::InvalidPath { operation, .. }
            | StorageError::LocalIo { operation, .. } => *operation,
        }
    }

    /// Storage path the failing operation targeted, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            StorageError::Configuration { .. } => None,
            StorageError::Conflict { path, .. }
            | StorageError::NotFound { path, .. }
            | StorageError::Transfer { path, .. }
            | StorageError::InvalidPath { path, .. }
            | StorageError::LocalIo { path, .. } => Some(path),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_path() {
        let err = StorageError::from_backend(
            Operation::Store,
            "runs/42/model.bin",
            BackendError::AlreadyExists,
        );

        assert!(err.is_conflict());
        assert_eq!(err.path(), Some("runs/42/model.bin"));
        assert_eq!(err.operation(), Operation::Store);
        assert_eq!(
            err.to_string(),
            "store conflict: an object already exists at `runs/42/model.bin`"
        );
    }

    #[test]
    fn test_backend_failures_become_transfer_errors() {
        let err = StorageError::from_backend(
            Operation::Fetch,
            "data.csv",
            BackendError::Other("503 Slow Down".to_string()),
        );

        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert!(err.to_string().contains("503 Slow Down"));
    }

    #[test]
    fn test_configuration_error_has_no_path() {
        let err = StorageError::configuration("mozdata", "Bad_Bucket", "invalid name");

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.operation(), Operation::Connect);
        assert_eq!(err.path(), None);
    }

    #[test]
    fn test_local_io_keeps_source() {
        let err = StorageError::local_io(
            Operation::Fetch,
            "a/b.bin",
            Path::new("/tmp/out/b.bin"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        assert_eq!(err.kind(), ErrorKind::LocalIo);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/tmp/out/b.bin"));
    }
}
