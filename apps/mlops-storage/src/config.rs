//! Configuration for the storage client

use serde::Deserialize;
use std::env;

use crate::error::{Result, StorageError};

/// Public endpoint of the GCS XML (S3-interoperable) API
pub const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

pub const S3_ENDPOINT: &str = "https://s3.amazonaws.com";

pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for one (project, bucket) target.
///
/// Passed explicitly to [`StorageClient::from_config`](crate::StorageClient::from_config);
/// nothing here is process-global, so clients for different targets can
/// live side by side.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub project: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Gcs,
    S3,
    Minio,
    R2,
}

impl StorageProvider {
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            StorageProvider::Gcs => Some(GCS_ENDPOINT),
            StorageProvider::S3 => Some(S3_ENDPOINT),
            StorageProvider::Minio | StorageProvider::R2 => None,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "gcs" => Some(StorageProvider::Gcs),
            "s3" => Some(StorageProvider::S3),
            "minio" => Some(StorageProvider::Minio),
            "r2" => Some(StorageProvider::R2),
            _ => None,
        }
    }
}

impl StorageConfig {
    /// Load from `STORAGE_*` environment variables.
    ///
    /// Does not read `.env`; binaries call `dotenvy::dotenv()` first if they
    /// want that.
    pub fn from_env() -> Result<Self> {
        let project = env::var("STORAGE_PROJECT").unwrap_or_default();
        let bucket = env::var("STORAGE_BUCKET").unwrap_or_default();

        let required = |name: &str| {
            env::var(name).map_err(|_| {
                StorageError::configuration(
                    &project,
                    &bucket,
                    format!("missing environment variable {name}"),
                )
            })
        };

        let provider = match env::var("STORAGE_PROVIDER") {
            Ok(value) => StorageProvider::parse(&value).ok_or_else(|| {
                StorageError::configuration(
                    &project,
                    &bucket,
                    format!("unknown storage provider `{value}`"),
                )
            })?,
            Err(_) => StorageProvider::Gcs,
        };

        Ok(StorageConfig {
            provider,
            endpoint: env::var("STORAGE_ENDPOINT").ok(),
            project: required("STORAGE_PROJECT")?,
            bucket: required("STORAGE_BUCKET")?,
            access_key: required("STORAGE_ACCESS_KEY")?,
            secret_key: required("STORAGE_SECRET_KEY")?,
            region: env::var("STORAGE_REGION").ok(),
        })
    }

    /// Explicit endpoint, falling back to the provider default
    pub fn endpoint_url(&self) -> Result<String> {
        self.endpoint
            .clone()
            .or_else(|| self.provider.default_endpoint().map(str::to_string))
            .ok_or_else(|| {
                StorageError::configuration(
                    &self.project,
                    &self.bucket,
                    format!("provider {:?} requires an explicit endpoint", self.provider),
                )
            })
    }

    pub fn region_or_default(&self) -> String {
        self.region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gcs_config() -> StorageConfig {
        StorageConfig {
            provider: StorageProvider::Gcs,
            endpoint: None,
            project: "mozdata".to_string(),
            bucket: "moz-fx-data-circleci-tests-mozmlops".to_string(),
            access_key: "key".to_string(),
            secret_key: "secret".to_string(),
            region: None,
        }
    }

    #[test]
    fn test_gcs_uses_interop_endpoint() {
        let config = gcs_config();
        assert_eq!(config.endpoint_url().unwrap(), GCS_ENDPOINT);
        assert_eq!(config.region_or_default(), "us-east-1");
    }

    #[test]
    fn test_minio_requires_endpoint() {
        let mut config = gcs_config();
        config.provider = StorageProvider::Minio;

        let err = config.endpoint_url().unwrap_err();
        assert!(matches!(err, StorageError::Configuration { .. }));

        config.endpoint = Some("http://localhost:9000".to_string());
        assert_eq!(config.endpoint_url().unwrap(), "http://localhost:9000");
    }

    #[test]
    fn test_deserialize_lowercase_provider() {
        let json = r#"{
            "provider": "r2",
            "endpoint": "https://acct.r2.cloudflarestorage.com",
            "project": "ml",
            "bucket": "checkpoints",
            "access_key": "a",
            "secret_key": "b"
        }"#;

        let config: StorageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.provider, StorageProvider::R2);
        assert_eq!(config.region, None);
    }

    #[test]
    fn test_provider_parse_is_case_insensitive() {
        assert_eq!(StorageProvider::parse("GCS"), Some(StorageProvider::Gcs));
        assert_eq!(StorageProvider::parse("azure"), None);
    }
}
