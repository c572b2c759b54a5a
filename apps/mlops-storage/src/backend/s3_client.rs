//! S3-compatible storage backend
//!
//! Wraps the AWS SDK for S3-compatible storage access. GCS is reached
//! through its XML interoperability API with HMAC keys.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{http::HttpResponse, Credentials, Region},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
    Client,
};

use crate::config::{StorageConfig, StorageProvider, DEFAULT_REGION};
use crate::error::Result;

use super::{BackendError, ObjectBackend};

/// GCS XML API create-if-absent precondition
const GCS_GENERATION_MATCH: &str = "x-goog-if-generation-match";

/// S3-compatible backend bound to a single bucket
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
    provider: StorageProvider,
}

impl S3Backend {
    /// Create a backend from explicit configuration
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "mlops-storage",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&endpoint)
            .region(Region::new(config.region_or_default()))
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO and GCS interop
            .build();

        tracing::debug!(bucket = %config.bucket, endpoint = %endpoint, "S3 backend configured");

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            provider: config.provider,
        })
    }

    /// Create a backend using the ambient credential chain
    /// (`AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`, profile files, ...).
    pub async fn from_env_chain(provider: StorageProvider, endpoint: &str, bucket: &str) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true);
        if shared.region().is_none() {
            builder = builder.region(Region::new(DEFAULT_REGION));
        }

        tracing::debug!(bucket = %bucket, endpoint = %endpoint, "S3 backend configured from environment");

        Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
            provider,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn provider(&self) -> StorageProvider {
        self.provider
    }
}

/// Provider-specific headers added to PutObject on top of `If-None-Match: *`.
///
/// GCS documents `x-goog-if-generation-match: 0` as its create-if-absent
/// precondition on the XML API.
fn create_precondition_headers(provider: StorageProvider) -> &'static [(&'static str, &'static str)] {
    match provider {
        StorageProvider::Gcs => &[(GCS_GENERATION_MATCH, "0")],
        StorageProvider::S3 | StorageProvider::Minio | StorageProvider::R2 => &[],
    }
}

fn http_status<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|response| response.status().as_u16())
}

/// Map a failed PutObject. The error code wins; status is the fallback
/// when the response carried no code.
fn classify_put(status: Option<u16>, code: Option<&str>, detail: String) -> BackendError {
    match code {
        Some("PreconditionFailed" | "ConditionalRequestConflict") => BackendError::AlreadyExists,
        Some(_) => BackendError::Other(detail),
        None => match status {
            Some(409 | 412) => BackendError::AlreadyExists,
            _ => BackendError::Other(detail),
        },
    }
}

/// Map a failed GetObject. Only a missing key is `NotFound`; a missing
/// bucket stays a transfer failure.
fn classify_get(status: Option<u16>, code: Option<&str>, detail: String) -> BackendError {
    match code {
        Some("NoSuchKey") => BackendError::NotFound,
        Some(_) => BackendError::Other(detail),
        None => match status {
            Some(404) => BackendError::NotFound,
            _ => BackendError::Other(detail),
        },
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn check_container(&self) -> std::result::Result<(), BackendError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(bucket = %self.bucket, error = %DisplayErrorContext(&e), "Bucket check failed");
                BackendError::ContainerUnavailable(DisplayErrorContext(&e).to_string())
            })?;

        tracing::info!(bucket = %self.bucket, "Connected to S3 bucket");
        Ok(())
    }

    async fn create_object(&self, path: &str, data: Vec<u8>) -> std::result::Result<(), BackendError> {
        let headers = create_precondition_headers(self.provider);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .if_none_match("*")
            .body(ByteStream::from(data))
            .customize()
            .mutate_request(move |request| {
                for (name, value) in headers {
                    request.headers_mut().insert(*name, *value);
                }
            })
            .send()
            .await
            .map_err(|e| {
                classify_put(http_status(&e), e.code(), DisplayErrorContext(&e).to_string())
            })?;

        Ok(())
    }

    async fn read_object(&self, path: &str) -> std::result::Result<Vec<u8>, BackendError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                classify_get(http_status(&e), e.code(), DisplayErrorContext(&e).to_string())
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| BackendError::Other(format!("Failed to read object body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn delete_object(&self, path: &str) -> std::result::Result<(), BackendError> {
        // DeleteObject reports success for absent keys.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| BackendError::Other(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: StorageProvider, endpoint: Option<&str>) -> StorageConfig {
        StorageConfig {
            provider,
            endpoint: endpoint.map(str::to_string),
            project: "mozdata".to_string(),
            bucket: "checkpoints".to_string(),
            access_key: "key".to_string(),
            secret_key: "secret".to_string(),
            region: None,
        }
    }

    fn detail() -> String {
        "service error".to_string()
    }

    #[test]
    fn test_new_binds_bucket_and_provider() {
        let backend = S3Backend::new(&config(StorageProvider::Gcs, None)).unwrap();
        assert_eq!(backend.bucket(), "checkpoints");
        assert_eq!(backend.provider(), StorageProvider::Gcs);
    }

    #[test]
    fn test_gcs_sends_generation_match_precondition() {
        assert_eq!(
            create_precondition_headers(StorageProvider::Gcs),
            &[("x-goog-if-generation-match", "0")]
        );
        assert!(create_precondition_headers(StorageProvider::S3).is_empty());
        assert!(create_precondition_headers(StorageProvider::Minio).is_empty());
    }

    #[test]
    fn test_classify_put() {
        assert_eq!(
            classify_put(Some(412), Some("PreconditionFailed"), detail()),
            BackendError::AlreadyExists
        );
        assert_eq!(
            classify_put(Some(409), Some("ConditionalRequestConflict"), detail()),
            BackendError::AlreadyExists
        );
        assert_eq!(classify_put(Some(412), None, detail()), BackendError::AlreadyExists);
        assert_eq!(
            classify_put(Some(409), Some("OperationAborted"), detail()),
            BackendError::Other(detail())
        );
        assert_eq!(
            classify_put(Some(403), Some("AccessDenied"), detail()),
            BackendError::Other(detail())
        );
        assert_eq!(
            classify_put(Some(503), Some("SlowDown"), detail()),
            BackendError::Other(detail())
        );
        assert_eq!(classify_put(None, None, detail()), BackendError::Other(detail()));
    }

    #[test]
    fn test_classify_get() {
        assert_eq!(
            classify_get(Some(404), Some("NoSuchKey"), detail()),
            BackendError::NotFound
        );
        assert_eq!(classify_get(Some(404), None, detail()), BackendError::NotFound);
        assert_eq!(
            classify_get(Some(404), Some("NoSuchBucket"), detail()),
            BackendError::Other(detail())
        );
        assert_eq!(
            classify_get(Some(403), Some("AccessDenied"), detail()),
            BackendError::Other(detail())
        );
        assert_eq!(
            classify_get(Some(503), None, detail()),
            BackendError::Other(detail())
        );
    }

    #[test]
    fn test_new_without_endpoint_fails() {
        assert!(S3Backend::new(&config(StorageProvider::Minio, None)).is_err());
        assert!(S3Backend::new(&config(StorageProvider::Minio, Some("http://localhost:9000"))).is_ok());
    }
}
