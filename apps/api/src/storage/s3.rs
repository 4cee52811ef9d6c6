use std::time::Duration;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

use crate::storage::{ArtifactStore, StorageError};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Uploads artifacts to an S3-compatible bucket (AWS or MinIO).
#[derive(Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3Store {
    /// Builds a client from the default AWS credential chain, pointed at
    /// `endpoint` when one is given (path-style addressing for MinIO).
    pub async fn connect(bucket: String, endpoint: Option<String>, region: String) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.clone()));
        if let Some(endpoint) = &endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(endpoint.is_some())
            .build();

        let public_base_url = match &endpoint {
            Some(endpoint) => format!("{}/{bucket}", endpoint.trim_end_matches('/')),
            None => format!("https://{bucket}.s3.{region}.amazonaws.com"),
        };

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket,
            public_base_url,
        }
    }
}

#[async_trait]
impl ArtifactStore for S3Store {
    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = bytes.len();
        let upload = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .cache_control("public, max-age=86400")
            .send();

        tokio::time::timeout(UPLOAD_TIMEOUT, upload)
            .await
            .map_err(|_| StorageError::Timeout(UPLOAD_TIMEOUT.as_secs()))?
            .map_err(|e| StorageError::Upload(format!("S3 upload failed: {e}")))?;

        info!("Uploaded {size} bytes to s3://{}/{name}", self.bucket);
        Ok(format!("{}/{name}", self.public_base_url))
    }
}
